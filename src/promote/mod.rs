// src/promote/mod.rs

//! Staging store and promotion into the live workspace.
//!
//! - [`engine`] owns `stage_file`, `promote_to_workspace` and the mirror
//!   status.
//! - [`digest`] hashes files so unchanged destinations are not rewritten.

pub mod digest;
pub mod engine;

pub use engine::{MirrorStatus, PromotionEngine, PromotionOutcome, PROMOTE_TMP_SUFFIX};
