// src/watch/mod.rs

//! File watching and change coalescing.
//!
//! This module is responsible for:
//! - Compiling the `[watch].ignored` glob patterns.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Collapsing bursts of events into a single trailing pipeline trigger.
//!
//! It does **not** know what the checks are; it only turns filesystem
//! changes into `PipelineRunner::run` calls.

pub mod debounce;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use debounce::{Debouncer, WatchEvent, WatchEventKind};
pub use patterns::IgnoreRules;
pub use watcher::{classify, WatchCoalescer};
