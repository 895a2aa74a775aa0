// src/exec/mod.rs

//! Process execution layer.
//!
//! Runs the configured check commands with `tokio::process::Command` and
//! reports buffered output back to the pipeline runner.
//!
//! - [`command`] spawns one process, enforces the timeout, captures output.
//! - [`backend`] provides the `CheckExecutor` trait and the production
//!   `RealCheckExecutor`, which tests can replace with a fake.

pub mod backend;
pub mod command;

pub use backend::{CheckExecutor, RealCheckExecutor};
pub use command::{run_command, EMPTY_OUTPUT_MARKER};
