// src/exec/backend.rs

//! Pluggable check executor abstraction.
//!
//! The pipeline runner talks to a `CheckExecutor` instead of spawning
//! processes itself. Production code uses [`RealCheckExecutor`]; tests can
//! provide an executor that records invocations and returns scripted
//! outcomes without touching the OS.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::config::CommandSpec;
use crate::errors::Result;
use crate::types::CheckName;

use super::command::run_command;

/// Trait abstracting how a single check command is executed.
pub trait CheckExecutor: Send + Sync {
    /// Run `command` for `check`, returning its captured output on success.
    ///
    /// Implementations must honour `timeout` and report failure (non-zero
    /// exit, timeout, spawn error) as `Err`.
    fn execute<'a>(
        &'a self,
        check: CheckName,
        command: &'a CommandSpec,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;
}

/// Real executor used in production: one OS process per check.
#[derive(Debug, Clone, Default)]
pub struct RealCheckExecutor;

impl CheckExecutor for RealCheckExecutor {
    fn execute<'a>(
        &'a self,
        _check: CheckName,
        command: &'a CommandSpec,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(run_command(command, timeout))
    }
}
