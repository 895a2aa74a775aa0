// src/pipeline/mod.rs

//! Gated check pipeline.
//!
//! A run walks a linear state machine:
//!
//! ```text
//! Idle -> Linting -> Building -> Testing -> Promoting -> Done(ok)
//!            \           \          \           \
//!             +-----------+----------+-----------+--> Done(fail)
//! ```
//!
//! `Linting` is skipped when no lint command is configured. The first failing
//! stage ends the run. Only one run may be in flight; see [`runner`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::promote::PromotionOutcome;
use crate::types::CheckName;

pub mod runner;

pub use runner::PipelineRunner;

/// Key under which the first failure's message is stored in
/// [`RunResult::details`].
pub const ERROR_DETAIL_KEY: &str = "error";

/// Key under which a promotion failure is stored in [`RunResult::details`],
/// next to [`ERROR_DETAIL_KEY`].
pub const PROMOTE_DETAIL_KEY: &str = "promote";

/// Where the pipeline currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineStage {
    Idle,
    Linting,
    Building,
    Testing,
    Promoting,
    Done { ok: bool },
}

impl PipelineStage {
    pub fn for_check(check: CheckName) -> Self {
        match check {
            CheckName::Lint => PipelineStage::Linting,
            CheckName::Build => PipelineStage::Building,
            CheckName::Test => PipelineStage::Testing,
        }
    }
}

/// Outcome of one complete pipeline execution. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    /// True only if every check passed *and* promotion did not fail.
    pub ok: bool,
    /// True if every configured check exited zero, regardless of promotion.
    pub checks_passed: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Free-form trigger tag, e.g. `manual` or `watch:change`.
    pub reason: String,
    /// Check name (`lint`/`build`/`test`) to captured output or error text,
    /// plus `error` for the failure that ended the run. A promotion failure
    /// is stored under both `promote` and `error`.
    pub details: BTreeMap<String, String>,
    /// Present when promotion was attempted and returned normally.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion: Option<PromotionOutcome>,
}

impl RunResult {
    /// Placeholder handed to a trigger that was skipped before any run ever
    /// completed.
    pub fn skipped() -> Self {
        let now = Utc::now();
        Self {
            ok: true,
            checks_passed: true,
            started_at: now,
            finished_at: now,
            reason: "skipped".to_string(),
            details: BTreeMap::new(),
            promotion: None,
        }
    }

    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.get(key).map(String::as_str)
    }
}

/// Snapshot returned by [`PipelineRunner::status`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStatus {
    pub running: bool,
    pub stage: PipelineStage,
    pub last_result: Option<RunResult>,
}
