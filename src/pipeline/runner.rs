// src/pipeline/runner.rs

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::config::{CommandSpec, ConfigProvider, PipelineSection};
use crate::exec::CheckExecutor;
use crate::promote::{PromotionEngine, PromotionOutcome};
use crate::types::CheckName;

use super::{
    PipelineStage, PipelineStatus, RunResult, ERROR_DETAIL_KEY, PROMOTE_DETAIL_KEY,
};

#[derive(Debug)]
struct RunState {
    running: bool,
    stage: PipelineStage,
    last_result: Option<RunResult>,
}

/// Runs lint → build → test and promotes on success, one run at a time.
///
/// A `run` that arrives while another is in flight does not queue and does
/// not interrupt: it returns the last completed result immediately.
pub struct PipelineRunner {
    config: Arc<ConfigProvider>,
    executor: Arc<dyn CheckExecutor>,
    promoter: Arc<PromotionEngine>,
    state: Mutex<RunState>,
}

impl std::fmt::Debug for PipelineRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRunner")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl PipelineRunner {
    pub fn new(
        config: Arc<ConfigProvider>,
        executor: Arc<dyn CheckExecutor>,
        promoter: Arc<PromotionEngine>,
    ) -> Self {
        Self {
            config,
            executor,
            promoter,
            state: Mutex::new(RunState {
                running: false,
                stage: PipelineStage::Idle,
                last_result: None,
            }),
        }
    }

    /// Current run flag, stage and last completed result. No side effects.
    pub fn status(&self) -> PipelineStatus {
        let state = lock(&self.state);
        PipelineStatus {
            running: state.running,
            stage: state.stage,
            last_result: state.last_result.clone(),
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state).running
    }

    pub fn last_result(&self) -> Option<RunResult> {
        lock(&self.state).last_result.clone()
    }

    /// Execute the gated pipeline once.
    ///
    /// Never fails: check failures, timeouts and promotion errors are all
    /// reported through the returned [`RunResult`].
    pub async fn run(&self, reason: &str, file_path: Option<&Path>) -> RunResult {
        {
            let mut state = lock(&self.state);
            if state.running {
                warn!(reason, "pipeline already running; skipping this trigger");
                return state.last_result.clone().unwrap_or_else(RunResult::skipped);
            }
            state.running = true;
            state.stage = PipelineStage::Idle;
        }
        let guard = RunningGuard {
            state: &self.state,
            finished: false,
        };

        let cfg = self.config.get();
        let started_at = Utc::now();
        info!(reason, file = ?file_path, "pipeline run started");

        let mut details = BTreeMap::new();
        let mut checks_passed = true;
        let mut ok = true;
        let mut promotion = None;

        for (check, command) in planned_checks(&cfg.pipeline) {
            self.set_stage(PipelineStage::for_check(check));
            debug!(check = %check, cmd = %command, "running check");

            match self
                .executor
                .execute(check, command, cfg.pipeline.timeout())
                .await
            {
                Ok(output) => {
                    details.insert(check.to_string(), output);
                }
                Err(err) => {
                    let message = err.to_string();
                    error!(check = %check, error = %message, "pipeline check failed");
                    details.insert(check.to_string(), message.clone());
                    details.insert(ERROR_DETAIL_KEY.to_string(), message);
                    checks_passed = false;
                    ok = false;
                    break;
                }
            }
        }

        if checks_passed {
            self.set_stage(PipelineStage::Promoting);
            match self.promote().await {
                Ok(outcome) => promotion = Some(outcome),
                Err(message) => {
                    error!(error = %message, "checks passed but promotion failed");
                    details.insert(PROMOTE_DETAIL_KEY.to_string(), message.clone());
                    details.insert(ERROR_DETAIL_KEY.to_string(), message);
                    ok = false;
                }
            }
        }

        let result = RunResult {
            ok,
            checks_passed,
            started_at,
            finished_at: Utc::now(),
            reason: reason.to_string(),
            details,
            promotion,
        };

        info!(
            reason,
            ok = result.ok,
            checks_passed = result.checks_passed,
            elapsed_ms = (result.finished_at - result.started_at).num_milliseconds(),
            "pipeline run finished"
        );

        guard.finish(result.clone());
        result
    }

    async fn promote(&self) -> Result<PromotionOutcome, String> {
        let promoter = Arc::clone(&self.promoter);
        match tokio::task::spawn_blocking(move || promoter.promote_to_workspace()).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(err)) => Err(err.to_string()),
            Err(join_err) => Err(format!("promotion task failed: {join_err}")),
        }
    }

    fn set_stage(&self, stage: PipelineStage) {
        lock(&self.state).stage = stage;
    }
}

/// The checks a run executes, in order. Lint only when configured.
fn planned_checks(pipeline: &PipelineSection) -> Vec<(CheckName, &CommandSpec)> {
    let mut checks = Vec::with_capacity(3);
    if let Some(lint) = &pipeline.lint_command {
        checks.push((CheckName::Lint, lint));
    }
    checks.push((CheckName::Build, &pipeline.build_command));
    checks.push((CheckName::Test, &pipeline.test_command));
    checks
}

fn lock(state: &Mutex<RunState>) -> MutexGuard<'_, RunState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the running flag when a run ends, including when the run future
/// is dropped before completing.
struct RunningGuard<'a> {
    state: &'a Mutex<RunState>,
    finished: bool,
}

impl RunningGuard<'_> {
    fn finish(mut self, result: RunResult) {
        self.finished = true;
        let mut state = lock(self.state);
        state.running = false;
        state.stage = PipelineStage::Done { ok: result.ok };
        state.last_result = Some(result);
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("pipeline run dropped before completion; clearing running flag");
            let mut state = lock(self.state);
            state.running = false;
            state.stage = PipelineStage::Idle;
        }
    }
}
