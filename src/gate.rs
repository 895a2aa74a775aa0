// src/gate.rs

//! The trigger surface: one handle over config, pipeline and promotion.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::config::{ConfigFile, ConfigProvider};
use crate::errors::Result;
use crate::exec::{CheckExecutor, RealCheckExecutor};
use crate::fs::{FileSystem, RealFileSystem};
use crate::pipeline::{PipelineRunner, PipelineStatus, RunResult};
use crate::promote::{MirrorStatus, PromotionEngine};

/// Everything `status()` reports in one go.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateStatus {
    pub config: ConfigFile,
    pub pipeline: PipelineStatus,
    pub mirror: MirrorStatus,
    /// The last completed run did not succeed.
    pub degraded: bool,
}

#[derive(Debug)]
pub struct Gate {
    config: Arc<ConfigProvider>,
    promoter: Arc<PromotionEngine>,
    pipeline: Arc<PipelineRunner>,
}

impl Gate {
    /// Gate that spawns real processes and touches the real filesystem.
    pub fn new(config: Arc<ConfigProvider>) -> Self {
        Self::with_parts(
            config,
            Arc::new(RealCheckExecutor),
            Arc::new(RealFileSystem),
        )
    }

    pub fn with_parts(
        config: Arc<ConfigProvider>,
        executor: Arc<dyn CheckExecutor>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        let promoter = Arc::new(PromotionEngine::new(Arc::clone(&config), fs));
        let pipeline = Arc::new(PipelineRunner::new(
            Arc::clone(&config),
            executor,
            Arc::clone(&promoter),
        ));
        Self {
            config,
            promoter,
            pipeline,
        }
    }

    pub fn status(&self) -> GateStatus {
        let pipeline = self.pipeline.status();
        let degraded = pipeline
            .last_result
            .as_ref()
            .is_some_and(|result| !result.ok);
        GateStatus {
            config: (*self.config.get()).clone(),
            pipeline,
            mirror: self.promoter.status(),
            degraded,
        }
    }

    pub fn pipeline_status(&self) -> PipelineStatus {
        self.pipeline.status()
    }

    pub fn mirror_status(&self) -> MirrorStatus {
        self.promoter.status()
    }

    /// Manual trigger. Subject to the same skip-if-running rule as watch
    /// triggers.
    pub async fn run(&self, reason: &str) -> RunResult {
        self.pipeline.run(reason, None).await
    }

    /// Re-read the configuration file. Runs already in flight keep the
    /// snapshot they started with.
    pub fn reload_configuration(&self) -> Arc<ConfigFile> {
        let cfg = self.config.reload();
        info!(
            workspace = %cfg.watch.base_path.display(),
            mirror = %cfg.mirror.base_path.display(),
            mode = %cfg.mirror.mode,
            "gate configuration reloaded"
        );
        cfg
    }

    pub fn stage_file(
        &self,
        relative_path: impl AsRef<Path>,
        content: impl AsRef<[u8]>,
    ) -> Result<PathBuf> {
        self.promoter.stage_file(relative_path, content)
    }

    pub fn config(&self) -> Arc<ConfigProvider> {
        Arc::clone(&self.config)
    }

    pub fn pipeline(&self) -> Arc<PipelineRunner> {
        Arc::clone(&self.pipeline)
    }

    pub fn promoter(&self) -> Arc<PromotionEngine> {
        Arc::clone(&self.promoter)
    }
}
