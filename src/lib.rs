// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod gate;
pub mod logging;
pub mod pipeline;
pub mod promote;
pub mod types;
pub mod watch;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ensure_runtime_dirs, resolve_config_path, ConfigFile, ConfigProvider};
use crate::fs::RealFileSystem;
use crate::gate::Gate;
use crate::promote::MirrorStatus;
use crate::watch::WatchCoalescer;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config resolution and loading
/// - runtime directory bootstrap
/// - the gate (pipeline runner + promotion engine)
/// - the file watcher (unless `--once` / `--dry-run`)
/// - Ctrl-C handling, and SIGHUP reloads on Unix
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = resolve_config_path(args.config.as_deref());
    info!(path = %config_path.display(), "using config");

    let provider = Arc::new(ConfigProvider::load(&config_path));
    let cfg = provider.get();
    ensure_runtime_dirs(&RealFileSystem, &cfg.runtime)?;

    let gate = Gate::new(Arc::clone(&provider));

    if let Some(stage) = &args.stage {
        let [relative, source] = stage.as_slice() else {
            bail!("--stage expects RELATIVE and SOURCE");
        };
        let content = std::fs::read(source)
            .with_context(|| format!("failed to read stage source {source}"))?;
        let staged = gate.stage_file(relative, content)?;
        info!(path = %staged.display(), "staged file");
    }

    if args.dry_run {
        print_dry_run(&cfg, &gate.mirror_status());
        return Ok(());
    }

    if args.once {
        let result = gate.run("manual").await;
        println!("{}", serde_json::to_string_pretty(&result)?);
        if !result.ok {
            bail!("pipeline run failed");
        }
        return Ok(());
    }

    let mut coalescer = WatchCoalescer::new(Arc::clone(&provider), gate.pipeline());
    coalescer.start()?;

    wait_for_shutdown(&gate).await;

    coalescer.shutdown().await;
    info!("watchgate stopped");
    Ok(())
}

/// Block until Ctrl-C. On Unix, SIGHUP reloads configuration meanwhile.
#[cfg(unix)]
async fn wait_for_shutdown(gate: &Gate) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(stream) => Some(stream),
        Err(err) => {
            warn!(error = %err, "failed to install SIGHUP handler; reload disabled");
            None
        }
    };

    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(err) = res {
                    warn!(error = %err, "failed to listen for Ctrl+C");
                }
                info!("shutdown requested");
                return;
            }
            Some(()) = async {
                match hangup.as_mut() {
                    Some(stream) => stream.recv().await,
                    None => std::future::pending().await,
                }
            } => {
                gate.reload_configuration();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown(_gate: &Gate) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for Ctrl+C");
    }
    info!("shutdown requested");
}

/// Simple dry-run output: print the effective configuration.
fn print_dry_run(cfg: &ConfigFile, mirror: &MirrorStatus) {
    println!("watchgate dry-run");
    println!("watch:");
    println!("  basePath: {}", cfg.watch.resolved_base_path().display());
    println!("  debounceMs: {}", cfg.watch.debounce_ms);
    println!("  ignored: {:?}", cfg.watch.ignored);
    println!("mirror:");
    println!("  basePath: {}", mirror.mirror_path.display());
    println!("  mode: {}", mirror.mode);
    println!("pipeline:");
    if let Some(lint) = &cfg.pipeline.lint_command {
        println!("  lint: {lint}");
    }
    println!("  build: {}", cfg.pipeline.build_command);
    println!("  test: {}", cfg.pipeline.test_command);
    println!("  timeoutMs: {}", cfg.pipeline.timeout_ms);
    println!("runtime:");
    for dir in &cfg.runtime.required_dirs {
        println!("  - {}", dir.display());
    }

    debug!("dry-run complete (no execution)");
}
