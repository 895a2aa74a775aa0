// tests/watch_coalescing.rs

mod common;
use crate::common::builders::ConfigFileBuilder;
use crate::common::{init_tracing, make_dirs, ScriptedExecutor};

use std::error::Error;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::{sleep, Instant};

use watchgate::config::{ConfigFile, ConfigProvider};
use watchgate::fs::RealFileSystem;
use watchgate::gate::Gate;
use watchgate::types::CheckName;
use watchgate::watch::{Debouncer, WatchCoalescer, WatchEvent, WatchEventKind};

type TestResult = Result<(), Box<dyn Error>>;

fn gate_for(cfg: ConfigFile, executor: &ScriptedExecutor) -> (Gate, Arc<ConfigProvider>) {
    let provider = Arc::new(ConfigProvider::from_config(cfg));
    let gate = Gate::with_parts(
        Arc::clone(&provider),
        Arc::new(executor.clone()),
        Arc::new(RealFileSystem),
    );
    (gate, provider)
}

/// Poll until the pipeline has a result or `limit` elapses.
async fn wait_for_result(gate: &Gate, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        let status = gate.pipeline_status();
        if status.last_result.is_some() && !status.running {
            return true;
        }
        sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn burst_of_events_triggers_one_run() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    make_dirs(dir.path())?;
    let executor = ScriptedExecutor::new();
    let (gate, _) = gate_for(
        ConfigFileBuilder::new().rooted_at(dir.path()).build(),
        &executor,
    );
    let debouncer = Debouncer::new(gate.pipeline());

    let delay = Duration::from_millis(100);
    let kinds = [
        WatchEventKind::Add,
        WatchEventKind::Change,
        WatchEventKind::Change,
        WatchEventKind::Change,
        WatchEventKind::Unlink,
    ];
    for (i, kind) in kinds.into_iter().enumerate() {
        debouncer.schedule(
            WatchEvent::new(kind, dir.path().join(format!("workspace/f{i}.txt"))),
            delay,
        );
        sleep(Duration::from_millis(20)).await;
    }
    assert!(debouncer.has_pending());

    assert!(wait_for_result(&gate, Duration::from_secs(3)).await);
    sleep(Duration::from_millis(300)).await;

    assert_eq!(executor.checks_run(), vec![CheckName::Build, CheckName::Test]);
    let result = gate.pipeline_status().last_result.ok_or("no run")?;
    assert_eq!(result.reason, "watch:unlink");
    assert!(!debouncer.has_pending());
    Ok(())
}

#[tokio::test]
async fn cancelled_timer_never_fires() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    make_dirs(dir.path())?;
    let executor = ScriptedExecutor::new();
    let (gate, _) = gate_for(
        ConfigFileBuilder::new().rooted_at(dir.path()).build(),
        &executor,
    );
    let debouncer = Debouncer::new(gate.pipeline());

    debouncer.schedule(
        WatchEvent::new(WatchEventKind::Change, dir.path().join("workspace/x")),
        Duration::from_millis(50),
    );
    assert!(debouncer.cancel());
    assert!(!debouncer.cancel());

    sleep(Duration::from_millis(250)).await;
    assert!(executor.invocations().is_empty());
    assert!(gate.pipeline_status().last_result.is_none());
    Ok(())
}

#[tokio::test]
async fn shutdown_without_start_is_harmless() -> TestResult {
    init_tracing();
    let executor = ScriptedExecutor::new();
    let (gate, provider) = gate_for(ConfigFile::defaults(), &executor);
    let mut coalescer = WatchCoalescer::new(provider, gate.pipeline());

    assert!(!coalescer.is_active());
    coalescer.shutdown().await;
    coalescer.shutdown().await;
    assert!(!coalescer.is_active());
    Ok(())
}

#[tokio::test]
async fn shutdown_does_not_interrupt_a_running_pipeline() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    make_dirs(dir.path())?;
    let executor = ScriptedExecutor::new().delay(CheckName::Build, Duration::from_millis(300));
    let (gate, provider) = gate_for(
        ConfigFileBuilder::new().rooted_at(dir.path()).build(),
        &executor,
    );
    let mut coalescer = WatchCoalescer::new(provider, gate.pipeline());

    coalescer.debouncer().schedule(
        WatchEvent::new(WatchEventKind::Add, dir.path().join("workspace/new.rs")),
        Duration::from_millis(10),
    );
    sleep(Duration::from_millis(100)).await;
    assert!(gate.pipeline_status().running);

    coalescer.shutdown().await;

    assert!(wait_for_result(&gate, Duration::from_secs(3)).await);
    let result = gate.pipeline_status().last_result.ok_or("no run")?;
    assert!(result.ok);
    assert_eq!(result.reason, "watch:add");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn file_writes_in_workspace_trigger_a_single_run() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    make_dirs(dir.path())?;
    let workspace = dir.path().join("workspace");

    let executor = ScriptedExecutor::new();
    let (gate, provider) = gate_for(
        ConfigFileBuilder::new()
            .rooted_at(dir.path())
            .debounce_ms(200)
            .build(),
        &executor,
    );
    let mut coalescer = WatchCoalescer::new(provider, gate.pipeline());
    coalescer.start()?;
    assert!(coalescer.is_active());
    // Let the backend settle before producing events.
    sleep(Duration::from_millis(100)).await;

    for i in 0..5 {
        fs::write(workspace.join(format!("file{i}.txt")), format!("v{i}"))?;
        sleep(Duration::from_millis(10)).await;
    }

    let got_run = wait_for_result(&gate, Duration::from_secs(5)).await;
    sleep(Duration::from_millis(500)).await;
    coalescer.shutdown().await;

    assert!(got_run, "no pipeline run after workspace writes");
    assert_eq!(executor.checks_run(), vec![CheckName::Build, CheckName::Test]);
    let result = gate.pipeline_status().last_result.ok_or("no run")?;
    assert!(result.reason.starts_with("watch:"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn writes_under_ignored_paths_do_not_trigger() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    make_dirs(dir.path())?;
    let workspace = dir.path().join("workspace");
    fs::create_dir_all(workspace.join("target/debug"))?;
    fs::create_dir_all(workspace.join("logs"))?;

    let executor = ScriptedExecutor::new();
    let (gate, provider) = gate_for(
        ConfigFileBuilder::new()
            .rooted_at(dir.path())
            .debounce_ms(100)
            .build(),
        &executor,
    );
    let mut coalescer = WatchCoalescer::new(provider, gate.pipeline());
    coalescer.start()?;
    sleep(Duration::from_millis(100)).await;

    fs::write(workspace.join("target/debug/out.o"), b"obj")?;
    fs::write(workspace.join("logs/run.log"), b"log")?;
    fs::write(workspace.join("lib.rs.watchgate.tmp"), b"tmp")?;

    sleep(Duration::from_millis(600)).await;
    coalescer.shutdown().await;

    assert!(executor.invocations().is_empty());
    assert!(gate.pipeline_status().last_result.is_none());
    Ok(())
}
