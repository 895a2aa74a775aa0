// src/exec/command.rs

//! Single check process runner.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::CommandSpec;
use crate::errors::{Result, WatchgateError};

/// Marker returned for a successful command that printed nothing.
pub const EMPTY_OUTPUT_MARKER: &str = "(ok)";

/// Build the `tokio::process::Command` for a spec.
///
/// Exec-form specs run the program directly. Shell-form specs go through the
/// platform shell.
pub fn build_command(spec: &CommandSpec) -> Command {
    match spec {
        CommandSpec::Exec { program, args } => {
            let mut c = Command::new(program);
            c.args(args);
            c
        }
        CommandSpec::Shell(line) => {
            if cfg!(windows) {
                let mut c = Command::new("cmd");
                c.arg("/C").arg(line);
                c
            } else {
                let mut c = Command::new("sh");
                c.arg("-c").arg(line);
                c
            }
        }
    }
}

/// Run one command to completion (or until `timeout`), buffering its output.
///
/// - No stdin; stdout and stderr are captured in full.
/// - `timeout` covers the whole exchange: waiting for the process *and*
///   draining its pipes. A background process that keeps the pipes open
///   cannot hold the run past the deadline.
/// - On timeout the process group is killed and `CommandTimedOut` is
///   returned.
/// - A non-zero exit returns `CommandFailed` carrying stderr, or stdout when
///   stderr is empty.
/// - Success returns trimmed stdout, or [`EMPTY_OUTPUT_MARKER`].
pub async fn run_command(spec: &CommandSpec, timeout: Duration) -> Result<String> {
    let cmd_text = spec.to_string();
    let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);

    info!(cmd = %cmd_text, timeout_ms, "starting check process");

    let mut cmd = build_command(spec);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    // Own process group, so a timeout can take down everything the check
    // started.
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn().map_err(|source| WatchgateError::CommandSpawn {
        command: cmd_text.clone(),
        source,
    })?;
    let pid = child.id();

    let mut stdout = spawn_reader(child.stdout.take());
    let mut stderr = spawn_reader(child.stderr.take());

    let finished = tokio::time::timeout(timeout, async {
        let status = child.wait().await?;
        let out = collect(&mut stdout).await;
        let err = collect(&mut stderr).await;
        Ok::<_, std::io::Error>((status, out, err))
    })
    .await;

    let (status, out, err) = match finished {
        Ok(done) => done?,
        Err(_elapsed) => {
            warn!(cmd = %cmd_text, timeout_ms, "check timed out; killing process group");
            kill_tree(&mut child, pid, &cmd_text).await;
            stdout.abort();
            stderr.abort();
            return Err(WatchgateError::CommandTimedOut {
                command: cmd_text,
                timeout_ms,
            });
        }
    };

    let code = status.code().unwrap_or(-1);
    info!(
        cmd = %cmd_text,
        exit_code = code,
        success = status.success(),
        "check process exited"
    );

    if status.success() {
        let trimmed = out.trim();
        if trimmed.is_empty() {
            Ok(EMPTY_OUTPUT_MARKER.to_string())
        } else {
            Ok(trimmed.to_string())
        }
    } else {
        let output = if err.is_empty() { out } else { err };
        Err(WatchgateError::CommandFailed {
            command: cmd_text,
            code,
            output,
        })
    }
}

/// Kill the check's process group, then the direct child if it has not been
/// reaped yet.
async fn kill_tree(child: &mut Child, pid: Option<u32>, cmd_text: &str) {
    if let Some(pid) = pid {
        kill_process_group(pid, cmd_text).await;
    }

    if let Ok(None) = child.try_wait() {
        if let Err(e) = child.kill().await {
            warn!(cmd = %cmd_text, error = %e, "failed to kill timed-out process");
        }
    }
}

#[cfg(unix)]
async fn kill_process_group(pgid: u32, cmd_text: &str) {
    let group = format!("-{pgid}");
    let res = Command::new("kill")
        .args(["-KILL", "--", group.as_str()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match res {
        Ok(status) if status.success() => {
            debug!(cmd = %cmd_text, pgid, "killed process group");
        }
        Ok(status) => {
            debug!(cmd = %cmd_text, pgid, ?status, "process group already gone");
        }
        Err(e) => {
            warn!(cmd = %cmd_text, pgid, error = %e, "failed to signal process group");
        }
    }
}

#[cfg(not(unix))]
async fn kill_process_group(_pgid: u32, _cmd_text: &str) {}

fn spawn_reader<R>(pipe: Option<R>) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            if let Err(e) = pipe.read_to_end(&mut buf).await {
                debug!(error = %e, "error reading child output");
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

async fn collect(handle: &mut JoinHandle<String>) -> String {
    handle.await.unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn success_returns_trimmed_stdout() {
        let out = run_command(&"echo '  hello  '".into(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn empty_stdout_yields_marker() {
        let out = run_command(&"true".into(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out, EMPTY_OUTPUT_MARKER);
    }

    #[tokio::test]
    async fn failure_prefers_stderr() {
        let err = run_command(&"echo out; echo err >&2; exit 3".into(), Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            WatchgateError::CommandFailed { code, output, .. } => {
                assert_eq!(code, 3);
                assert_eq!(output.trim(), "err");
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failure_falls_back_to_stdout() {
        let err = run_command(&"echo only-out; exit 2".into(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Command failed (2)"));
        assert!(err.to_string().contains("only-out"));
    }

    #[tokio::test]
    async fn exec_form_passes_args_verbatim() {
        let spec = CommandSpec::exec("echo", ["a;b", "$HOME"]);
        let out = run_command(&spec, Duration::from_secs(5)).await.unwrap();
        assert_eq!(out, "a;b $HOME");
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let spec = CommandSpec::exec("watchgate-definitely-not-a-program", Vec::<String>::new());
        let err = run_command(&spec, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, WatchgateError::CommandSpawn { .. }));
    }

    #[tokio::test]
    async fn background_child_holding_pipes_still_times_out() {
        let start = std::time::Instant::now();
        let err = run_command(&"sleep 3 & echo hi".into(), Duration::from_millis(200))
            .await
            .unwrap_err();

        assert!(start.elapsed() < Duration::from_millis(1500), "took {:?}", start.elapsed());
        match err {
            WatchgateError::CommandTimedOut { command, timeout_ms } => {
                assert_eq!(command, "sleep 3 & echo hi");
                assert_eq!(timeout_ms, 200);
            }
            other => panic!("expected CommandTimedOut, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn timeout_kills_the_whole_process_group() {
        let dir = tempfile::TempDir::new().unwrap();
        let marker = dir.path().join("survived");
        let line = format!("(sleep 1; touch {}) & sleep 5", marker.display());

        let err = run_command(&line.as_str().into(), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, WatchgateError::CommandTimedOut { .. }));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists(), "background job outlived the timeout");
    }
}
