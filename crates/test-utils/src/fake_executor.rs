use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use watchgate::config::CommandSpec;
use watchgate::errors::{Result, WatchgateError};
use watchgate::exec::CheckExecutor;
use watchgate::types::CheckName;

/// One recorded call to [`ScriptedExecutor::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub check: CheckName,
    pub command: String,
}

#[derive(Debug, Clone, Default)]
struct Script {
    fail_with: Option<(i32, String)>,
    delay: Option<Duration>,
}

/// A fake executor that:
/// - records which checks were "run", in order
/// - succeeds with `"<check> ok"` unless told to fail for that check
/// - optionally sleeps per check, to hold a run open
/// - tracks the highest number of checks executing at once
#[derive(Debug, Clone, Default)]
pub struct ScriptedExecutor {
    scripts: Arc<Mutex<HashMap<CheckName, Script>>>,
    invocations: Arc<Mutex<Vec<Invocation>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `check` exit with `code`, reporting `output`.
    pub fn fail(self, check: CheckName, code: i32, output: &str) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(check)
            .or_default()
            .fail_with = Some((code, output.to_string()));
        self
    }

    /// Make `check` take `delay` before finishing.
    pub fn delay(self, check: CheckName, delay: Duration) -> Self {
        self.scripts.lock().unwrap().entry(check).or_default().delay = Some(delay);
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn checks_run(&self) -> Vec<CheckName> {
        self.invocations().into_iter().map(|i| i.check).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl CheckExecutor for ScriptedExecutor {
    fn execute<'a>(
        &'a self,
        check: CheckName,
        command: &'a CommandSpec,
        _timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            self.invocations.lock().unwrap().push(Invocation {
                check,
                command: command.to_string(),
            });

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let script = self
                .scripts
                .lock()
                .unwrap()
                .get(&check)
                .cloned()
                .unwrap_or_default();

            if let Some(delay) = script.delay {
                tokio::time::sleep(delay).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match script.fail_with {
                Some((code, output)) => Err(WatchgateError::CommandFailed {
                    command: command.to_string(),
                    code,
                    output,
                }),
                None => Ok(format!("{check} ok")),
            }
        })
    }
}
