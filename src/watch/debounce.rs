// src/watch/debounce.rs

//! Trailing debounce in front of the pipeline runner.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::pipeline::PipelineRunner;

/// Kind of a qualifying filesystem event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    Add,
    Change,
    Unlink,
}

impl WatchEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchEventKind::Add => "add",
            WatchEventKind::Change => "change",
            WatchEventKind::Unlink => "unlink",
        }
    }
}

impl fmt::Display for WatchEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The last event seen before a timer fires. Only used for the run reason
/// and for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub path: PathBuf,
}

impl WatchEvent {
    pub fn new(kind: WatchEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// `watch:<kind>`, the reason handed to the pipeline.
    pub fn reason(&self) -> String {
        format!("watch:{}", self.kind)
    }
}

#[derive(Debug)]
struct PendingTimer {
    id: u64,
    handle: JoinHandle<()>,
}

type Slot = Arc<Mutex<Option<PendingTimer>>>;

/// Single-slot pending timer.
///
/// Each `schedule` aborts the pending timer (if any) and installs a new one,
/// so at most one timer is ever armed. The slot's timer id is checked under
/// the lock when a timer fires: a timer that was replaced while waking up
/// sees a different id and exits without triggering.
///
/// A fired timer runs the pipeline in its own task. Cancelling the slot
/// afterwards (or shutting down) does not interrupt that run.
pub struct Debouncer {
    pipeline: Arc<PipelineRunner>,
    slot: Slot,
    next_id: AtomicU64,
}

impl fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debouncer")
            .field("pending", &self.has_pending())
            .finish_non_exhaustive()
    }
}

impl Debouncer {
    pub fn new(pipeline: Arc<PipelineRunner>) -> Self {
        Self {
            pipeline,
            slot: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(1),
        }
    }

    /// Record `event` and (re)arm the timer to fire `delay` from now.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule(&self, event: WatchEvent, delay: Duration) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut slot = lock(&self.slot);

        if let Some(prev) = slot.take() {
            prev.handle.abort();
            debug!(replaced = prev.id, timer = id, "debounce timer rescheduled");
        }

        let handle = tokio::spawn(fire_after(
            id,
            delay,
            event,
            Arc::clone(&self.slot),
            Arc::clone(&self.pipeline),
        ));
        *slot = Some(PendingTimer { id, handle });
    }

    /// Cancel the pending timer. Returns true if one was armed.
    pub fn cancel(&self) -> bool {
        match lock(&self.slot).take() {
            Some(timer) => {
                timer.handle.abort();
                debug!(timer = timer.id, "debounce timer cancelled");
                true
            }
            None => false,
        }
    }

    pub fn has_pending(&self) -> bool {
        lock(&self.slot).is_some()
    }
}

async fn fire_after(
    id: u64,
    delay: Duration,
    event: WatchEvent,
    slot: Slot,
    pipeline: Arc<PipelineRunner>,
) {
    tokio::time::sleep(delay).await;

    {
        let mut slot = lock(&slot);
        if slot.as_ref().map(|timer| timer.id) != Some(id) {
            debug!(timer = id, "debounce timer superseded before firing");
            return;
        }
        slot.take();
    }

    let reason = event.reason();
    info!(reason = %reason, path = %event.path.display(), "quiet period elapsed; triggering pipeline");

    // Separate task: aborting this timer from here on must not abort the run,
    // and a panic inside the run must not escape.
    let run = tokio::spawn(async move {
        pipeline.run(&reason, Some(event.path.as_path())).await
    });

    match run.await {
        Ok(result) => {
            debug!(ok = result.ok, reason = %result.reason, "watch-triggered run returned");
        }
        Err(err) if err.is_panic() => {
            error!(error = %err, "watch-triggered pipeline run panicked");
        }
        Err(err) => {
            error!(error = %err, "watch-triggered pipeline run did not complete");
        }
    }
}

fn lock(slot: &Mutex<Option<PendingTimer>>) -> MutexGuard<'_, Option<PendingTimer>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
