// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::{ConfigFile, ConfigProvider};
use crate::errors::Result;
use crate::pipeline::PipelineRunner;
use crate::watch::debounce::{Debouncer, WatchEvent, WatchEventKind};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::IgnoreRules;

/// Live subscription: the notify watcher plus the task draining its events.
struct WatchSession {
    root: PathBuf,
    watcher: RecommendedWatcher,
    event_loop: JoinHandle<()>,
}

/// Turns filesystem notifications under `[watch].basePath` into debounced
/// pipeline runs.
pub struct WatchCoalescer {
    config: Arc<ConfigProvider>,
    debouncer: Arc<Debouncer>,
    session: Option<WatchSession>,
}

impl std::fmt::Debug for WatchCoalescer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchCoalescer")
            .field("root", &self.root())
            .field("debouncer", &self.debouncer)
            .finish()
    }
}

impl WatchCoalescer {
    pub fn new(config: Arc<ConfigProvider>, pipeline: Arc<PipelineRunner>) -> Self {
        Self {
            config,
            debouncer: Arc::new(Debouncer::new(pipeline)),
            session: None,
        }
    }

    pub fn debouncer(&self) -> Arc<Debouncer> {
        Arc::clone(&self.debouncer)
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Directory being watched, if a session is active.
    pub fn root(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.root.as_path())
    }

    /// Subscribe recursively to the configured watch path.
    ///
    /// The base path is read once here; changing it requires a restart.
    /// Ignore globs and the debounce delay are re-read from the current
    /// snapshot as events arrive. Must be called from within a Tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        if self.session.is_some() {
            warn!("watch session already active; start ignored");
            return Ok(());
        }

        let cfg = self.config.get();
        let root = cfg.watch.resolved_base_path();
        // Canonicalize once so we have a stable base path.
        let root = root.canonicalize().unwrap_or(root);

        // Channel from the blocking notify callback into the async world.
        let (event_tx, event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                // Receiver gone means we are shutting down.
                let _ = event_tx.send(res);
            },
            Config::default(),
        )?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        let event_loop = tokio::spawn(run_event_loop(
            root.clone(),
            Arc::clone(&self.config),
            Arc::clone(&self.debouncer),
            event_rx,
        ));

        info!(root = %root.display(), "file watcher started");

        self.session = Some(WatchSession {
            root,
            watcher,
            event_loop,
        });
        Ok(())
    }

    /// Cancel the pending timer and close the subscription.
    ///
    /// Safe to call without a session and more than once. A run that is
    /// already in progress keeps going.
    pub async fn shutdown(&mut self) {
        if self.debouncer.cancel() {
            debug!("pending debounce timer cancelled on shutdown");
        }

        let Some(session) = self.session.take() else {
            return;
        };

        // Dropping the watcher drops the callback and with it the sender, so
        // the event loop sees a closed channel and exits.
        drop(session.watcher);
        if let Err(err) = session.event_loop.await {
            warn!(error = %err, "watch event loop ended abnormally");
        }

        info!(root = %session.root.display(), "file watcher stopped");
    }
}

async fn run_event_loop(
    root: PathBuf,
    config: Arc<ConfigProvider>,
    debouncer: Arc<Debouncer>,
    mut event_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
) {
    let mut snapshot = config.get();
    let mut rules = rules_for(&snapshot, None);

    while let Some(res) = event_rx.recv().await {
        let event = match res {
            Ok(event) => event,
            Err(err) => {
                warn!(error = %err, "file watch error");
                continue;
            }
        };

        let Some(kind) = classify(&event.kind) else {
            trace!(?event, "ignoring non-content event");
            continue;
        };

        let current = config.get();
        if !Arc::ptr_eq(&current, &snapshot) {
            rules = rules_for(&current, Some(rules));
            snapshot = current;
        }

        for path in event.paths {
            if kind != WatchEventKind::Unlink && path.is_dir() {
                continue;
            }

            let Some(rel) = relative_str(&root, &path) else {
                debug!(path = %path.display(), root = %root.display(), "event outside watch root");
                continue;
            };
            if rel.is_empty() || rules.is_ignored(&rel) {
                trace!(path = %rel, "ignored path");
                continue;
            }

            debug!(kind = %kind, path = %rel, "watch event");
            debouncer.schedule(WatchEvent::new(kind, path), snapshot.watch.debounce());
        }
    }

    debug!("watch event loop finished");
}

/// Compile the snapshot's ignore globs, keeping `previous` if they don't
/// compile. Validated snapshots always compile.
fn rules_for(cfg: &ConfigFile, previous: Option<IgnoreRules>) -> IgnoreRules {
    match IgnoreRules::compile(&cfg.watch.ignored) {
        Ok(rules) => rules,
        Err(err) => {
            warn!(error = %err, "ignore globs did not compile");
            previous.unwrap_or_else(IgnoreRules::empty)
        }
    }
}

/// Map a notify event kind onto add / change / unlink. Access and
/// metadata-only events carry no content change and are dropped.
pub fn classify(kind: &EventKind) -> Option<WatchEventKind> {
    match kind {
        EventKind::Create(_) => Some(WatchEventKind::Add),
        EventKind::Remove(_) => Some(WatchEventKind::Unlink),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(WatchEventKind::Unlink),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(WatchEventKind::Add),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(WatchEventKind::Change),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind};

    #[test]
    fn classifies_content_events() {
        assert_eq!(
            classify(&EventKind::Create(CreateKind::File)),
            Some(WatchEventKind::Add)
        );
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            Some(WatchEventKind::Change)
        );
        assert_eq!(
            classify(&EventKind::Remove(RemoveKind::File)),
            Some(WatchEventKind::Unlink)
        );
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Name(RenameMode::To))),
            Some(WatchEventKind::Add)
        );
    }

    #[test]
    fn drops_access_and_metadata_events() {
        assert_eq!(classify(&EventKind::Access(AccessKind::Any)), None);
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any))),
            None
        );
    }
}
