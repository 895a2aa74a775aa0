// src/config/provider.rs

//! Holder of the current configuration snapshot.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

use crate::config::loader::load_or_default;
use crate::config::model::ConfigFile;

/// Hands out the current [`ConfigFile`] snapshot and swaps it on reload.
///
/// Snapshots are never mutated in place. Callers take an `Arc` at the start
/// of an operation and keep using it until that operation ends, so a reload
/// only affects operations that start afterwards.
#[derive(Debug)]
pub struct ConfigProvider {
    /// Backing file; `None` for providers built from an in-memory config.
    path: Option<PathBuf>,
    current: RwLock<Arc<ConfigFile>>,
}

impl ConfigProvider {
    /// Load from `path` (or defaults if the file is missing or broken).
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cfg = load_or_default(&path);
        Self {
            path: Some(path),
            current: RwLock::new(Arc::new(cfg)),
        }
    }

    /// Provider with a fixed snapshot and no backing file.
    pub fn from_config(cfg: ConfigFile) -> Self {
        Self {
            path: None,
            current: RwLock::new(Arc::new(cfg)),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current snapshot.
    pub fn get(&self) -> Arc<ConfigFile> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Re-read the backing file, replace the snapshot and return it.
    ///
    /// Without a backing file the current snapshot is returned unchanged.
    pub fn reload(&self) -> Arc<ConfigFile> {
        let Some(path) = &self.path else {
            debug!("config provider has no backing file; reload keeps current snapshot");
            return self.get();
        };

        let fresh = Arc::new(load_or_default(path));
        {
            let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
            *guard = Arc::clone(&fresh);
        }
        info!(path = %path.display(), "configuration reloaded");
        fresh
    }
}
