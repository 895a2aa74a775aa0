// src/watch/patterns.rs

use std::fmt;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::errors::{Result, WatchgateError};

/// Compiled `[watch].ignored` globs.
///
/// Patterns are matched against paths relative to the watch root with
/// forward slashes, e.g. `"node_modules/left-pad/index.js"`. A leading `**/`
/// also matches at the root, so `**/.git/**` ignores `.git/HEAD`.
#[derive(Clone)]
pub struct IgnoreRules {
    patterns: Vec<String>,
    set: GlobSet,
}

impl fmt::Debug for IgnoreRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IgnoreRules")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl IgnoreRules {
    pub fn compile(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pat in patterns {
            let glob = Glob::new(pat).map_err(|e| {
                WatchgateError::ConfigError(format!("invalid ignore glob pattern {pat:?}: {e}"))
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|e| {
            WatchgateError::ConfigError(format!("failed to build ignore glob set: {e}"))
        })?;

        Ok(Self {
            patterns: patterns.to_vec(),
            set,
        })
    }

    /// Rules that ignore nothing.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// True if events for `rel_path` must be dropped.
    pub fn is_ignored(&self, rel_path: &str) -> bool {
        self.set.is_match(rel_path)
    }
}
