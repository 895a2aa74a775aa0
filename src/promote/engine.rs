// src/promote/engine.rs

use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ConfigProvider;
use crate::errors::{Result, WatchgateError};
use crate::fs::FileSystem;
use crate::promote::digest::same_contents;
use crate::types::MirrorMode;

/// Suffix of the sibling file a promoted file is copied to before the rename.
pub const PROMOTE_TMP_SUFFIX: &str = ".watchgate.tmp";

/// Snapshot returned by [`PromotionEngine::status`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorStatus {
    pub mirror_path: PathBuf,
    pub mode: MirrorMode,
    /// Time of the last *complete* promotion; stays stale if a later
    /// promotion fails part-way.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_promote_at: Option<DateTime<Utc>>,
}

/// What a call to [`PromotionEngine::promote_to_workspace`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum PromotionOutcome {
    /// The staging tree was walked. `written` files were replaced in the
    /// workspace; `unchanged` already had identical bytes there.
    Promoted { written: usize, unchanged: usize },
    /// Mirror mode is `read-only`.
    SkippedReadOnly,
    /// The staging directory does not exist.
    NothingStaged,
}

#[derive(Debug, Default)]
struct WalkCounts {
    written: usize,
    unchanged: usize,
}

/// Owns the staging store and copies it into the live workspace.
///
/// Every file is copied to `<dest>.watchgate.tmp` and then renamed onto
/// `<dest>`, so a reader of `<dest>` sees either the old or the new content
/// in full. There is no rollback: an error mid-walk leaves the files promoted
/// so far in place and is returned to the caller.
#[derive(Debug)]
pub struct PromotionEngine {
    config: Arc<ConfigProvider>,
    fs: Arc<dyn FileSystem>,
    last_promote_at: Mutex<Option<DateTime<Utc>>>,
}

impl PromotionEngine {
    pub fn new(config: Arc<ConfigProvider>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            config,
            fs,
            last_promote_at: Mutex::new(None),
        }
    }

    pub fn status(&self) -> MirrorStatus {
        let cfg = self.config.get();
        MirrorStatus {
            mirror_path: cfg.mirror.resolved_base_path(),
            mode: cfg.mirror.mode,
            last_promote_at: self.last_promote_at(),
        }
    }

    pub fn last_promote_at(&self) -> Option<DateTime<Utc>> {
        *self
            .last_promote_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Write `content` into the staging store at `relative_path`, creating
    /// intermediate directories. Returns the staged file's full path.
    ///
    /// Absolute paths and paths containing `..` are rejected.
    pub fn stage_file(
        &self,
        relative_path: impl AsRef<Path>,
        content: impl AsRef<[u8]>,
    ) -> Result<PathBuf> {
        let relative_path = relative_path.as_ref();
        check_stage_path(relative_path)?;

        let cfg = self.config.get();
        let target = cfg.mirror.resolved_base_path().join(relative_path);

        self.fs.write(&target, content.as_ref())?;
        debug!(path = %target.display(), "staged file");
        Ok(target)
    }

    /// Copy every staged file into the workspace.
    ///
    /// Does nothing (with a warning) unless the mode is
    /// `stage-then-promote`, and nothing at all if the staging directory
    /// is missing. The last-promotion timestamp is only updated after the
    /// whole tree was walked without error.
    pub fn promote_to_workspace(&self) -> Result<PromotionOutcome> {
        let cfg = self.config.get();

        if cfg.mirror.mode != MirrorMode::StageThenPromote {
            warn!(mode = %cfg.mirror.mode, "mirror mode does not allow promotion; skipped");
            return Ok(PromotionOutcome::SkippedReadOnly);
        }

        let mirror_base = cfg.mirror.resolved_base_path();
        let workspace_base = cfg.watch.resolved_base_path();

        // The staging root itself may be a symlink; entries below it are
        // never followed.
        let mirror_base = self.fs.canonicalize(&mirror_base).unwrap_or(mirror_base);

        if !self.fs.is_dir(&mirror_base) {
            debug!(mirror = %mirror_base.display(), "no staging directory; nothing to promote");
            return Ok(PromotionOutcome::NothingStaged);
        }

        let mut counts = WalkCounts::default();
        self.walk(&mirror_base, &mirror_base, &workspace_base, &mut counts)?;

        let now = Utc::now();
        *self
            .last_promote_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(now);

        info!(
            written = counts.written,
            unchanged = counts.unchanged,
            at = %now.to_rfc3339(),
            "promoted mirror -> workspace"
        );

        Ok(PromotionOutcome::Promoted {
            written: counts.written,
            unchanged: counts.unchanged,
        })
    }

    fn walk(
        &self,
        dir: &Path,
        mirror_base: &Path,
        workspace_base: &Path,
        counts: &mut WalkCounts,
    ) -> Result<()> {
        for full in self.fs.read_dir(dir)? {
            let rel = full
                .strip_prefix(mirror_base)
                .with_context(|| format!("{:?} is outside the mirror {:?}", full, mirror_base))?;
            let dest = workspace_base.join(rel);

            if self.fs.is_dir(&full) {
                self.fs.create_dir_all(&dest)?;
                self.walk(&full, mirror_base, workspace_base, counts)?;
            } else if self.fs.is_file(&full) {
                if same_contents(self.fs.as_ref(), &full, &dest) {
                    debug!(path = %rel.display(), "workspace already up to date");
                    counts.unchanged += 1;
                    continue;
                }
                self.replace_file(&full, &dest)?;
                debug!(path = %rel.display(), "promoted file");
                counts.written += 1;
            } else {
                debug!(path = %full.display(), "skipping non-regular staging entry");
            }
        }
        Ok(())
    }

    fn replace_file(&self, src: &Path, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            self.fs.create_dir_all(parent)?;
        }

        let tmp = tmp_path_for(dest);
        self.fs.copy(src, &tmp)?;

        if let Err(err) = self.fs.rename(&tmp, dest) {
            let _ = self.fs.remove_file(&tmp);
            return Err(err.into());
        }
        Ok(())
    }
}

/// `<dest>.watchgate.tmp`, next to `dest` so the rename stays on one
/// filesystem.
pub fn tmp_path_for(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(PROMOTE_TMP_SUFFIX);
    PathBuf::from(name)
}

fn check_stage_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(WatchgateError::InvalidStagePath(
            "path must not be empty".to_string(),
        ));
    }

    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => {
                return Err(WatchgateError::InvalidStagePath(format!(
                    "{} escapes the staging directory",
                    path.display()
                )));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(WatchgateError::InvalidStagePath(format!(
                    "{} must be relative",
                    path.display()
                )));
            }
        }
    }
    Ok(())
}
