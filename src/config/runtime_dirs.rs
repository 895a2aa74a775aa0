// src/config/runtime_dirs.rs

use anyhow::Result;
use tracing::debug;

use crate::config::model::RuntimeSection;
use crate::fs::FileSystem;

/// Create every `requiredDirs` entry (recursively). Existing directories are
/// left alone.
pub fn ensure_runtime_dirs(fs: &dyn FileSystem, runtime: &RuntimeSection) -> Result<()> {
    for dir in &runtime.required_dirs {
        let dir = std::path::absolute(dir).unwrap_or_else(|_| dir.clone());
        if !fs.is_dir(&dir) {
            debug!(dir = %dir.display(), "creating runtime directory");
        }
        fs.create_dir_all(&dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use std::path::PathBuf;

    #[test]
    fn creates_missing_dirs_and_tolerates_existing_ones() {
        let fs = MockFileSystem::new();
        fs.create_dir_all(&PathBuf::from("/r/logs")).unwrap();
        let runtime = RuntimeSection {
            required_dirs: vec![PathBuf::from("/r/logs"), PathBuf::from("/r/data/cache")],
        };

        ensure_runtime_dirs(&fs, &runtime).unwrap();
        ensure_runtime_dirs(&fs, &runtime).unwrap();

        assert!(fs.is_dir(&PathBuf::from("/r/logs")));
        assert!(fs.is_dir(&PathBuf::from("/r/data/cache")));
    }
}
