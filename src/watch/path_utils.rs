// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::Path;

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First we try a direct `strip_prefix(root)`.
/// - If that fails (e.g. due to symlinks or different absolute prefixes),
///   we canonicalize both paths and try again. A deleted file cannot be
///   canonicalized, so for that case only its parent is canonicalized.
///
/// Returns `None` if the path cannot be related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    let root_canon = root.canonicalize().ok()?;

    if let Ok(path_canon) = path.canonicalize() {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(to_slash(rel));
        }
    }

    // macOS reports /private/var/... for /var/...; removed files no longer
    // exist, so canonicalize the parent and re-attach the file name.
    let parent = path.parent()?.canonicalize().ok()?;
    let name = path.file_name()?;
    parent
        .join(name)
        .strip_prefix(&root_canon)
        .ok()
        .map(to_slash)
}

fn to_slash(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn strips_plain_prefix() {
        let root = PathBuf::from("/w");
        assert_eq!(
            relative_str(&root, Path::new("/w/foo/bar.txt")),
            Some("foo/bar.txt".to_string())
        );
        assert_eq!(relative_str(&root, Path::new("/w")), Some(String::new()));
    }

    #[test]
    fn unrelated_path_is_none() {
        let root = PathBuf::from("/definitely/not/here");
        assert_eq!(relative_str(&root, Path::new("/elsewhere/x")), None);
    }
}
