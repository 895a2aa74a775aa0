// src/promote/digest.rs

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;

use crate::fs::FileSystem;

/// Compute the blake3 hex digest of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// True when `dest` exists and holds exactly the bytes of `src`.
///
/// Any error reading either side counts as "different".
pub fn same_contents(fs: &dyn FileSystem, src: &Path, dest: &Path) -> bool {
    if !fs.is_file(dest) {
        return false;
    }
    match (compute_file_hash(fs, src), compute_file_hash(fs, dest)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use std::path::PathBuf;

    #[test]
    fn hashes_known_content() {
        let fs = MockFileSystem::new();
        fs.add_file("test.txt", b"hello world".to_vec());

        let hash = compute_file_hash(&fs, &PathBuf::from("test.txt")).unwrap();
        assert_eq!(
            hash,
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
    }

    #[test]
    fn same_contents_requires_existing_destination() {
        let fs = MockFileSystem::new();
        fs.add_file("/m/a", b"x".to_vec());
        assert!(!same_contents(&fs, Path::new("/m/a"), Path::new("/w/a")));

        fs.add_file("/w/a", b"x".to_vec());
        assert!(same_contents(&fs, Path::new("/m/a"), Path::new("/w/a")));

        fs.add_file("/w/a", b"y".to_vec());
        assert!(!same_contents(&fs, Path::new("/m/a"), Path::new("/w/a")));
    }
}
