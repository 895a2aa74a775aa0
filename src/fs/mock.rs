// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir,
}

/// In-memory filesystem keyed by full path.
///
/// Directory listings are derived from the keys, so `rename` is a single map
/// update and therefore atomic with respect to other callers.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<BTreeMap<PathBuf, MockEntry>>>,
    /// Every write/copy/rename, in order, as `"<op> <path>"`.
    journal: Arc<Mutex<Vec<String>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref();
        let mut entries = self.entries();
        insert_parents(&mut entries, path);
        entries.insert(path.to_path_buf(), MockEntry::File(content.into()));
    }

    pub fn file_contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.entries().get(path.as_ref()) {
            Some(MockEntry::File(bytes)) => Some(bytes.clone()),
            _ => None,
        }
    }

    /// Mutating operations performed so far.
    pub fn journal(&self) -> Vec<String> {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<PathBuf, MockEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, op: &str, path: &Path) {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(format!("{op} {}", path.display()));
    }
}

fn insert_parents(entries: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
    for ancestor in path.ancestors().skip(1) {
        if ancestor.as_os_str().is_empty() {
            continue;
        }
        entries
            .entry(ancestor.to_path_buf())
            .or_insert(MockEntry::Dir);
    }
}

impl FileSystem for MockFileSystem {
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        match self.entries().get(path) {
            Some(MockEntry::File(content)) => Ok(Box::new(Cursor::new(content.clone()))),
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        self.record("write", path);
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut entries = self.entries();
        if let Some(MockEntry::File(_)) = entries.get(path) {
            return Err(anyhow!("Is a file: {:?}", path));
        }
        insert_parents(&mut entries, path);
        entries.insert(path.to_path_buf(), MockEntry::Dir);
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<u64> {
        let mut entries = self.entries();
        let bytes = match entries.get(from) {
            Some(MockEntry::File(bytes)) => bytes.clone(),
            Some(MockEntry::Dir) => return Err(anyhow!("Is a directory: {:?}", from)),
            None => return Err(anyhow!("File not found: {:?}", from)),
        };
        let len = bytes.len() as u64;
        insert_parents(&mut entries, to);
        entries.insert(to.to_path_buf(), MockEntry::File(bytes));
        drop(entries);
        self.record("copy", to);
        Ok(len)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let mut entries = self.entries();
        let entry = entries
            .remove(from)
            .ok_or_else(|| anyhow!("File not found: {:?}", from))?;
        entries.insert(to.to_path_buf(), entry);
        drop(entries);
        self.record("rename", to);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        match self.entries().remove(path) {
            Some(_) => Ok(()),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.entries().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.entries().get(path), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.entries().get(path), Some(MockEntry::Dir))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let entries = self.entries();
        match entries.get(path) {
            Some(MockEntry::Dir) => Ok(entries
                .keys()
                .filter(|p| p.parent() == Some(path))
                .cloned()
                .collect()),
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }

    // No symlinks in memory: existing paths resolve to themselves.
    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        if self.exists(path) {
            Ok(path.to_path_buf())
        } else {
            Err(anyhow!("File not found: {:?}", path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_dir_lists_direct_children_only() {
        let fs = MockFileSystem::new();
        fs.add_file("/m/a.txt", b"a".to_vec());
        fs.add_file("/m/sub/b.txt", b"b".to_vec());

        let children = fs.read_dir(Path::new("/m")).unwrap();
        assert_eq!(
            children,
            vec![PathBuf::from("/m/a.txt"), PathBuf::from("/m/sub")]
        );
        assert!(fs.is_dir(Path::new("/m/sub")));
    }

    #[test]
    fn rename_replaces_destination() {
        let fs = MockFileSystem::new();
        fs.add_file("/w/a.txt", b"old".to_vec());
        fs.add_file("/w/a.txt.tmp", b"new".to_vec());

        fs.rename(Path::new("/w/a.txt.tmp"), Path::new("/w/a.txt"))
            .unwrap();

        assert_eq!(fs.file_contents("/w/a.txt"), Some(b"new".to_vec()));
        assert!(!fs.exists(Path::new("/w/a.txt.tmp")));
    }
}
