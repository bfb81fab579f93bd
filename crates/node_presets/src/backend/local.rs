//! Device-local key/value storage implementations

use super::{sanitize_filename, LocalStorage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// In-memory local storage, for tests and hosts without durable storage
#[derive(Debug, Default)]
pub struct MemoryLocalStorage {
    items: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryLocalStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.items.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LocalStorage for MemoryLocalStorage {
    fn get_item(&self, key: &str) -> std::io::Result<Option<Vec<u8>>> {
        Ok(self.items.read().unwrap().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &[u8]) -> std::io::Result<()> {
        self.items
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

/// Local storage keeping one file per key inside a directory
///
/// Writes go to a temporary file that is renamed over the previous value, so
/// a crash mid-write leaves the old document readable.
///
/// File names are the sanitized key, so keys that differ only in characters
/// outside `[A-Za-z0-9 _-]` share a file (`"a/b"` and `"a_b"` both map to
/// `a_b.json`). Use keys made of those characters only.
#[derive(Debug, Clone)]
pub struct FileLocalStorage {
    dir: PathBuf,
}

impl FileLocalStorage {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn item_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_filename(key)))
    }
}

impl LocalStorage for FileLocalStorage {
    fn get_item(&self, key: &str) -> std::io::Result<Option<Vec<u8>>> {
        match std::fs::read(self.item_path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set_item(&self, key: &str, value: &[u8]) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let path = self.item_path(key);
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, value)?;
        std::fs::rename(&tmp_path, &path)
    }
}
