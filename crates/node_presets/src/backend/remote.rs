//! Per-user document store implementations

use super::{UserDataFuture, UserDataStore};
use crate::BackendError;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

/// In-memory user data store
///
/// Intended for tests and development. A failure status can be injected to
/// make every request fail until it is cleared.
#[derive(Debug, Default)]
pub struct MemoryUserDataStore {
    documents: RwLock<HashMap<String, Vec<u8>>>,
    failure: RwLock<Option<(u16, String)>>,
    writes: AtomicUsize,
}

impl MemoryUserDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent request fail with the given status
    pub fn fail_with(&self, status: u16, message: impl Into<String>) {
        *self.failure.write().unwrap() = Some((status, message.into()));
    }

    pub fn clear_failure(&self) {
        *self.failure.write().unwrap() = None;
    }

    /// Seed a document directly, bypassing failure injection
    pub fn insert(&self, file: impl Into<String>, contents: impl Into<Vec<u8>>) {
        self.documents
            .write()
            .unwrap()
            .insert(file.into(), contents.into());
    }

    /// Current contents of a document
    pub fn document(&self, file: &str) -> Option<Vec<u8>> {
        self.documents.read().unwrap().get(file).cloned()
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> Result<(), BackendError> {
        match self.failure.read().unwrap().as_ref() {
            Some((status, message)) => Err(BackendError::Status {
                status: *status,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl UserDataStore for MemoryUserDataStore {
    fn get_user_data<'a>(&'a self, file: &'a str) -> UserDataFuture<'a, Result<Vec<u8>, BackendError>> {
        Box::pin(async move {
            self.check_failure()?;
            self.document(file)
                .ok_or_else(|| BackendError::NotFound(file.to_string()))
        })
    }

    fn store_user_data<'a>(
        &'a self,
        file: &'a str,
        contents: &'a [u8],
    ) -> UserDataFuture<'a, Result<(), BackendError>> {
        Box::pin(async move {
            self.check_failure()?;
            self.insert(file, contents);
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

/// User data store backed by a per-user directory
#[derive(Debug, Clone)]
pub struct FileUserDataStore {
    root: PathBuf,
}

impl FileUserDataStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a file name inside the user directory
    ///
    /// Absolute paths and parent-directory components are rejected so a
    /// document name can never point outside the root.
    fn resolve(&self, file: &str) -> Result<PathBuf, BackendError> {
        let relative = Path::new(file);
        let is_contained = !file.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));

        if !is_contained {
            return Err(BackendError::Status {
                status: 400,
                message: format!("Invalid file path: {}", file),
            });
        }
        Ok(self.root.join(relative))
    }
}

impl UserDataStore for FileUserDataStore {
    fn get_user_data<'a>(&'a self, file: &'a str) -> UserDataFuture<'a, Result<Vec<u8>, BackendError>> {
        Box::pin(async move {
            let path = self.resolve(file)?;
            match tokio::fs::read(&path).await {
                Ok(contents) => Ok(contents),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(BackendError::NotFound(file.to_string()))
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    fn store_user_data<'a>(
        &'a self,
        file: &'a str,
        contents: &'a [u8],
    ) -> UserDataFuture<'a, Result<(), BackendError>> {
        Box::pin(async move {
            let path = self.resolve(file)?;
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, contents).await?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_store_not_found() {
        let store = MemoryUserDataStore::new();
        match store.get_user_data("node.presets.json").await {
            Err(BackendError::NotFound(file)) => assert_eq!(file, "node.presets.json"),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_memory_store_failure_injection() {
        let store = MemoryUserDataStore::new();
        store.insert("a.json", b"{}".to_vec());
        store.fail_with(500, "Internal Server Error");

        match store.get_user_data("a.json").await {
            Err(BackendError::Status { status, .. }) => assert_eq!(status, 500),
            other => panic!("Expected Status error, got {:?}", other),
        }
        assert!(store.store_user_data("a.json", b"[]").await.is_err());
        assert_eq!(store.write_count(), 0);

        store.clear_failure();
        assert_eq!(store.get_user_data("a.json").await.unwrap(), b"{}".to_vec());
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileUserDataStore::new(temp_dir.path().join("user"));

        assert!(store
            .get_user_data("node.presets.json")
            .await
            .unwrap_err()
            .is_not_found());

        store
            .store_user_data("node.presets.json", b"{\"presets\":{}}")
            .await
            .unwrap();
        assert_eq!(
            store.get_user_data("node.presets.json").await.unwrap(),
            b"{\"presets\":{}}".to_vec()
        );
    }

    #[tokio::test]
    async fn test_file_store_nested_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileUserDataStore::new(temp_dir.path());

        store.store_user_data("presets/nodes.json", b"{}").await.unwrap();
        assert!(temp_dir.path().join("presets/nodes.json").exists());
    }

    #[tokio::test]
    async fn test_file_store_rejects_escaping_paths() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileUserDataStore::new(temp_dir.path().join("user"));

        for file in ["../outside.json", "/etc/passwd", ""] {
            match store.store_user_data(file, b"{}").await {
                Err(BackendError::Status { status, .. }) => assert_eq!(status, 400),
                other => panic!("Expected rejection for {:?}, got {:?}", file, other),
            }
        }
    }
}
