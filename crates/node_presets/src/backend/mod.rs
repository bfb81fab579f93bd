//! Storage backends for the preset document
//!
//! Presets are stored as a single document in one of two places:
//!
//! - **Local**: synchronous device-local key/value storage ([`LocalStorage`])
//! - **Remote**: an asynchronous per-user document store ([`UserDataStore`])
//!
//! The host picks one variant per session. Local writes never fail
//! observably; remote writes are best-effort and only logged on failure.

mod local;
mod remote;

pub use local::{FileLocalStorage, MemoryLocalStorage};
pub use remote::{FileUserDataStore, MemoryUserDataStore};

use crate::BackendError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Boxed future returned by [`UserDataStore`] methods
pub type UserDataFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Synchronous device-local key/value storage
pub trait LocalStorage: Send + Sync {
    /// Read the value stored under `key`, if any
    fn get_item(&self, key: &str) -> std::io::Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value
    fn set_item(&self, key: &str, value: &[u8]) -> std::io::Result<()>;
}

/// Asynchronous per-user document storage
///
/// The store is already scoped to the authenticated user. A missing document
/// must be reported as [`BackendError::NotFound`] so callers can tell it apart
/// from a failed request.
pub trait UserDataStore: Send + Sync {
    fn get_user_data<'a>(&'a self, file: &'a str) -> UserDataFuture<'a, Result<Vec<u8>, BackendError>>;

    fn store_user_data<'a>(
        &'a self,
        file: &'a str,
        contents: &'a [u8],
    ) -> UserDataFuture<'a, Result<(), BackendError>>;
}

/// Local storage bound to the preset document key
#[derive(Clone)]
pub struct LocalBackend {
    storage: Arc<dyn LocalStorage>,
    key: String,
}

impl LocalBackend {
    pub fn new(storage: Arc<dyn LocalStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the stored document; storage failures read as absent
    pub fn get(&self) -> Option<Vec<u8>> {
        match self.storage.get_item(&self.key) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!("Failed to read local item {}: {}", self.key, e);
                None
            }
        }
    }

    /// Write the document; storage failures are logged and dropped
    pub fn put(&self, contents: &[u8]) {
        match self.storage.set_item(&self.key, contents) {
            Ok(()) => tracing::debug!("Stored {} bytes under {}", contents.len(), self.key),
            Err(e) => tracing::warn!("Failed to write local item {}: {}", self.key, e),
        }
    }
}

/// Per-user remote storage bound to the preset document file
#[derive(Clone)]
pub struct RemoteBackend {
    store: Arc<dyn UserDataStore>,
    file: String,
    /// Local storage read once when migrating a new user's presets
    migration_source: LocalBackend,
    new_user_session: bool,
}

impl RemoteBackend {
    pub fn new(
        store: Arc<dyn UserDataStore>,
        file: impl Into<String>,
        migration_source: LocalBackend,
    ) -> Self {
        Self {
            store,
            file: file.into(),
            migration_source,
            new_user_session: false,
        }
    }

    /// Mark this session as the user's first remote-backed session
    pub fn with_new_user_session(mut self, new_user_session: bool) -> Self {
        self.new_user_session = new_user_session;
        self
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn is_new_user_session(&self) -> bool {
        self.new_user_session
    }

    pub fn migration_source(&self) -> &LocalBackend {
        &self.migration_source
    }

    pub async fn get(&self) -> Result<Vec<u8>, BackendError> {
        self.store.get_user_data(&self.file).await
    }

    pub async fn put(&self, contents: &[u8]) -> Result<(), BackendError> {
        self.store.store_user_data(&self.file, contents).await
    }

    /// Start a write without waiting for it
    ///
    /// The write runs on the current tokio runtime. Failures are logged and
    /// not retried. Returns `None` (and drops the write) when called outside
    /// a runtime.
    pub fn spawn_put(&self, contents: Vec<u8>) -> Option<JoinHandle<()>> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::warn!("No async runtime, dropping write of {}", self.file);
                return None;
            }
        };

        let store = Arc::clone(&self.store);
        let file = self.file.clone();
        Some(runtime.spawn(async move {
            match store.store_user_data(&file, &contents).await {
                Ok(()) => tracing::debug!("Stored {} bytes to {}", contents.len(), file),
                Err(e) => tracing::error!("Failed to store {}: {}", file, e),
            }
        }))
    }
}

/// The backend variant selected for a session
#[derive(Clone)]
pub enum StorageBackend {
    Local(LocalBackend),
    Remote(RemoteBackend),
}

impl StorageBackend {
    pub fn is_remote(&self) -> bool {
        matches!(self, StorageBackend::Remote(_))
    }
}

/// Replace characters that are unsafe in file names
pub(crate) fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | ' ' => c,
            _ => '_',
        })
        .collect()
}
