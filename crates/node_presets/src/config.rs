//! Preset store configuration
//!
//! The host decides once per session where presets live and whether this is
//! the user's first remote-backed session.

use crate::backend::{LocalBackend, LocalStorage, RemoteBackend, StorageBackend, UserDataStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Key of the preset document in local storage
pub const LOCAL_STORAGE_KEY: &str = "NodePresets";

/// File name of the preset document in the per-user store
pub const USER_DATA_FILE: &str = "node.presets.json";

/// Where the preset document is persisted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageLocation {
    #[default]
    Local,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresetStoreConfig {
    #[serde(default)]
    pub storage_location: StorageLocation,
    /// First session for this user on the remote store; triggers migration
    #[serde(default)]
    pub new_user_session: bool,
    #[serde(default = "default_local_key")]
    pub local_key: String,
    #[serde(default = "default_user_data_file")]
    pub user_data_file: String,
}

fn default_local_key() -> String {
    LOCAL_STORAGE_KEY.to_string()
}

fn default_user_data_file() -> String {
    USER_DATA_FILE.to_string()
}

impl Default for PresetStoreConfig {
    fn default() -> Self {
        Self {
            storage_location: StorageLocation::default(),
            new_user_session: false,
            local_key: default_local_key(),
            user_data_file: default_user_data_file(),
        }
    }
}

impl PresetStoreConfig {
    /// Config for a session persisting to the per-user remote store
    pub fn remote() -> Self {
        Self {
            storage_location: StorageLocation::Remote,
            ..Default::default()
        }
    }

    pub fn with_new_user_session(mut self, new_user_session: bool) -> Self {
        self.new_user_session = new_user_session;
        self
    }

    pub fn with_local_key(mut self, key: impl Into<String>) -> Self {
        self.local_key = key.into();
        self
    }

    pub fn with_user_data_file(mut self, file: impl Into<String>) -> Self {
        self.user_data_file = file.into();
        self
    }

    /// Build the backend selected by this config
    ///
    /// Local storage is always needed: it is the backend itself for local
    /// sessions and the migration source for remote ones.
    pub fn into_backend(
        self,
        local: Arc<dyn LocalStorage>,
        remote: Arc<dyn UserDataStore>,
    ) -> StorageBackend {
        let local = LocalBackend::new(local, self.local_key);
        match self.storage_location {
            StorageLocation::Local => StorageBackend::Local(local),
            StorageLocation::Remote => StorageBackend::Remote(
                RemoteBackend::new(remote, self.user_data_file, local)
                    .with_new_user_session(self.new_user_session),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryLocalStorage, MemoryUserDataStore};

    #[test]
    fn test_defaults() {
        let config = PresetStoreConfig::default();
        assert_eq!(config.storage_location, StorageLocation::Local);
        assert!(!config.new_user_session);
        assert_eq!(config.local_key, LOCAL_STORAGE_KEY);
        assert_eq!(config.user_data_file, USER_DATA_FILE);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: PresetStoreConfig =
            serde_json::from_str(r#"{"storage_location":"remote","new_user_session":true}"#).unwrap();
        assert_eq!(config, PresetStoreConfig::remote().with_new_user_session(true));
    }

    #[test]
    fn test_into_backend_local() {
        let backend = PresetStoreConfig::default()
            .with_local_key("custom")
            .into_backend(Arc::new(MemoryLocalStorage::new()), Arc::new(MemoryUserDataStore::new()));

        match backend {
            StorageBackend::Local(local) => assert_eq!(local.key(), "custom"),
            StorageBackend::Remote(_) => panic!("Expected local backend"),
        }
    }

    #[test]
    fn test_into_backend_remote() {
        let backend = PresetStoreConfig::remote()
            .with_new_user_session(true)
            .with_user_data_file("presets.json")
            .into_backend(Arc::new(MemoryLocalStorage::new()), Arc::new(MemoryUserDataStore::new()));

        match backend {
            StorageBackend::Remote(remote) => {
                assert_eq!(remote.file(), "presets.json");
                assert!(remote.is_new_user_session());
                assert_eq!(remote.migration_source().key(), LOCAL_STORAGE_KEY);
            }
            StorageBackend::Local(_) => panic!("Expected remote backend"),
        }
    }
}
