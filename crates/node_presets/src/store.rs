//! The preset store
//!
//! `PresetStore` holds the authoritative in-memory collection for a session.
//! It is populated once by [`PresetStore::load`] and every mutation is
//! followed by a write of the whole document through the session's backend.
//!
//! Indices are positions in a category's current sequence. They shift after
//! deletes and reorders, so callers should re-derive them before each call
//! rather than keeping them around.

use crate::backend::{LocalStorage, RemoteBackend, StorageBackend, UserDataStore};
use crate::{
    codec, normalize_name, Preset, PresetCollection, PresetError, PresetStoreConfig, PresetValues,
    Result,
};
use std::sync::Arc;
use tokio::task::JoinHandle;

pub struct PresetStore {
    presets: PresetCollection,
    backend: StorageBackend,
    /// Remote writes that may still be in flight
    pending_writes: Vec<JoinHandle<()>>,
}

impl PresetStore {
    /// Load the collection from the session's backend
    ///
    /// Never fails: unreadable or missing documents load as an empty
    /// collection and the problem is logged.
    pub async fn load(backend: StorageBackend) -> Self {
        let presets = load_collection(&backend).await;
        tracing::info!(
            "Loaded {} preset categories from {} storage",
            presets.len(),
            if backend.is_remote() { "remote" } else { "local" }
        );

        Self {
            presets,
            backend,
            pending_writes: Vec::new(),
        }
    }

    /// Build the configured backend and load from it
    pub async fn open(
        config: PresetStoreConfig,
        local: Arc<dyn LocalStorage>,
        remote: Arc<dyn UserDataStore>,
    ) -> Self {
        Self::load(config.into_backend(local, remote)).await
    }

    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    /// The whole collection, e.g. for building menus
    pub fn presets(&self) -> &PresetCollection {
        &self.presets
    }

    /// Presets of one category; unknown categories have none
    pub fn list_presets(&self, category: &str) -> &[Preset] {
        self.presets
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Append a preset to a category, creating the category if needed
    ///
    /// Names are trimmed, blank ones become "untitled", and they need not be
    /// unique. Returns the index of the new preset.
    pub fn add_preset(
        &mut self,
        category: &str,
        name: impl Into<String>,
        values: PresetValues,
    ) -> usize {
        let list = self.presets.entry(category.to_string()).or_default();
        list.push(Preset::new(normalize_name(&name.into()), values));
        let index = list.len() - 1;

        self.persist();
        index
    }

    /// Rename a preset; blank names become "untitled"
    pub fn rename_preset(&mut self, category: &str, index: usize, new_name: &str) -> Result<()> {
        self.preset_mut(category, index)?.rename(new_name);
        self.persist();
        Ok(())
    }

    /// Remove a preset; later presets move down one position
    pub fn delete_preset(&mut self, category: &str, index: usize) -> Result<Preset> {
        self.check_index(category, index)?;
        let removed = self
            .presets
            .get_mut(category)
            .map(|list| list.remove(index))
            .ok_or_else(|| out_of_range(category, index, 0))?;

        self.persist();
        Ok(removed)
    }

    /// Move the preset at `from` so that it ends up at `to`
    ///
    /// Presets in between shift by one. Moving to the same position changes
    /// nothing but is still persisted.
    pub fn reorder(&mut self, category: &str, from: usize, to: usize) -> Result<()> {
        self.check_index(category, from)?;
        self.check_index(category, to)?;

        if from != to {
            if let Some(list) = self.presets.get_mut(category) {
                let preset = list.remove(from);
                list.insert(to, preset);
            }
        }

        self.persist();
        Ok(())
    }

    /// Append every category of `foreign` onto this collection
    ///
    /// Existing presets are never replaced, reordered or deduplicated, so
    /// importing the same presets twice stores them twice. Returns the number
    /// of presets added.
    pub fn merge_import(&mut self, foreign: PresetCollection) -> usize {
        let added = self.merge_without_persist(foreign);
        self.persist();
        added
    }

    pub(crate) fn merge_without_persist(&mut self, foreign: PresetCollection) -> usize {
        let mut added = 0;
        for (category, presets) in foreign {
            added += presets.len();
            self.presets.entry(category).or_default().extend(presets);
        }
        added
    }

    /// Copy a preset's values onto `target`, see [`Preset::apply_to`]
    pub fn apply_preset(
        &self,
        category: &str,
        index: usize,
        target: &mut PresetValues,
    ) -> Result<usize> {
        self.check_index(category, index)?;
        Ok(self.list_presets(category)[index].apply_to(target))
    }

    /// Write the whole collection through the active backend
    ///
    /// Local writes complete before this returns. Remote writes are started
    /// in the background; overlapping writes may land in any order and the
    /// last one to land wins. The in-memory collection stays authoritative
    /// either way.
    pub(crate) fn persist(&mut self) {
        match &self.backend {
            StorageBackend::Local(local) => match codec::encode(&self.presets) {
                Ok(bytes) => local.put(&bytes),
                Err(e) => tracing::error!("Failed to encode presets: {}", e),
            },
            StorageBackend::Remote(remote) => match codec::encode_pretty(&self.presets) {
                Ok(bytes) => {
                    self.pending_writes.retain(|handle| !handle.is_finished());
                    if let Some(handle) = remote.spawn_put(bytes) {
                        self.pending_writes.push(handle);
                    }
                }
                Err(e) => tracing::error!("Failed to encode presets: {}", e),
            },
        }
    }

    /// Wait for all remote writes started so far
    pub async fn flush(&mut self) {
        for handle in self.pending_writes.drain(..) {
            if let Err(e) = handle.await {
                tracing::error!("Preset write task failed: {}", e);
            }
        }
    }

    /// Number of remote writes not yet known to be finished
    pub fn pending_writes(&self) -> usize {
        self.pending_writes
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    fn check_index(&self, category: &str, index: usize) -> Result<()> {
        let len = self.list_presets(category).len();
        if index < len {
            Ok(())
        } else {
            Err(out_of_range(category, index, len))
        }
    }

    fn preset_mut(&mut self, category: &str, index: usize) -> Result<&mut Preset> {
        let len = self.list_presets(category).len();
        self.presets
            .get_mut(category)
            .and_then(|list| list.get_mut(index))
            .ok_or_else(|| out_of_range(category, index, len))
    }
}

fn out_of_range(category: &str, index: usize, len: usize) -> PresetError {
    PresetError::IndexOutOfRange {
        category: category.to_string(),
        index,
        len,
    }
}

async fn load_collection(backend: &StorageBackend) -> PresetCollection {
    match backend {
        StorageBackend::Local(local) => match local.get() {
            Some(bytes) => decode_or_empty(&bytes, local.key()),
            None => PresetCollection::new(),
        },
        StorageBackend::Remote(remote) if remote.is_new_user_session() => {
            migrate_local_presets(remote).await
        }
        StorageBackend::Remote(remote) => match remote.get().await {
            Ok(bytes) => decode_or_empty(&bytes, remote.file()),
            Err(e) if e.is_not_found() => {
                tracing::debug!("No preset document at {}, starting empty", remote.file());
                PresetCollection::new()
            }
            Err(e) => {
                tracing::error!("Failed to load presets from {}: {}", remote.file(), e);
                PresetCollection::new()
            }
        },
    }
}

/// Copy a new user's local presets into the remote store
///
/// Runs only in a session flagged as new, and only when the remote store has
/// no document yet. Local storage is read but left as it was.
async fn migrate_local_presets(remote: &RemoteBackend) -> PresetCollection {
    match remote.get().await {
        Ok(bytes) => {
            tracing::info!("{} already exists, skipping preset migration", remote.file());
            return decode_or_empty(&bytes, remote.file());
        }
        Err(e) if e.is_not_found() => {}
        Err(e) => tracing::warn!("Could not check {} before migration: {}", remote.file(), e),
    }

    let source = remote.migration_source();
    let Some(local_bytes) = source.get() else {
        return PresetCollection::new();
    };

    let presets = match codec::decode(&local_bytes) {
        Ok(presets) => presets,
        Err(e) => {
            tracing::warn!("Not migrating unreadable local presets from {}: {}", source.key(), e);
            return PresetCollection::new();
        }
    };

    let written = match codec::encode_pretty(&presets) {
        Ok(bytes) => remote.put(&bytes).await.map_err(PresetError::from),
        Err(e) => Err(e),
    };
    match written {
        Ok(()) => tracing::info!(
            "Migrated {} preset categories from {} to {}",
            presets.len(),
            source.key(),
            remote.file()
        ),
        Err(e) => tracing::error!("Failed to migrate presets to {}: {}", remote.file(), e),
    }

    presets
}

fn decode_or_empty(bytes: &[u8], source: &str) -> PresetCollection {
    match codec::decode(bytes) {
        Ok(presets) => presets,
        Err(e) => {
            tracing::error!("Ignoring unreadable preset document {}: {}", source, e);
            PresetCollection::new()
        }
    }
}
