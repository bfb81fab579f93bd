//! Node presets - named snapshots of node settings
//!
//! This crate keeps per-node-type presets in memory, persists them to local
//! device storage or a per-user remote store (migrating local presets on a
//! user's first remote session), and imports/exports preset documents.

mod error;
mod preset;
mod config;
mod store;
pub mod codec;
pub mod backend;
pub mod transfer;

pub use error::*;
pub use preset::*;
pub use config::*;
pub use store::*;

pub use backend::{
    FileLocalStorage, FileUserDataStore, LocalStorage, MemoryLocalStorage, MemoryUserDataStore,
    StorageBackend, UserDataStore,
};
pub use transfer::{ExportFile, ImportSummary, SkippedFile, EXPORT_ALL_FILE_NAME};
