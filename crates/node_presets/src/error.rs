//! Error types for preset storage and transfer

use thiserror::Error;

/// Failures reported by a storage backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// The requested document does not exist yet
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Any other non-success status from the remote store
    #[error("Remote store returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackendError {
    /// Whether this error means "no existing document" rather than a failure
    pub fn is_not_found(&self) -> bool {
        match self {
            BackendError::NotFound(_) => true,
            BackendError::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            BackendError::Status { .. } => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum PresetError {
    /// The input was not a valid preset document
    #[error("Malformed preset document: {0}")]
    MalformedDocument(#[from] serde_json::Error),

    #[error("Storage backend error: {0}")]
    Backend(#[from] BackendError),

    /// Export requested while there are no presets at all
    #[error("No presets to export")]
    EmptyExport,

    #[error("Preset index {index} out of range for '{category}' ({len} presets)")]
    IndexOutOfRange {
        category: String,
        index: usize,
        len: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PresetError>;
