// Error types shared by every storage backend
use crate::key::ObjectKey;
use std::io;
use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors surfaced at the storage boundary
///
/// These are the only kinds callers above the backend need to branch on.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be configured; the instance is unusable
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A key failed validation at construction time
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    /// No object is stored under the key
    #[error("key not found: {0}")]
    KeyNotFound(ObjectKey),

    /// The requested byte range does not fit the stored object
    #[error("invalid range [{start}, {end}) for object of {size} bytes")]
    InvalidRange { start: u64, end: u64, size: u64 },

    /// The drained upload length differs from what the caller announced
    #[error("length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: u64, actual: u64 },

    /// A byte-stream primitive was called with arguments that do not fit
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A result would not fit into a single buffer
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Lower-level I/O failure, passed through untouched
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StorageError {
    /// Whether this error means the object simply is not there
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::KeyNotFound(_))
    }
}
