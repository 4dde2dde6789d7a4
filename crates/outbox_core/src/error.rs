//! Error types for outbox core.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in local store operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] outbox_storage::StorageError),

    /// I/O error outside a storage backend (directory, lock file).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A value could not be encoded or decoded.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the failure.
        message: String,
    },

    /// A log contains a frame that is neither valid nor a torn tail.
    #[error("{log} is corrupt at offset {offset}: {reason}")]
    LogCorrupt {
        /// Name of the damaged log.
        log: String,
        /// Offset of the first bad frame.
        offset: u64,
        /// What was wrong with it.
        reason: String,
    },

    /// The requested key does not exist.
    #[error("not found: {key}")]
    NotFound {
        /// The missing key.
        key: String,
    },

    /// Another process holds the store directory.
    #[error("store directory locked by another process: {}", path.display())]
    DirectoryLocked {
        /// The locked directory.
        path: PathBuf,
    },

    /// The store directory is missing or is not a directory.
    #[error("invalid store directory: {message}")]
    InvalidDirectory {
        /// Description of the problem.
        message: String,
    },

    /// An argument cannot be represented in the log format.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },
}

impl CoreError {
    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Creates a not-found error for the given key.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Returns true if this error means a key was missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if this error means local storage could not be used.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Io(_) | Self::DirectoryLocked { .. } | Self::InvalidDirectory { .. }
        )
    }
}
