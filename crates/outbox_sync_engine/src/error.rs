//! Error types for the sync engine.

use outbox_core::{CoreError, RecordId, RemoteError};
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors reported to callers of client and engine operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Input was rejected before any store write.
    #[error("validation failed: {message}")]
    Validation {
        /// What was wrong.
        message: String,
    },

    /// The operation targets a record that does not exist.
    #[error("record {id} not found")]
    NotFound {
        /// The missing record id.
        id: RecordId,
    },

    /// Local durable storage failed.
    #[error("local store unavailable: {0}")]
    StoreUnavailable(#[source] CoreError),

    /// The remote authority could not be used.
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(#[from] RemoteError),

    /// A local log is unreadable.
    #[error("log corrupt: {message}")]
    LogCorrupt {
        /// Description of the damage.
        message: String,
    },
}

impl SyncError {
    /// Creates a validation error for a missing or blank required field.
    pub fn missing_field(field: &str) -> Self {
        Self::Validation {
            message: format!("missing required field: {field}"),
        }
    }

    /// Creates a validation error with a free-form message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Returns true for input errors the caller can fix.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Returns true if the target record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<CoreError> for SyncError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { key } => Self::NotFound {
                id: RecordId::new(key),
            },
            CoreError::LogCorrupt { .. } => Self::LogCorrupt {
                message: err.to_string(),
            },
            other => Self::StoreUnavailable(other),
        }
    }
}
