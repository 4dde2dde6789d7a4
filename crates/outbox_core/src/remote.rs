//! The Remote Authority contract.
//!
//! The authority is the canonical store of records, reachable only while
//! online. The sync engine replays mutations against anything implementing
//! [`RemoteAuthority`]: the HTTP client in the sync engine crate, or an
//! in-process authority in tests.

use crate::types::{NewRecord, Record, RecordId, RecordPatch};
use std::sync::Arc;
use thiserror::Error;

/// Result type for remote authority calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors returned by a remote authority.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The authority could not be reached.
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete within its timeout.
    #[error("remote call timed out")]
    Timeout,

    /// The target record does not exist on the authority.
    #[error("record {id} not found on remote")]
    NotFound {
        /// The id that was asked for.
        id: RecordId,
    },

    /// The authority answered with an error status.
    #[error("remote rejected request ({status}): {message}")]
    Rejected {
        /// HTTP status code, or 0 if not HTTP.
        status: u16,
        /// Error body or reason.
        message: String,
    },

    /// The authority answered with something that isn't the contract.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl RemoteError {
    /// Returns true if the same call may succeed later.
    ///
    /// `NotFound` is definitive: replaying the call can never succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::Timeout => true,
            Self::Rejected { status, .. } => *status >= 500 || *status == 429,
            Self::NotFound { .. } | Self::Protocol(_) => false,
        }
    }

    /// Returns true if the record is gone on the authority.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// The REST-style CRUD surface of the canonical store.
///
/// | Operation | Request             | Success                    |
/// |-----------|---------------------|----------------------------|
/// | list      | `GET /users`        | 200, array of records      |
/// | create    | `POST /users`       | 201, record with new id    |
/// | update    | `PUT /users/{id}`   | 200, merged record         |
/// | delete    | `DELETE /users/{id}`| 204                        |
///
/// Update and delete of an unknown id fail with [`RemoteError::NotFound`].
pub trait RemoteAuthority: Send + Sync {
    /// Lists every record.
    fn list(&self) -> RemoteResult<Vec<Record>>;

    /// Creates a record; the authority assigns its id.
    fn create(&self, fields: &NewRecord) -> RemoteResult<Record>;

    /// Merges `patch` into the record with `id`.
    fn update(&self, id: &RecordId, patch: &RecordPatch) -> RemoteResult<Record>;

    /// Deletes the record with `id`.
    fn delete(&self, id: &RecordId) -> RemoteResult<()>;
}

impl<T: RemoteAuthority + ?Sized> RemoteAuthority for Arc<T> {
    fn list(&self) -> RemoteResult<Vec<Record>> {
        (**self).list()
    }

    fn create(&self, fields: &NewRecord) -> RemoteResult<Record> {
        (**self).create(fields)
    }

    fn update(&self, id: &RecordId, patch: &RecordPatch) -> RemoteResult<Record> {
        (**self).update(id, patch)
    }

    fn delete(&self, id: &RecordId) -> RemoteResult<()> {
        (**self).delete(id)
    }
}

impl<T: RemoteAuthority + ?Sized> RemoteAuthority for Box<T> {
    fn list(&self) -> RemoteResult<Vec<Record>> {
        (**self).list()
    }

    fn create(&self, fields: &NewRecord) -> RemoteResult<Record> {
        (**self).create(fields)
    }

    fn update(&self, id: &RecordId, patch: &RecordPatch) -> RemoteResult<Record> {
        (**self).update(id, patch)
    }

    fn delete(&self, id: &RecordId) -> RemoteResult<()> {
        (**self).delete(id)
    }
}
