//! CLI error type.

use outbox_core::RemoteError;
use outbox_sync_engine::SyncError;
use thiserror::Error;

/// Why a command failed.
#[derive(Debug, Error)]
pub enum CliError {
    /// Local store or sync failure.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The HTTP client could not be set up.
    #[error("remote: {0}")]
    Remote(#[from] RemoteError),

    /// Writing output failed.
    #[error("output: {0}")]
    Io(#[from] std::io::Error),

    /// The failure was already shown to the user.
    #[error("command failed")]
    Reported,
}
