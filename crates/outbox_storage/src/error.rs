//! Backend errors.

use std::io;
use thiserror::Error;

/// Result alias for backend calls.
pub type StorageResult<T> = Result<T, StorageError>;

/// Why a backend call failed.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The operating system refused the call.
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),

    /// A read asked for bytes that were never written.
    #[error("read of {len} bytes at offset {offset} runs past the {size} bytes stored")]
    ReadPastEnd {
        /// Start of the read.
        offset: u64,
        /// Bytes requested.
        len: usize,
        /// Bytes stored.
        size: u64,
    },

    /// A truncation asked to grow the store.
    #[error("cannot truncate to {requested} bytes, only {size} stored")]
    TruncatePastEnd {
        /// Length asked for.
        requested: u64,
        /// Bytes stored.
        size: u64,
    },

    /// The store was closed and refuses every call.
    #[error("storage is closed")]
    Closed,
}
