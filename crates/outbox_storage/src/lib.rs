//! # Outbox Storage
//!
//! Where the outbox logs keep their bytes.
//!
//! A [`StorageBackend`] appends, reads back, truncates and atomically
//! replaces a run of bytes. Framing, checksums and the meaning of what is
//! stored all belong to `outbox_core`; a backend never looks inside.
//!
//! - [`FileBackend`] keeps one log in one file and is what clients use.
//! - [`InMemoryBackend`] keeps the bytes in shared memory for tests and
//!   throwaway clients. It can be closed to simulate a failing disk.
//!
//! ```rust
//! use outbox_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut log = InMemoryBackend::new();
//! let at = log.append(b"frame").unwrap();
//! assert_eq!(log.read_at(at, 5).unwrap(), b"frame");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
