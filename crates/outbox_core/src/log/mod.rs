//! Framed append-only keyed log.
//!
//! Every local store is a sequence of frames over a [`StorageBackend`]:
//!
//! ```text
//! | magic (4) | version (2) | kind (1) | key_len (2) | value_len (4) | key | value | crc32 (4) |
//! ```
//!
//! All integers are little-endian. The CRC covers everything before it.
//! A `put` frame sets a key, a `remove` frame (empty value) deletes it.
//! Opening a log replays all frames into an in-memory index; the last
//! frame for a key wins.
//!
//! [`StorageBackend`]: outbox_storage::StorageBackend

mod frame;
mod keyed;

pub use frame::compute_crc32;
pub use keyed::{Corruption, KeyedLog};
