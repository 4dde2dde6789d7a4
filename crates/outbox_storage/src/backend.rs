//! The byte-store seam under every log.

use crate::error::StorageResult;

/// A growable run of bytes holding one log.
///
/// Offsets returned by [`append`](Self::append) stay valid until the next
/// [`truncate`](Self::truncate) or [`replace`](Self::replace). After
/// [`sync`](Self::sync) returns, everything appended so far survives a
/// crash. `replace` is all or nothing: after a crash the old contents or
/// the new ones are there, never a mix.
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns `ReadPastEnd` if the range is not fully stored.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends `data` and returns the offset it starts at.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the write fails.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Hands buffered writes to the operating system.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the flush fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Returns the number of bytes stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unusable.
    fn size(&self) -> StorageResult<u64>;

    /// Makes every appended byte durable.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the sync fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Shrinks the store to `new_size` bytes.
    ///
    /// Recovery uses this to cut a torn frame off the tail.
    ///
    /// # Errors
    ///
    /// Returns `TruncatePastEnd` if `new_size` exceeds the current size.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;

    /// Swaps the whole contents for `data` in one step.
    ///
    /// Compaction and corruption recovery rewrite logs through this.
    ///
    /// # Errors
    ///
    /// Returns an error if the new contents cannot be made durable; the
    /// old contents are then still in place.
    fn replace(&mut self, data: &[u8]) -> StorageResult<()>;
}
