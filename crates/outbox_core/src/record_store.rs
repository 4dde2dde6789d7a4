//! The Record Store: durable current view of each record.

use crate::codec;
use crate::config::StoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::log::KeyedLog;
use crate::types::{Record, RecordId};
use outbox_storage::StorageBackend;

/// Durable keyed storage of the current, possibly offline-edited, records.
///
/// Every write is durable on return. Listing order is by id, which is
/// stable for the life of the process.
#[derive(Debug)]
pub struct RecordStore {
    log: KeyedLog,
}

impl RecordStore {
    /// Log name used in diagnostics.
    pub const LOG_NAME: &'static str = "records.log";

    /// Opens the store over `backend`.
    ///
    /// # Errors
    ///
    /// Returns `LogCorrupt` if the log is damaged, or a storage error.
    pub fn open(backend: Box<dyn StorageBackend>, config: &StoreConfig) -> CoreResult<Self> {
        let log = KeyedLog::open(Self::LOG_NAME, backend, config)?;
        // Decode everything once so a bad value fails the open, not a later read.
        for (key, value) in log.iter() {
            codec::decode::<Record>(value).map_err(|e| CoreError::LogCorrupt {
                log: Self::LOG_NAME.to_string(),
                offset: 0,
                reason: format!("record {key} does not decode: {e}"),
            })?;
        }
        tracing::debug!(records = log.len(), "opened record store");
        Ok(Self { log })
    }

    /// Inserts or replaces `record`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; the store is then unchanged.
    pub fn put(&mut self, record: &Record) -> CoreResult<()> {
        self.log.put(record.id.as_str(), codec::encode(record)?)?;
        tracing::debug!(id = %record.id, "stored record");
        Ok(())
    }

    /// Returns the record with `id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such record.
    pub fn get(&self, id: &RecordId) -> CoreResult<Record> {
        let bytes = self
            .log
            .get(id.as_str())
            .ok_or_else(|| CoreError::not_found(id.as_str()))?;
        codec::decode(bytes)
    }

    /// Returns true if a record with `id` exists.
    #[must_use]
    pub fn contains(&self, id: &RecordId) -> bool {
        self.log.contains(id.as_str())
    }

    /// Deletes the record with `id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such record, or a storage error.
    pub fn delete(&mut self, id: &RecordId) -> CoreResult<()> {
        if !self.log.remove(id.as_str())? {
            return Err(CoreError::not_found(id.as_str()));
        }
        tracing::debug!(%id, "deleted record");
        Ok(())
    }

    /// Returns every record.
    ///
    /// # Errors
    ///
    /// Returns a codec error if a stored record cannot be decoded.
    pub fn list_all(&self) -> CoreResult<Vec<Record>> {
        self.log.iter().map(|(_, v)| codec::decode(v)).collect()
    }

    /// Replaces the whole store with `records` in one atomic rewrite.
    ///
    /// # Errors
    ///
    /// Returns an error if the rewrite fails; the old records then remain.
    pub fn replace_all(&mut self, records: &[Record]) -> CoreResult<()> {
        let entries = records
            .iter()
            .map(|r| Ok((r.id.as_str().to_string(), codec::encode(r)?)))
            .collect::<CoreResult<Vec<_>>>()?;
        self.log.reset(entries)?;
        tracing::debug!(records = self.log.len(), "replaced record store");
        Ok(())
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.log.len()
    }

    /// Returns true if there are no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Compacts the underlying log.
    ///
    /// # Errors
    ///
    /// Returns an error if the rewrite fails.
    pub fn compact(&mut self) -> CoreResult<()> {
        self.log.compact()
    }
}
