//! Durable bindings from local record ids to authority-assigned ids.

use crate::codec;
use crate::config::StoreConfig;
use crate::error::CoreResult;
use crate::log::KeyedLog;
use crate::types::RecordId;
use outbox_storage::StorageBackend;

/// Maps a record's client-generated id to the id the authority assigned
/// when its CREATE was confirmed.
///
/// Records that were never created locally (imported by a refresh) have
/// no binding; their local id already is the authority's id.
#[derive(Debug)]
pub struct IdMap {
    log: KeyedLog,
}

impl IdMap {
    /// Log name used in diagnostics.
    pub const LOG_NAME: &'static str = "ids.log";

    /// Opens the map over `backend`.
    ///
    /// # Errors
    ///
    /// Returns `LogCorrupt` if the log is damaged, or a storage error.
    pub fn open(backend: Box<dyn StorageBackend>, config: &StoreConfig) -> CoreResult<Self> {
        let log = KeyedLog::open(Self::LOG_NAME, backend, config)?;
        let map = Self { log };
        tracing::debug!(bindings = map.len(), "opened id map");
        Ok(map)
    }

    /// Durably binds `local` to `remote`.
    ///
    /// # Errors
    ///
    /// Returns an error if the binding cannot be written.
    pub fn bind(&mut self, local: &RecordId, remote: &RecordId) -> CoreResult<()> {
        if local == remote {
            return Ok(());
        }
        self.log.put(local.as_str(), codec::encode(remote)?)?;
        tracing::debug!(%local, %remote, "bound remote id");
        Ok(())
    }

    /// Returns the authority id for `local`, or `local` itself if unbound.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the stored binding cannot be decoded.
    pub fn resolve(&self, local: &RecordId) -> CoreResult<RecordId> {
        match self.log.get(local.as_str()) {
            Some(bytes) => codec::decode(bytes),
            None => Ok(local.clone()),
        }
    }

    /// Drops the binding for `local`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal cannot be written.
    pub fn unbind(&mut self, local: &RecordId) -> CoreResult<()> {
        self.log.remove(local.as_str())?;
        Ok(())
    }

    /// Drops every binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the rewrite fails.
    pub fn clear(&mut self) -> CoreResult<()> {
        self.log.reset(Vec::new())
    }

    /// Returns the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.log.len()
    }

    /// Returns true if nothing is bound.
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
