//! The client context object.
//!
//! A [`Client`] is constructed once at startup and owns everything one
//! client instance needs: the Record Store, the Sync Engine (with the
//! Pending Mutation Log and id map) and a shared Connectivity Monitor.
//! Every user-facing operation goes through it.

use crate::connectivity::{ConnectivityMonitor, ConnectivityProbe, Transition};
use crate::engine::{Delivery, DrainReport, SyncEngine};
use crate::error::{SyncError, SyncResult};
use outbox_core::{
    Corruption, LocalStores, Mutation, NewRecord, Record, RecordId, RecordPatch, RecordStore,
    RemoteAuthority, StoreConfig, StoreDir,
};
use parking_lot::Mutex;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A condition the client is running under despite a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Degraded {
    /// The pending log was damaged; only its valid prefix was kept.
    LogCorrupt(Corruption),
}

impl fmt::Display for Degraded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degraded::LogCorrupt(c) => {
                write!(
                    f,
                    "{} was damaged at offset {} ({}); kept {} pending mutations",
                    c.log, c.offset, c.reason, c.recovered_entries
                )?;
                if let Some(path) = &c.quarantined {
                    write!(f, ", damaged copy at {}", path.display())?;
                }
                Ok(())
            }
        }
    }
}

/// How a mutating operation reached the remote authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// The authority confirmed the change.
    Synced,
    /// The change is saved locally and will sync later.
    SavedLocally,
    /// The authority no longer has the record; the change stays local.
    Discarded,
}

impl Notice {
    /// Returns the text shown to the user.
    pub fn message(&self) -> &'static str {
        match self {
            Notice::Synced => "saved",
            Notice::SavedLocally => "saved locally, will sync later",
            Notice::Discarded => "record no longer exists on the server; change kept locally",
        }
    }
}

impl From<&Delivery> for Notice {
    fn from(delivery: &Delivery) -> Self {
        match delivery {
            Delivery::Applied => Notice::Synced,
            Delivery::Queued { .. } => Notice::SavedLocally,
            Delivery::Discarded { .. } => Notice::Discarded,
        }
    }
}

/// Result of a mutating operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<T> {
    /// The operation's value.
    pub value: T,
    /// How the change reached the authority.
    pub notice: Notice,
}

/// One client instance.
///
/// Mutating operations are serialized: each commits to the Record Store and
/// then hands its mutation to the engine while holding the store.
pub struct Client<R: RemoteAuthority> {
    records: Mutex<RecordStore>,
    engine: Arc<SyncEngine<R>>,
    warnings: Vec<Degraded>,
    _dir: Option<StoreDir>,
}

impl<R: RemoteAuthority> Client<R> {
    /// Opens a client whose stores live in directory `path`.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the directory is locked or unusable,
    /// and `LogCorrupt` if the record store or id map is damaged. A damaged
    /// pending log is not an error; see [`Client::warnings`].
    pub fn open(
        path: &Path,
        config: &StoreConfig,
        remote: R,
        monitor: Arc<ConnectivityMonitor>,
    ) -> SyncResult<Self> {
        let stores = LocalStores::open(path, config)?;
        Ok(Self::from_stores(stores, remote, monitor))
    }

    /// Opens a client with empty in-memory stores.
    ///
    /// # Errors
    ///
    /// Returns an error only if the in-memory stores cannot be opened.
    pub fn in_memory(remote: R, monitor: Arc<ConnectivityMonitor>) -> SyncResult<Self> {
        let stores = LocalStores::in_memory(&StoreConfig::default())?;
        Ok(Self::from_stores(stores, remote, monitor))
    }

    /// Builds a client from already opened stores.
    pub fn from_stores(stores: LocalStores, remote: R, monitor: Arc<ConnectivityMonitor>) -> Self {
        let LocalStores {
            records,
            pending,
            ids,
            recovery,
            dir,
        } = stores;

        let warnings: Vec<Degraded> = recovery.into_iter().map(Degraded::LogCorrupt).collect();
        for warning in &warnings {
            tracing::warn!(%warning, "running degraded");
        }

        Self {
            records: Mutex::new(records),
            engine: Arc::new(SyncEngine::new(remote, monitor, pending, ids)),
            warnings,
            _dir: dir,
        }
    }

    /// Returns the sync engine.
    pub fn engine(&self) -> &Arc<SyncEngine<R>> {
        &self.engine
    }

    /// Returns the connectivity monitor.
    pub fn monitor(&self) -> &Arc<ConnectivityMonitor> {
        self.engine.monitor()
    }

    /// Returns the conditions this client is running degraded under.
    pub fn warnings(&self) -> &[Degraded] {
        &self.warnings
    }

    /// Creates a record with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if a field is empty (nothing is written), or
    /// `StoreUnavailable` if the record or its mutation cannot be stored.
    pub fn add_record(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> SyncResult<Outcome<Record>> {
        let fields = NewRecord::new(name, email, password);
        if let Some(field) = fields.missing_field() {
            return Err(SyncError::missing_field(field));
        }

        let record = Record::new(RecordId::generate(), fields);
        let mut records = self.records.lock();
        records.put(&record)?;
        tracing::debug!(id = %record.id, "added record");

        let delivery = self.engine.apply_or_queue(Mutation::create(record.clone()))?;
        Ok(Outcome {
            notice: Notice::from(&delivery),
            value: record,
        })
    }

    /// Renames a record.
    ///
    /// # Errors
    ///
    /// See [`Client::update_record`].
    pub fn edit_record(&self, id: &RecordId, new_name: &str) -> SyncResult<Outcome<Record>> {
        self.update_record(id, &RecordPatch::name(new_name))
    }

    /// Merges `patch` into a record.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an empty patch or a blank field, `NotFound`
    /// if there is no such record, or `StoreUnavailable`.
    pub fn update_record(&self, id: &RecordId, patch: &RecordPatch) -> SyncResult<Outcome<Record>> {
        if patch.is_empty() {
            return Err(SyncError::validation("nothing to update"));
        }
        if let Some(field) = patch.blank_field() {
            return Err(SyncError::missing_field(field));
        }

        let mut records = self.records.lock();
        let mut record = records.get(id)?;
        record.apply(patch);
        records.put(&record)?;
        tracing::debug!(%id, "updated record");

        let delivery = self
            .engine
            .apply_or_queue(Mutation::update(id.clone(), patch.clone()))?;
        Ok(Outcome {
            notice: Notice::from(&delivery),
            value: record,
        })
    }

    /// Deletes a record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such record (nothing is queued),
    /// or `StoreUnavailable`.
    pub fn delete_record(&self, id: &RecordId) -> SyncResult<Outcome<()>> {
        let mut records = self.records.lock();
        records.delete(id)?;
        tracing::debug!(%id, "deleted record");

        let delivery = self.engine.apply_or_queue(Mutation::delete(id.clone()))?;
        Ok(Outcome {
            notice: Notice::from(&delivery),
            value: (),
        })
    }

    /// Returns every local record.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if a record cannot be decoded.
    pub fn list_records(&self) -> SyncResult<Vec<Record>> {
        Ok(self.records.lock().list_all()?)
    }

    /// Returns one local record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such record.
    pub fn get_record(&self, id: &RecordId) -> SyncResult<Record> {
        Ok(self.records.lock().get(id)?)
    }

    /// Returns the queued mutations in enqueue order.
    pub fn pending(&self) -> Vec<Mutation> {
        self.engine.pending()
    }

    /// Drains the pending log now.
    ///
    /// # Errors
    ///
    /// See [`SyncEngine::drain_all`].
    pub fn sync_now(&self) -> SyncResult<DrainReport> {
        self.engine.drain_all()
    }

    /// Probes connectivity and drains if the client just came online.
    ///
    /// # Errors
    ///
    /// See [`SyncEngine::drain_all`].
    pub fn poll_connectivity(
        &self,
        probe: &dyn ConnectivityProbe,
    ) -> SyncResult<Option<DrainReport>> {
        match self.monitor().poll(probe) {
            Some(Transition::WentOnline) => self.sync_now().map(Some),
            _ => Ok(None),
        }
    }

    /// Replaces the local records with the authority's list.
    ///
    /// Skipped (returning `None`) while mutations are queued, since the
    /// authority does not have them yet.
    ///
    /// # Errors
    ///
    /// Returns `RemoteUnavailable` if offline or the list call fails, or
    /// `StoreUnavailable` if the local rewrite fails.
    pub fn refresh(&self) -> SyncResult<Option<usize>> {
        if !self.monitor().is_online() {
            return Err(SyncError::RemoteUnavailable(
                outbox_core::RemoteError::Unavailable("offline".into()),
            ));
        }

        let mut records = self.records.lock();
        if self.engine.pending_len() > 0 {
            tracing::info!(
                pending = self.engine.pending_len(),
                "mutations queued, not refreshing"
            );
            return Ok(None);
        }

        let remote = self.engine.remote().list()?;
        records.replace_all(&remote)?;
        // Local ids are now the authority's ids.
        self.engine.clear_bindings()?;
        tracing::info!(records = remote.len(), "refreshed from remote");
        Ok(Some(remote.len()))
    }

    /// Compacts every local log.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if a rewrite fails.
    pub fn compact(&self) -> SyncResult<()> {
        self.records
            .lock()
            .compact()
            .map_err(SyncError::StoreUnavailable)?;
        self.engine.compact()
    }
}

impl<R: RemoteAuthority> fmt::Debug for Client<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("engine", &self.engine)
            .field("warnings", &self.warnings)
            .finish()
    }
}
