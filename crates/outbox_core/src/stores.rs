//! Opening the three local stores together.

use crate::config::StoreConfig;
use crate::dir::StoreDir;
use crate::error::CoreResult;
use crate::id_map::IdMap;
use crate::log::Corruption;
use crate::mutation_log::MutationLog;
use crate::record_store::RecordStore;
use outbox_storage::{FileBackend, InMemoryBackend, StorageBackend};
use std::path::Path;

/// The Record Store, Pending Mutation Log and id map of one client.
///
/// Holding a `LocalStores` opened from disk holds the directory lock.
#[derive(Debug)]
pub struct LocalStores {
    /// Current view of each record.
    pub records: RecordStore,
    /// Mutations awaiting the remote authority.
    pub pending: MutationLog,
    /// Local to remote id bindings.
    pub ids: IdMap,
    /// Damage recovered from while opening the pending log.
    pub recovery: Option<Corruption>,
    /// The locked directory, if opened from disk. Dropping it releases the lock.
    pub dir: Option<StoreDir>,
}

impl LocalStores {
    /// Opens the stores in directory `path`.
    ///
    /// A damaged pending log is copied aside (see [`StoreDir::quarantine`])
    /// and reopened with its valid prefix; damage to the record store or
    /// id map fails the open.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory is locked or unusable, a log
    /// cannot be opened, or the record store or id map is corrupt.
    pub fn open(path: &Path, config: &StoreConfig) -> CoreResult<Self> {
        let dir = StoreDir::open(path, config.create_if_missing)?;

        let records = RecordStore::open(
            Box::new(FileBackend::open(&dir.records_path())?),
            config,
        )?;
        let ids = IdMap::open(Box::new(FileBackend::open(&dir.ids_path())?), config)?;

        let pending_path = dir.pending_path();
        // Copy the file aside before the lenient open rewrites it.
        let quarantined = if needs_recovery(&pending_path, config)? {
            Some(dir.quarantine(&pending_path)?)
        } else {
            None
        };
        let (pending, mut recovery) =
            MutationLog::open(Box::new(FileBackend::open(&pending_path)?), config)?;
        if let Some(corruption) = recovery.as_mut() {
            corruption.quarantined = quarantined;
        }

        tracing::info!(
            path = %dir.path().display(),
            records = records.len(),
            pending = pending.len(),
            degraded = recovery.is_some(),
            "opened local stores"
        );

        Ok(Self {
            records,
            pending,
            ids,
            recovery,
            dir: Some(dir),
        })
    }

    /// Opens empty stores held in memory.
    ///
    /// # Errors
    ///
    /// Never fails for fresh backends; the signature matches [`Self::open`].
    pub fn in_memory(config: &StoreConfig) -> CoreResult<Self> {
        Self::with_backends(
            Box::new(InMemoryBackend::new()),
            Box::new(InMemoryBackend::new()),
            Box::new(InMemoryBackend::new()),
            config,
        )
    }

    /// Opens the stores over caller-supplied backends.
    ///
    /// # Errors
    ///
    /// Returns an error if any store cannot be opened.
    pub fn with_backends(
        records: Box<dyn StorageBackend>,
        pending: Box<dyn StorageBackend>,
        ids: Box<dyn StorageBackend>,
        config: &StoreConfig,
    ) -> CoreResult<Self> {
        let records = RecordStore::open(records, config)?;
        let ids = IdMap::open(ids, config)?;
        let (pending, recovery) = MutationLog::open(pending, config)?;
        Ok(Self {
            records,
            pending,
            ids,
            recovery,
            dir: None,
        })
    }
}

/// Returns true if the pending log at `path` would lose data on a lenient open.
fn needs_recovery(path: &Path, config: &StoreConfig) -> CoreResult<bool> {
    if !path.exists() {
        return Ok(false);
    }
    let scratch = InMemoryBackend::with_data(std::fs::read(path)?);
    let (_, corruption) = MutationLog::open(Box::new(scratch), config)?;
    Ok(corruption.is_some())
}
