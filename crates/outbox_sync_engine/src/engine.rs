//! The sync engine: immediate delivery with queue fallback, and draining.

use crate::connectivity::ConnectivityMonitor;
use crate::error::{SyncError, SyncResult};
use outbox_core::{
    CoreError, IdMap, Method, Mutation, MutationLog, Payload, RecordId, RemoteAuthority,
    RemoteError,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The current state of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No drain is running.
    Idle,
    /// A drain pass is running.
    Draining,
    /// The last pass stopped on a local store failure.
    Error,
}

impl SyncState {
    /// Returns true if a drain is in progress.
    pub fn is_active(&self) -> bool {
        matches!(self, SyncState::Draining)
    }
}

/// Cumulative statistics.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Drain passes that ran to completion.
    pub drains_completed: u64,
    /// Drain requests that found a pass already running.
    pub drains_coalesced: u64,
    /// Mutations confirmed by the authority (immediately or by a drain).
    pub mutations_applied: u64,
    /// Mutations queued for later replay.
    pub mutations_queued: u64,
    /// Replay attempts that failed.
    pub mutations_failed: u64,
    /// Mutations dropped because their record is gone on the authority.
    pub mutations_discarded: u64,
    /// When the last pass finished.
    pub last_drain_time: Option<Instant>,
    /// Last failure message.
    pub last_error: Option<String>,
}

/// What happened to one drain pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Mutations sent to the authority.
    pub attempted: usize,
    /// Mutations confirmed and removed from the log.
    pub applied: usize,
    /// Mutations whose replay failed; they stay queued.
    pub failed: usize,
    /// Mutations skipped because an earlier one for the same record did
    /// not go through; they stay queued.
    pub deferred: usize,
    /// Mutations removed because their record is gone on the authority.
    pub discarded: usize,
    /// Mutations still queued when the pass ended.
    pub remaining: usize,
    /// True if another pass was running and this request did nothing.
    pub coalesced: bool,
    /// True if the pass was cancelled before reaching the end.
    pub cancelled: bool,
    /// Wall time of the pass.
    pub duration: Duration,
}

impl DrainReport {
    fn coalesced() -> Self {
        Self {
            coalesced: true,
            ..Self::default()
        }
    }

    /// Returns true if nothing was left behind.
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.deferred == 0 && !self.cancelled && !self.coalesced
    }
}

/// What [`SyncEngine::apply_or_queue`] did with a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The authority confirmed it; nothing was queued.
    Applied,
    /// It is in the pending log. `reason` is the remote failure, if one
    /// was tried.
    Queued {
        /// Why immediate delivery did not happen.
        reason: Option<RemoteError>,
    },
    /// The authority no longer has the record; the change cannot be replayed.
    Discarded {
        /// The authority's answer.
        reason: RemoteError,
    },
}

/// Why sending one mutation failed.
enum Failure {
    Remote(RemoteError),
    Local(CoreError),
}

impl From<RemoteError> for Failure {
    fn from(err: RemoteError) -> Self {
        Self::Remote(err)
    }
}

impl From<CoreError> for Failure {
    fn from(err: CoreError) -> Self {
        Self::Local(err)
    }
}

/// Reconciles the pending mutation log with the remote authority.
///
/// The engine owns the pending log and the id map. At most one drain pass
/// runs at a time; a drain requested while one runs returns a coalesced
/// report at once. The log lock is never held across a remote call.
pub struct SyncEngine<R: RemoteAuthority> {
    remote: R,
    monitor: Arc<ConnectivityMonitor>,
    pending: Mutex<MutationLog>,
    ids: Mutex<IdMap>,
    drain_lock: Mutex<()>,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
    cancelled: AtomicBool,
}

impl<R: RemoteAuthority> SyncEngine<R> {
    /// Creates an engine over an opened pending log and id map.
    pub fn new(
        remote: R,
        monitor: Arc<ConnectivityMonitor>,
        pending: MutationLog,
        ids: IdMap,
    ) -> Self {
        Self {
            remote,
            monitor,
            pending: Mutex::new(pending),
            ids: Mutex::new(ids),
            drain_lock: Mutex::new(()),
            state: RwLock::new(SyncState::Idle),
            stats: RwLock::new(SyncStats::default()),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Returns the remote authority.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Returns the connectivity monitor.
    pub fn monitor(&self) -> &Arc<ConnectivityMonitor> {
        &self.monitor
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Returns a copy of the queued mutations in enqueue order.
    pub fn pending(&self) -> Vec<Mutation> {
        self.pending.lock().pending()
    }

    /// Returns the number of queued mutations.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Stops the running drain pass before its next entry.
    ///
    /// With no pass running, the next pass stops before its first entry.
    /// The request is used up when that pass ends.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: SyncState) {
        *self.state.write() = state;
    }

    /// Delivers `mutation` now if possible, otherwise queues it.
    ///
    /// Offline, or with older mutations for the same record still queued,
    /// the mutation is queued without contacting the authority. In the
    /// second case that record's queued mutations are then replayed (see
    /// [`drain_record`](Self::drain_record)), so it goes out behind the
    /// older ones; other records wait for the next full drain. A remote
    /// failure falls back to queueing; a remote not-found on update or
    /// delete discards it.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the mutation cannot be queued, or if
    /// a confirmed create cannot record its remote id.
    pub fn apply_or_queue(&self, mutation: Mutation) -> SyncResult<Delivery> {
        let record = mutation.record_id().clone();

        if !self.monitor.is_online() {
            self.enqueue(mutation)?;
            return Ok(Delivery::Queued { reason: None });
        }

        if self.pending.lock().has_pending_for(&record) {
            let id = mutation.id;
            self.enqueue(mutation)?;
            tracing::debug!(%record, "older mutations queued for record, replaying them first");
            self.drain_record(&record)?;
            return Ok(if self.pending.lock().contains(&id) {
                Delivery::Queued { reason: None }
            } else {
                Delivery::Applied
            });
        }

        match self.send(&mutation) {
            Ok(()) => {
                self.stats.write().mutations_applied += 1;
                Ok(Delivery::Applied)
            }
            Err(Failure::Remote(reason)) if is_definitive(&mutation, &reason) => {
                tracing::warn!(
                    %record,
                    method = %mutation.method(),
                    error = %reason,
                    "record gone on remote, discarding mutation"
                );
                self.stats.write().mutations_discarded += 1;
                Ok(Delivery::Discarded { reason })
            }
            Err(Failure::Remote(reason)) => {
                tracing::warn!(
                    %record,
                    method = %mutation.method(),
                    error = %reason,
                    "remote call failed, saving mutation for later"
                );
                self.note_remote_failure(&reason);
                self.enqueue(mutation)?;
                Ok(Delivery::Queued {
                    reason: Some(reason),
                })
            }
            Err(Failure::Local(e)) => {
                tracing::error!(%record, error = %e, "local store failed after remote apply");
                Err(SyncError::StoreUnavailable(e))
            }
        }
    }

    fn enqueue(&self, mutation: Mutation) -> SyncResult<()> {
        self.pending.lock().enqueue(mutation).map_err(|e| {
            tracing::error!(error = %e, "failed to queue mutation");
            SyncError::StoreUnavailable(e)
        })?;
        self.stats.write().mutations_queued += 1;
        Ok(())
    }

    /// Sends one mutation and updates the id map on success.
    fn send(&self, mutation: &Mutation) -> Result<(), Failure> {
        match &mutation.payload {
            Payload::Create(record) => {
                let created = self.remote.create(&record.fields())?;
                self.ids.lock().bind(&record.id, &created.id)?;
            }
            Payload::Update { id, patch } => {
                let remote_id = self.ids.lock().resolve(id)?;
                self.remote.update(&remote_id, patch)?;
            }
            Payload::Delete { id } => {
                let remote_id = self.ids.lock().resolve(id)?;
                self.remote.delete(&remote_id)?;
                self.ids.lock().unbind(id)?;
            }
        }
        Ok(())
    }

    fn note_remote_failure(&self, error: &RemoteError) {
        self.stats.write().last_error = Some(error.to_string());
        if matches!(error, RemoteError::Unavailable(_) | RemoteError::Timeout) {
            self.monitor.set_online(false);
        }
    }

    /// Attempts every queued mutation once, in enqueue order.
    ///
    /// Confirmed mutations are removed. A failed mutation stays queued and
    /// defers the later mutations for the same record; other records carry
    /// on. Draining an empty log never contacts the authority.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the log or id map cannot be written;
    /// the pass stops there. Remote failures are never errors here.
    pub fn drain_all(&self) -> SyncResult<DrainReport> {
        self.run_pass(None)
    }

    /// Attempts the queued mutations for `record` once, in enqueue order.
    ///
    /// Behaves like [`drain_all`](Self::drain_all) restricted to one
    /// record, and shares its single-pass lock.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the log or id map cannot be written.
    pub fn drain_record(&self, record: &RecordId) -> SyncResult<DrainReport> {
        self.run_pass(Some(record))
    }

    fn run_pass(&self, only: Option<&RecordId>) -> SyncResult<DrainReport> {
        let Some(_guard) = self.drain_lock.try_lock() else {
            tracing::debug!("drain already running, coalescing");
            self.stats.write().drains_coalesced += 1;
            return Ok(DrainReport::coalesced());
        };

        let result = self.replay(only);
        // A cancel request ends with the pass it applied to.
        self.cancelled.store(false, Ordering::SeqCst);
        result
    }

    fn replay(&self, only: Option<&RecordId>) -> SyncResult<DrainReport> {
        let start = Instant::now();
        let snapshot: Vec<Mutation> = self
            .pending
            .lock()
            .drain()
            .filter(|m| only.map_or(true, |record| m.record_id() == record))
            .collect();
        let queued = snapshot.len();
        let mut report = DrainReport::default();
        if queued == 0 {
            self.set_state(SyncState::Idle);
            report.duration = start.elapsed();
            return Ok(report);
        }

        self.set_state(SyncState::Draining);
        tracing::info!(queued, record = ?only, "draining pending mutations");

        let mut blocked: HashSet<RecordId> = HashSet::new();
        for mutation in snapshot {
            if self.is_cancelled() {
                tracing::info!("drain cancelled");
                report.cancelled = true;
                break;
            }

            let record = mutation.record_id().clone();
            if blocked.contains(&record) {
                report.deferred += 1;
                continue;
            }

            report.attempted += 1;
            let outcome = match self.send(&mutation) {
                Ok(()) => Ok(true),
                Err(Failure::Remote(e)) if is_definitive(&mutation, &e) => {
                    tracing::warn!(
                        id = %mutation.id,
                        %record,
                        method = %mutation.method(),
                        error = %e,
                        "record gone on remote, discarding mutation"
                    );
                    Ok(false)
                }
                Err(Failure::Remote(e)) => {
                    tracing::warn!(
                        id = %mutation.id,
                        %record,
                        method = %mutation.method(),
                        error = %e,
                        "replay failed, leaving mutation queued"
                    );
                    self.note_remote_failure(&e);
                    report.failed += 1;
                    blocked.insert(record);
                    continue;
                }
                Err(Failure::Local(e)) => Err(e),
            };

            let removed = outcome.and_then(|applied| {
                self.pending.lock().remove(&mutation.id)?;
                Ok(applied)
            });
            match removed {
                Ok(true) => report.applied += 1,
                Ok(false) => report.discarded += 1,
                Err(e) => return Err(self.abort(e, report, start)),
            }
        }

        report.remaining = self.pending_len();
        report.duration = start.elapsed();
        self.set_state(SyncState::Idle);
        {
            let mut stats = self.stats.write();
            stats.drains_completed += 1;
            stats.mutations_applied += report.applied as u64;
            stats.mutations_failed += report.failed as u64;
            stats.mutations_discarded += report.discarded as u64;
            stats.last_drain_time = Some(Instant::now());
        }

        tracing::info!(
            applied = report.applied,
            failed = report.failed,
            deferred = report.deferred,
            discarded = report.discarded,
            remaining = report.remaining,
            elapsed_ms = report.duration.as_millis() as u64,
            "drain finished"
        );
        Ok(report)
    }

    fn abort(&self, error: CoreError, report: DrainReport, start: Instant) -> SyncError {
        tracing::error!(
            error = %error,
            applied = report.applied,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "drain stopped on local store failure"
        );
        self.set_state(SyncState::Error);
        {
            let mut stats = self.stats.write();
            stats.mutations_applied += report.applied as u64;
            stats.mutations_failed += report.failed as u64;
            stats.mutations_discarded += report.discarded as u64;
            stats.last_error = Some(error.to_string());
        }
        SyncError::StoreUnavailable(error)
    }

    /// Forgets every local to remote id binding.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the id map cannot be rewritten.
    pub fn clear_bindings(&self) -> SyncResult<()> {
        self.ids.lock().clear().map_err(SyncError::StoreUnavailable)
    }

    /// Returns the authority id `local` replays against.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the binding cannot be decoded.
    pub fn resolve(&self, local: &RecordId) -> SyncResult<RecordId> {
        self.ids.lock().resolve(local).map_err(SyncError::StoreUnavailable)
    }

    /// Compacts the pending log and id map.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if a rewrite fails.
    pub fn compact(&self) -> SyncResult<()> {
        self.pending.lock().compact().map_err(SyncError::StoreUnavailable)?;
        self.ids.lock().compact().map_err(SyncError::StoreUnavailable)
    }
}

impl<R: RemoteAuthority> std::fmt::Debug for SyncEngine<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("state", &self.state())
            .field("pending", &self.pending_len())
            .field("online", &self.monitor.is_online())
            .finish()
    }
}

/// A not-found answer to an update or delete can never turn into success.
fn is_definitive(mutation: &Mutation, error: &RemoteError) -> bool {
    error.is_not_found() && mutation.method() != Method::Create
}

#[cfg(test)]
mod tests {
    use super::*;
    use outbox_core::{NewRecord, Record, RecordPatch, RemoteResult, StoreConfig};
    use outbox_storage::InMemoryBackend;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{OnceLock, Weak};

    /// Accepts everything, counting calls; fails while `down` is set.
    #[derive(Default)]
    struct CountingRemote {
        calls: AtomicUsize,
        down: AtomicBool,
        next_id: AtomicUsize,
    }

    impl CountingRemote {
        fn call(&self) -> RemoteResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.down.load(Ordering::SeqCst) {
                Err(RemoteError::Unavailable("connection refused".into()))
            } else {
                Ok(())
            }
        }
    }

    impl RemoteAuthority for CountingRemote {
        fn list(&self) -> RemoteResult<Vec<Record>> {
            self.call()?;
            Ok(Vec::new())
        }

        fn create(&self, fields: &NewRecord) -> RemoteResult<Record> {
            self.call()?;
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Record::new(RecordId::from(id as u64), fields.clone()))
        }

        fn update(&self, id: &RecordId, _patch: &RecordPatch) -> RemoteResult<Record> {
            self.call()?;
            Err(RemoteError::NotFound { id: id.clone() })
        }

        fn delete(&self, _id: &RecordId) -> RemoteResult<()> {
            self.call()
        }
    }

    fn engine(online: bool) -> SyncEngine<Arc<CountingRemote>> {
        let config = StoreConfig::default();
        let (pending, _) = MutationLog::open(Box::new(InMemoryBackend::new()), &config).unwrap();
        let ids = IdMap::open(Box::new(InMemoryBackend::new()), &config).unwrap();
        SyncEngine::new(
            Arc::new(CountingRemote::default()),
            Arc::new(ConnectivityMonitor::new(online)),
            pending,
            ids,
        )
    }

    fn create() -> Mutation {
        Mutation::create(Record::new(
            RecordId::generate(),
            NewRecord::new("Ana", "ana@x.com", "pw1"),
        ))
    }

    #[test]
    fn offline_queues_without_remote_call() {
        let engine = engine(false);
        let delivery = engine.apply_or_queue(create()).unwrap();

        assert_eq!(delivery, Delivery::Queued { reason: None });
        assert_eq!(engine.pending_len(), 1);
        assert_eq!(engine.remote().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn online_applies_and_binds_remote_id() {
        let engine = engine(true);
        let mutation = create();
        let local = mutation.record_id().clone();

        assert_eq!(engine.apply_or_queue(mutation).unwrap(), Delivery::Applied);
        assert_eq!(engine.pending_len(), 0);
        assert_eq!(engine.resolve(&local).unwrap(), RecordId::new("1"));
    }

    #[test]
    fn remote_failure_falls_back_to_queue_and_goes_offline() {
        let engine = engine(true);
        engine.remote().down.store(true, Ordering::SeqCst);

        let delivery = engine.apply_or_queue(create()).unwrap();
        assert!(matches!(delivery, Delivery::Queued { reason: Some(_) }));
        assert_eq!(engine.pending_len(), 1);
        assert!(!engine.monitor().is_online());
    }

    #[test]
    fn not_found_update_is_discarded() {
        let engine = engine(true);
        let delivery = engine
            .apply_or_queue(Mutation::update(RecordId::new("9"), RecordPatch::name("x")))
            .unwrap();

        assert!(matches!(delivery, Delivery::Discarded { .. }));
        assert_eq!(engine.pending_len(), 0);
    }

    #[test]
    fn empty_drain_never_calls_remote() {
        let engine = engine(true);
        let report = engine.drain_all().unwrap();

        assert_eq!(report, DrainReport { duration: report.duration, ..DrainReport::default() });
        assert_eq!(engine.remote().calls.load(Ordering::SeqCst), 0);
        assert_eq!(engine.state(), SyncState::Idle);
    }

    #[test]
    fn drain_is_coalesced_while_running() {
        let engine = engine(true);
        let _running = engine.drain_lock.lock();

        let report = engine.drain_all().unwrap();
        assert!(report.coalesced);
        assert_eq!(engine.stats().drains_coalesced, 1);
    }

    #[test]
    fn failed_create_defers_later_mutations_for_same_record() {
        let engine = engine(false);
        let first = create();
        let record = first.record_id().clone();
        engine.apply_or_queue(first).unwrap();
        engine.apply_or_queue(Mutation::delete(record)).unwrap();
        engine.apply_or_queue(create()).unwrap();

        engine.remote().down.store(true, Ordering::SeqCst);
        let report = engine.drain_all().unwrap();

        assert_eq!(report.attempted, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(report.deferred, 1);
        assert_eq!(report.remaining, 3);
    }

    #[test]
    fn local_failure_stops_drain() {
        let config = StoreConfig::default();
        let backend = InMemoryBackend::new();
        let (pending, _) = MutationLog::open(Box::new(backend.clone()), &config).unwrap();
        let ids = IdMap::open(Box::new(InMemoryBackend::new()), &config).unwrap();
        let engine = SyncEngine::new(
            CountingRemote::default(),
            Arc::new(ConnectivityMonitor::new(false)),
            pending,
            ids,
        );
        engine.apply_or_queue(create()).unwrap();

        backend.close();
        let err = engine.drain_all().unwrap_err();
        assert!(matches!(err, SyncError::StoreUnavailable(_)));
        assert_eq!(engine.state(), SyncState::Error);
    }

    /// Cancels the engine that owns it from inside its first remote call.
    #[derive(Default)]
    struct CancellingRemote {
        inner: CountingRemote,
        engine: OnceLock<Weak<SyncEngine<CancellingRemote>>>,
    }

    impl RemoteAuthority for CancellingRemote {
        fn list(&self) -> RemoteResult<Vec<Record>> {
            self.inner.list()
        }

        fn create(&self, fields: &NewRecord) -> RemoteResult<Record> {
            if self.inner.calls.load(Ordering::SeqCst) == 0 {
                if let Some(engine) = self.engine.get().and_then(Weak::upgrade) {
                    engine.cancel();
                }
            }
            self.inner.create(fields)
        }

        fn update(&self, id: &RecordId, patch: &RecordPatch) -> RemoteResult<Record> {
            self.inner.update(id, patch)
        }

        fn delete(&self, id: &RecordId) -> RemoteResult<()> {
            self.inner.delete(id)
        }
    }

    #[test]
    fn cancel_during_drain_stops_before_next_entry() {
        let config = StoreConfig::default();
        let (pending, _) = MutationLog::open(Box::new(InMemoryBackend::new()), &config).unwrap();
        let ids = IdMap::open(Box::new(InMemoryBackend::new()), &config).unwrap();
        let engine = Arc::new(SyncEngine::new(
            CancellingRemote::default(),
            Arc::new(ConnectivityMonitor::new(false)),
            pending,
            ids,
        ));
        assert!(engine.remote().engine.set(Arc::downgrade(&engine)).is_ok());
        for _ in 0..3 {
            engine.apply_or_queue(create()).unwrap();
        }
        let queued = engine.pending();

        let report = engine.drain_all().unwrap();
        assert!(report.cancelled);
        assert_eq!(report.attempted, 1);
        assert_eq!(report.applied, 1);
        assert_eq!(report.remaining, 2);
        assert_eq!(engine.pending(), queued[1..].to_vec());
        assert_eq!(engine.state(), SyncState::Idle);

        // The request ended with the pass it stopped.
        let report = engine.drain_all().unwrap();
        assert!(!report.cancelled);
        assert_eq!(report.applied, 2);
        assert_eq!(engine.pending_len(), 0);
    }

    #[test]
    fn cancel_before_drain_stops_next_pass_only() {
        let engine = engine(false);
        engine.apply_or_queue(create()).unwrap();

        engine.cancel();
        let report = engine.drain_all().unwrap();
        assert!(report.cancelled);
        assert_eq!(report.attempted, 0);
        assert_eq!(engine.pending_len(), 1);
        assert_eq!(engine.remote().calls.load(Ordering::SeqCst), 0);

        let report = engine.drain_all().unwrap();
        assert!(report.is_clean());
        assert_eq!(report.applied, 1);
    }

    #[test]
    fn empty_drain_clears_error_state() {
        let engine = engine(true);
        engine.set_state(SyncState::Error);

        engine.drain_all().unwrap();
        assert_eq!(engine.state(), SyncState::Idle);
    }

    #[test]
    fn queued_record_replays_without_touching_other_records() {
        let engine = engine(false);
        let first = create();
        let record = first.record_id().clone();
        let other = create();
        engine.apply_or_queue(first).unwrap();
        engine.apply_or_queue(other.clone()).unwrap();

        engine.monitor().set_online(true);
        let delivery = engine.apply_or_queue(Mutation::delete(record)).unwrap();

        assert_eq!(delivery, Delivery::Applied);
        assert_eq!(engine.pending(), vec![other]);
        assert_eq!(engine.remote().calls.load(Ordering::SeqCst), 2);
    }
}
