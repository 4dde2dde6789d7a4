//! The Pending Mutation Log: a durable FIFO of unconfirmed mutations.

use crate::codec;
use crate::config::StoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::log::{Corruption, KeyedLog};
use crate::types::{Mutation, MutationId, RecordId};
use outbox_storage::StorageBackend;
use std::collections::{BTreeMap, HashMap};

/// Durable queue of mutations awaiting confirmation by the remote authority.
///
/// Entries are keyed by a zero-padded enqueue sequence number, so key order
/// is enqueue order. The decoded queue is mirrored in memory.
///
/// An entry leaves the log only through [`MutationLog::remove`].
#[derive(Debug)]
pub struct MutationLog {
    log: KeyedLog,
    queue: BTreeMap<u64, Mutation>,
    by_id: HashMap<MutationId, u64>,
    next_seq: u64,
}

impl MutationLog {
    /// Log name used in diagnostics.
    pub const LOG_NAME: &'static str = "pending.log";

    /// Opens the log over `backend`, keeping whatever can be recovered.
    ///
    /// Damaged frames and entries that no longer decode are dropped; the
    /// returned [`Corruption`] says what was lost.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend cannot be read or rewritten.
    pub fn open(
        backend: Box<dyn StorageBackend>,
        config: &StoreConfig,
    ) -> CoreResult<(Self, Option<Corruption>)> {
        let (mut log, mut corruption) = KeyedLog::open_lenient(Self::LOG_NAME, backend, config)?;

        let mut queue = BTreeMap::new();
        let mut undecodable = Vec::new();
        for (key, value) in log.iter() {
            let seq = key.parse::<u64>().ok();
            match (seq, codec::decode::<Mutation>(value)) {
                (Some(seq), Ok(mutation)) => {
                    queue.insert(seq, mutation);
                }
                (_, Err(e)) => undecodable.push((key.to_string(), e.to_string())),
                (None, Ok(_)) => undecodable.push((key.to_string(), "bad sequence key".into())),
            }
        }

        if !undecodable.is_empty() {
            for (key, reason) in &undecodable {
                tracing::warn!(%key, %reason, "dropping undecodable pending mutation");
                log.remove(key)?;
            }
            let reason = format!("{} entries could not be decoded", undecodable.len());
            corruption = Some(match corruption {
                Some(mut existing) => {
                    existing.reason = format!("{}; {reason}", existing.reason);
                    existing.recovered_entries = queue.len();
                    existing
                }
                None => Corruption {
                    log: Self::LOG_NAME.to_string(),
                    offset: 0,
                    reason,
                    dropped_bytes: 0,
                    recovered_entries: queue.len(),
                    quarantined: None,
                },
            });
        }

        let by_id = queue.iter().map(|(seq, m)| (m.id, *seq)).collect();
        let next_seq = queue.keys().next_back().map_or(0, |seq| seq + 1);

        tracing::debug!(pending = queue.len(), "opened pending mutation log");
        Ok((
            Self {
                log,
                queue,
                by_id,
                next_seq,
            },
            corruption,
        ))
    }

    /// Durably appends `mutation` to the end of the queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; the mutation is then not queued.
    pub fn enqueue(&mut self, mutation: Mutation) -> CoreResult<()> {
        let seq = self.next_seq;
        self.log.put(&seq_key(seq), codec::encode(&mutation)?)?;

        tracing::debug!(
            id = %mutation.id,
            method = %mutation.method(),
            record = %mutation.record_id(),
            "queued mutation"
        );
        self.next_seq += 1;
        self.by_id.insert(mutation.id, seq);
        self.queue.insert(seq, mutation);
        Ok(())
    }

    /// Returns every currently queued mutation in enqueue order.
    ///
    /// The sequence is a snapshot: mutations enqueued after this call are
    /// not yielded, and removing entries does not disturb it.
    #[must_use]
    pub fn drain(&self) -> Drain {
        Drain {
            inner: self.pending().into_iter(),
        }
    }

    /// Removes the mutation with `id`. Call only once it is confirmed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such mutation is queued, or a storage error.
    pub fn remove(&mut self, id: &MutationId) -> CoreResult<()> {
        let seq = *self
            .by_id
            .get(id)
            .ok_or_else(|| CoreError::not_found(id.to_string()))?;

        self.log.remove(&seq_key(seq))?;
        self.by_id.remove(id);
        self.queue.remove(&seq);
        tracing::debug!(%id, "removed mutation");
        Ok(())
    }

    /// Returns a copy of the queue in enqueue order.
    #[must_use]
    pub fn pending(&self) -> Vec<Mutation> {
        self.queue.values().cloned().collect()
    }

    /// Returns true if a mutation with `id` is queued.
    #[must_use]
    pub fn contains(&self, id: &MutationId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Returns true if any queued mutation targets `record`.
    #[must_use]
    pub fn has_pending_for(&self, record: &RecordId) -> bool {
        self.queue.values().any(|m| m.record_id() == record)
    }

    /// Returns the number of queued mutations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
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

fn seq_key(seq: u64) -> String {
    format!("{seq:020}")
}

/// Snapshot of the queue returned by [`MutationLog::drain`].
#[derive(Debug)]
pub struct Drain {
    inner: std::vec::IntoIter<Mutation>,
}

impl Iterator for Drain {
    type Item = Mutation;

    fn next(&mut self) -> Option<Mutation> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Drain {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NewRecord, Record, RecordPatch};
    use outbox_storage::InMemoryBackend;
    use proptest::prelude::*;

    fn open(backend: &InMemoryBackend) -> MutationLog {
        let (log, corruption) =
            MutationLog::open(Box::new(backend.clone()), &StoreConfig::default()).unwrap();
        assert!(corruption.is_none());
        log
    }

    fn create(name: &str) -> Mutation {
        Mutation::create(Record::new(
            RecordId::generate(),
            NewRecord::new(name, "e@x.com", "pw"),
        ))
    }

    #[test]
    fn drains_in_enqueue_order() {
        let mut log = open(&InMemoryBackend::new());
        let first = create("first");
        let id = first.record_id().clone();
        let second = Mutation::update(id.clone(), RecordPatch::name("second"));
        let third = Mutation::delete(id);

        log.enqueue(first.clone()).unwrap();
        log.enqueue(second.clone()).unwrap();
        log.enqueue(third.clone()).unwrap();

        let drained: Vec<_> = log.drain().collect();
        assert_eq!(drained, vec![first, second, third]);
    }

    #[test]
    fn drain_is_a_snapshot() {
        let mut log = open(&InMemoryBackend::new());
        let a = create("a");
        log.enqueue(a.clone()).unwrap();

        let mut drain = log.drain();
        log.enqueue(create("late")).unwrap();
        log.remove(&a.id).unwrap();

        assert_eq!(drain.len(), 1);
        assert_eq!(drain.next(), Some(a));
        assert_eq!(drain.next(), None);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn remove_unknown_is_not_found() {
        let mut log = open(&InMemoryBackend::new());
        assert!(log.remove(&MutationId::generate()).unwrap_err().is_not_found());
    }

    #[test]
    fn empty_log_drains_nothing() {
        let log = open(&InMemoryBackend::new());
        assert_eq!(log.drain().count(), 0);
    }

    #[test]
    fn order_survives_reopen() {
        let backend = InMemoryBackend::new();
        let mutations: Vec<_> = (0..12).map(|i| create(&format!("m{i}"))).collect();
        {
            let mut log = open(&backend);
            for m in &mutations {
                log.enqueue(m.clone()).unwrap();
            }
            log.remove(&mutations[3].id).unwrap();
        }

        let mut log = open(&backend);
        let expected: Vec<_> = mutations
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 3)
            .map(|(_, m)| m.clone())
            .collect();
        assert_eq!(log.pending(), expected);

        // New entries still go to the back.
        let late = create("late");
        log.enqueue(late.clone()).unwrap();
        assert_eq!(log.drain().last(), Some(late));
    }

    #[test]
    fn has_pending_for_tracks_record() {
        let mut log = open(&InMemoryBackend::new());
        let m = create("a");
        let record = m.record_id().clone();
        log.enqueue(m.clone()).unwrap();
        assert!(log.has_pending_for(&record));

        log.remove(&m.id).unwrap();
        assert!(!log.has_pending_for(&record));
    }

    #[test]
    fn damaged_tail_keeps_prefix() {
        let backend = InMemoryBackend::new();
        let kept = create("kept");
        {
            let mut log = open(&backend);
            log.enqueue(kept.clone()).unwrap();
            log.enqueue(create("lost")).unwrap();
        }
        let mut bytes = backend.data();
        let last = bytes.len() - 5;
        bytes[last] ^= 0x55;

        let (log, corruption) = MutationLog::open(
            Box::new(InMemoryBackend::with_data(bytes)),
            &StoreConfig::default(),
        )
        .unwrap();
        let corruption = corruption.unwrap();
        assert_eq!(corruption.log, "pending.log");
        assert_eq!(corruption.recovered_entries, 1);
        assert_eq!(log.pending(), vec![kept]);
    }

    #[test]
    fn undecodable_entry_is_dropped() {
        let backend = InMemoryBackend::new();
        let good = create("good");
        {
            let mut log = open(&backend);
            log.enqueue(good.clone()).unwrap();
        }
        {
            let mut raw =
                KeyedLog::open("raw", Box::new(backend.clone()), &StoreConfig::default()).unwrap();
            raw.put(&seq_key(1), vec![0xff]).unwrap();
        }

        let (log, corruption) =
            MutationLog::open(Box::new(backend.clone()), &StoreConfig::default()).unwrap();
        assert!(corruption.unwrap().reason.contains("could not be decoded"));
        assert_eq!(log.pending(), vec![good]);

        // The bad entry is gone from disk too.
        let reopened = open(&backend);
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn failed_enqueue_is_not_queued() {
        let backend = InMemoryBackend::new();
        let mut log = open(&backend);
        backend.close();

        assert!(log.enqueue(create("x")).unwrap_err().is_unavailable());
        backend.reopen();
        assert!(log.is_empty());
    }

    proptest! {
        #[test]
        fn fifo_under_interleaved_removes(
            ops in proptest::collection::vec(any::<Option<prop::sample::Index>>(), 1..40)
        ) {
            let backend = InMemoryBackend::new();
            let mut log = open(&backend);
            let mut model: Vec<Mutation> = Vec::new();

            for op in ops {
                match op {
                    None => {
                        let m = create("p");
                        log.enqueue(m.clone()).unwrap();
                        model.push(m);
                    }
                    Some(index) if !model.is_empty() => {
                        let m = model.remove(index.index(model.len()));
                        log.remove(&m.id).unwrap();
                    }
                    Some(_) => {}
                }
            }

            prop_assert_eq!(log.pending(), model.clone());
            prop_assert_eq!(open(&backend).pending(), model);
        }
    }
}
