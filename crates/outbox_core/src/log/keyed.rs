//! The keyed log: an append-only frame log with an in-memory index.

use super::frame::{self, FrameKind, Parsed};
use crate::config::StoreConfig;
use crate::error::{CoreError, CoreResult};
use outbox_storage::StorageBackend;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Damage found while opening a log leniently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corruption {
    /// Name of the damaged log.
    pub log: String,
    /// Offset of the first bad frame.
    pub offset: u64,
    /// What was wrong with it.
    pub reason: String,
    /// Bytes after the valid prefix that were discarded.
    pub dropped_bytes: u64,
    /// Entries that survived.
    pub recovered_entries: usize,
    /// Where the damaged file was copied before the rewrite, if anywhere.
    pub quarantined: Option<PathBuf>,
}

/// Result of scanning a backend's frames.
struct Scan {
    index: BTreeMap<String, Vec<u8>>,
    dead_frames: usize,
    valid_len: u64,
    total_len: u64,
    damage: Option<(u64, String)>,
}

/// An append-only keyed log.
///
/// Keys are strings, values are opaque bytes. The whole live key space is
/// indexed in memory (the logs hold one client's records, not a dataset).
/// Iteration is in key order, which is stable for the life of the process.
///
/// # Durability
///
/// `put` and `remove` append one frame and, with `sync_on_write`, sync
/// the backend before the index is updated. A failed append never reaches
/// the index, and the log tries to cut any partial frame back off.
pub struct KeyedLog {
    name: String,
    backend: Box<dyn StorageBackend>,
    index: BTreeMap<String, Vec<u8>>,
    dead_frames: usize,
    sync_on_write: bool,
    compact_threshold: usize,
}

impl KeyedLog {
    /// Opens a log, failing with [`CoreError::LogCorrupt`] on any damage
    /// other than a torn tail.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read or the log is corrupt.
    pub fn open(
        name: impl Into<String>,
        backend: Box<dyn StorageBackend>,
        config: &StoreConfig,
    ) -> CoreResult<Self> {
        let name = name.into();
        let scan = scan(backend.as_ref())?;

        if let Some((offset, reason)) = scan.damage {
            tracing::error!(log = %name, offset, %reason, "log is corrupt");
            return Err(CoreError::LogCorrupt {
                log: name,
                offset,
                reason,
            });
        }

        let mut log = Self::from_scan(name, backend, config, scan.index, scan.dead_frames);
        log.cut_torn_tail(scan.valid_len, scan.total_len)?;
        Ok(log)
    }

    /// Opens a log, keeping the valid prefix if it is damaged.
    ///
    /// On damage the backend is rewritten to hold only the recovered
    /// entries, so later appends start from a clean log. The caller gets
    /// a [`Corruption`] describing what was lost.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend cannot be read or rewritten.
    pub fn open_lenient(
        name: impl Into<String>,
        backend: Box<dyn StorageBackend>,
        config: &StoreConfig,
    ) -> CoreResult<(Self, Option<Corruption>)> {
        let name = name.into();
        let scan = scan(backend.as_ref())?;
        let mut log = Self::from_scan(name, backend, config, scan.index, scan.dead_frames);

        match scan.damage {
            None => {
                log.cut_torn_tail(scan.valid_len, scan.total_len)?;
                Ok((log, None))
            }
            Some((offset, reason)) => {
                let dropped_bytes = scan.total_len - scan.valid_len;
                tracing::warn!(
                    log = %log.name,
                    offset,
                    %reason,
                    dropped_bytes,
                    recovered = log.index.len(),
                    "log damaged, continuing with the valid prefix"
                );
                log.compact()?;
                let corruption = Corruption {
                    log: log.name.clone(),
                    offset,
                    reason,
                    dropped_bytes,
                    recovered_entries: log.index.len(),
                    quarantined: None,
                };
                Ok((log, Some(corruption)))
            }
        }
    }

    fn from_scan(
        name: String,
        backend: Box<dyn StorageBackend>,
        config: &StoreConfig,
        index: BTreeMap<String, Vec<u8>>,
        dead_frames: usize,
    ) -> Self {
        Self {
            name,
            backend,
            index,
            dead_frames,
            sync_on_write: config.sync_on_write,
            compact_threshold: config.compact_threshold,
        }
    }

    fn cut_torn_tail(&mut self, valid_len: u64, total_len: u64) -> CoreResult<()> {
        if valid_len < total_len {
            tracing::warn!(
                log = %self.name,
                dropped_bytes = total_len - valid_len,
                "dropping torn tail frame"
            );
            self.backend.truncate(valid_len)?;
        }
        Ok(())
    }

    /// Returns the log's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.index.get(key).map(Vec::as_slice)
    }

    /// Returns true if `key` is live.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Iterates live entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.index.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Returns the number of live keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if no key is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns the number of frames that no longer contribute to the index.
    #[must_use]
    pub fn dead_frames(&self) -> usize {
        self.dead_frames
    }

    /// Sets `key` to `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be written durably.
    pub fn put(&mut self, key: &str, value: Vec<u8>) -> CoreResult<()> {
        let data = frame::encode(FrameKind::Put, key, &value)?;
        self.write_frame(&data)?;

        if self.index.insert(key.to_string(), value).is_some() {
            self.dead_frames += 1;
        }
        self.maybe_compact();
        Ok(())
    }

    /// Removes `key`. Returns false (and writes nothing) if it was not live.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be written durably.
    pub fn remove(&mut self, key: &str) -> CoreResult<bool> {
        if !self.index.contains_key(key) {
            return Ok(false);
        }

        let data = frame::encode(FrameKind::Remove, key, &[])?;
        self.write_frame(&data)?;

        self.index.remove(key);
        // The old put and this tombstone are both dead now.
        self.dead_frames += 2;
        self.maybe_compact();
        Ok(true)
    }

    /// Replaces every entry with `entries` in one atomic rewrite.
    ///
    /// # Errors
    ///
    /// Returns an error if the rewrite fails; the old contents then remain.
    pub fn reset<I>(&mut self, entries: I) -> CoreResult<()>
    where
        I: IntoIterator<Item = (String, Vec<u8>)>,
    {
        let index: BTreeMap<String, Vec<u8>> = entries.into_iter().collect();
        let data = encode_all(&index)?;
        self.backend.replace(&data)?;
        self.index = index;
        self.dead_frames = 0;
        Ok(())
    }

    /// Rewrites the log with only live entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the rewrite fails; the old contents then remain.
    pub fn compact(&mut self) -> CoreResult<()> {
        let data = encode_all(&self.index)?;
        self.backend.replace(&data)?;
        tracing::debug!(
            log = %self.name,
            live = self.index.len(),
            reclaimed_frames = self.dead_frames,
            "compacted log"
        );
        self.dead_frames = 0;
        Ok(())
    }

    fn maybe_compact(&mut self) {
        if self.dead_frames >= self.compact_threshold && self.dead_frames > self.index.len() {
            // The write that got us here already succeeded; a failed
            // compaction only leaves the log longer than it needs to be.
            if let Err(e) = self.compact() {
                tracing::warn!(log = %self.name, error = %e, "compaction failed");
            }
        }
    }

    fn write_frame(&mut self, data: &[u8]) -> CoreResult<()> {
        let before = self.backend.size()?;

        let result = self.backend.append(data).and_then(|_| {
            if self.sync_on_write {
                self.backend.sync()
            } else {
                self.backend.flush()
            }
        });

        if let Err(e) = result {
            tracing::error!(log = %self.name, error = %e, "append failed");
            if let Err(cut) = self.backend.truncate(before) {
                tracing::warn!(log = %self.name, error = %cut, "could not cut partial frame");
            }
            return Err(e.into());
        }
        Ok(())
    }
}

impl std::fmt::Debug for KeyedLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedLog")
            .field("name", &self.name)
            .field("live", &self.index.len())
            .field("dead_frames", &self.dead_frames)
            .finish()
    }
}

fn encode_all(index: &BTreeMap<String, Vec<u8>>) -> CoreResult<Vec<u8>> {
    let mut data = Vec::new();
    for (key, value) in index {
        data.extend_from_slice(&frame::encode(FrameKind::Put, key, value)?);
    }
    Ok(data)
}

fn scan(backend: &dyn StorageBackend) -> CoreResult<Scan> {
    let total_len = backend.size()?;
    let bytes = backend.read_at(0, total_len as usize)?;

    let mut index = BTreeMap::new();
    let mut dead_frames = 0usize;
    let mut offset = 0usize;
    let mut damage = None;

    while offset < bytes.len() {
        match frame::parse(&bytes[offset..]) {
            Parsed::Frame { frame, len } => {
                match frame.kind {
                    FrameKind::Put => {
                        if index.insert(frame.key.to_string(), frame.value.to_vec()).is_some() {
                            dead_frames += 1;
                        }
                    }
                    FrameKind::Remove => {
                        // The tombstone itself is always dead.
                        dead_frames += 1;
                        if index.remove(frame.key).is_some() {
                            dead_frames += 1;
                        }
                    }
                }
                offset += len;
            }
            Parsed::TornTail => {
                // An interrupted append only ever damages the last frame. If a
                // whole frame follows, a length field was damaged instead.
                if let Some(next) = intact_frame_after(&bytes, offset) {
                    damage = Some((
                        offset as u64,
                        format!("frame length runs past intact frame at offset {next}"),
                    ));
                }
                break;
            }
            Parsed::Corrupt(reason) => {
                damage = Some((offset as u64, reason));
                break;
            }
        }
    }

    Ok(Scan {
        index,
        dead_frames,
        valid_len: offset as u64,
        total_len,
        damage,
    })
}

/// Returns the offset of the first complete, checksummed frame starting
/// after `offset`.
fn intact_frame_after(bytes: &[u8], offset: usize) -> Option<usize> {
    let magic = frame::FRAME_MAGIC;
    (offset + 1..bytes.len().saturating_sub(magic.len() - 1))
        .filter(|&at| bytes[at..].starts_with(&magic))
        .find(|&at| matches!(frame::parse(&bytes[at..]), Parsed::Frame { .. }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use outbox_storage::InMemoryBackend;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn config() -> StoreConfig {
        StoreConfig::default()
    }

    fn open(backend: &InMemoryBackend) -> KeyedLog {
        KeyedLog::open("test.log", Box::new(backend.clone()), &config()).unwrap()
    }

    #[test]
    fn put_get_remove() {
        let backend = InMemoryBackend::new();
        let mut log = open(&backend);

        log.put("a", b"1".to_vec()).unwrap();
        log.put("b", b"2".to_vec()).unwrap();
        assert_eq!(log.get("a"), Some(&b"1"[..]));
        assert_eq!(log.len(), 2);

        assert!(log.remove("a").unwrap());
        assert!(!log.remove("a").unwrap());
        assert!(!log.contains("a"));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn reopen_replays_last_write_per_key() {
        let backend = InMemoryBackend::new();
        {
            let mut log = open(&backend);
            log.put("a", b"old".to_vec()).unwrap();
            log.put("a", b"new".to_vec()).unwrap();
            log.put("b", b"gone".to_vec()).unwrap();
            log.remove("b").unwrap();
        }

        let log = open(&backend);
        assert_eq!(log.get("a"), Some(&b"new"[..]));
        assert!(!log.contains("b"));
        assert_eq!(log.dead_frames(), 3);
    }

    #[test]
    fn torn_tail_is_dropped() {
        let backend = InMemoryBackend::new();
        {
            let mut log = open(&backend);
            log.put("a", b"1".to_vec()).unwrap();
        }
        let good_len = backend.data().len();

        let mut raw = backend.clone();
        let partial = frame::encode(FrameKind::Put, "b", b"2").unwrap();
        raw.append(&partial[..partial.len() - 3]).unwrap();

        let log = open(&backend);
        assert_eq!(log.len(), 1);
        assert_eq!(backend.data().len(), good_len);
    }

    #[test]
    fn strict_open_rejects_damage() {
        let backend = InMemoryBackend::new();
        {
            let mut log = open(&backend);
            log.put("a", b"1".to_vec()).unwrap();
            log.put("b", b"2".to_vec()).unwrap();
        }
        let mut bytes = backend.data();
        let last = bytes.len() - 6;
        bytes[last] ^= 0xff;

        let result = KeyedLog::open(
            "records.log",
            Box::new(InMemoryBackend::with_data(bytes)),
            &config(),
        );
        assert!(matches!(result, Err(CoreError::LogCorrupt { .. })));
    }

    #[test]
    fn damaged_length_before_intact_frames_is_not_a_torn_tail() {
        let backend = InMemoryBackend::new();
        {
            let mut log = open(&backend);
            for key in ["a", "b", "c"] {
                log.put(key, b"value".to_vec()).unwrap();
            }
        }
        let mut bytes = backend.data();
        // High byte of the first frame's value_len.
        bytes[12] = 0x7f;

        let strict = InMemoryBackend::with_data(bytes.clone());
        let result = KeyedLog::open("records.log", Box::new(strict.clone()), &config());
        assert!(matches!(result, Err(CoreError::LogCorrupt { offset: 0, .. })));
        assert_eq!(strict.data(), bytes);

        let lenient = InMemoryBackend::with_data(bytes);
        let (log, corruption) =
            KeyedLog::open_lenient("pending.log", Box::new(lenient), &config()).unwrap();
        let corruption = corruption.unwrap();
        assert_eq!(corruption.offset, 0);
        assert_eq!(corruption.recovered_entries, 0);
        assert!(log.is_empty());
    }

    #[test]
    fn damaged_length_of_last_frame_is_a_torn_tail() {
        let backend = InMemoryBackend::new();
        {
            let mut log = open(&backend);
            log.put("a", b"1".to_vec()).unwrap();
            log.put("b", b"2".to_vec()).unwrap();
        }
        let mut bytes = backend.data();
        let second = bytes.len() / 2;
        bytes[second + 12] = 0x7f;

        let backend = InMemoryBackend::with_data(bytes);
        let log = open(&backend);
        assert_eq!(log.len(), 1);
        assert_eq!(backend.data().len(), second);
    }

    #[test]
    fn lenient_open_keeps_valid_prefix() {
        let backend = InMemoryBackend::new();
        {
            let mut log = open(&backend);
            log.put("a", b"1".to_vec()).unwrap();
        }
        let mut raw = backend.clone();
        raw.append(b"garbage that is long enough to not look torn").unwrap();

        let (mut log, corruption) =
            KeyedLog::open_lenient("pending.log", Box::new(backend.clone()), &config()).unwrap();
        let corruption = corruption.unwrap();
        assert_eq!(corruption.recovered_entries, 1);
        assert!(corruption.dropped_bytes > 0);
        assert_eq!(log.get("a"), Some(&b"1"[..]));

        // The rewritten log accepts appends and reopens cleanly.
        log.put("b", b"2".to_vec()).unwrap();
        let log = open(&backend);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn failed_append_is_invisible() {
        let backend = InMemoryBackend::new();
        let mut log = open(&backend);
        log.put("a", b"1".to_vec()).unwrap();

        backend.close();
        assert!(log.put("b", b"2".to_vec()).is_err());
        assert!(log.remove("a").is_err());
        backend.reopen();

        assert!(!log.contains("b"));
        assert!(log.contains("a"));
    }

    #[test]
    fn compaction_after_threshold() {
        let backend = InMemoryBackend::new();
        let config = StoreConfig::default().with_compact_threshold(4);
        let mut log = KeyedLog::open("ids.log", Box::new(backend.clone()), &config).unwrap();

        for i in 0..5 {
            log.put("hot", vec![i]).unwrap();
        }
        assert_eq!(log.dead_frames(), 0);

        let reopened = open(&backend);
        assert_eq!(reopened.get("hot"), Some(&[4u8][..]));
        assert_eq!(reopened.dead_frames(), 0);
    }

    #[test]
    fn reset_replaces_everything() {
        let backend = InMemoryBackend::new();
        let mut log = open(&backend);
        log.put("old", b"x".to_vec()).unwrap();

        log.reset(vec![("n1".to_string(), b"1".to_vec()), ("n2".to_string(), b"2".to_vec())])
            .unwrap();

        let reopened = open(&backend);
        let keys: Vec<&str> = reopened.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["n1", "n2"]);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Put(u8, Vec<u8>),
        Remove(u8),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..8, proptest::collection::vec(any::<u8>(), 0..16)).prop_map(|(k, v)| Op::Put(k, v)),
            (0u8..8).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn replay_matches_model(ops in proptest::collection::vec(op_strategy(), 0..64)) {
            let backend = InMemoryBackend::new();
            let config = StoreConfig::default().with_compact_threshold(8);
            let mut model = BTreeMap::new();
            {
                let mut log = KeyedLog::open("model.log", Box::new(backend.clone()), &config).unwrap();
                for op in &ops {
                    match op {
                        Op::Put(k, v) => {
                            log.put(&k.to_string(), v.clone()).unwrap();
                            model.insert(k.to_string(), v.clone());
                        }
                        Op::Remove(k) => {
                            let existed = log.remove(&k.to_string()).unwrap();
                            prop_assert_eq!(existed, model.remove(&k.to_string()).is_some());
                        }
                    }
                }
            }

            let log = KeyedLog::open("model.log", Box::new(backend), &config).unwrap();
            let replayed: BTreeMap<String, Vec<u8>> =
                log.iter().map(|(k, v)| (k.to_string(), v.to_vec())).collect();
            prop_assert_eq!(replayed, model);
        }
    }
}
