// ── Raw reading store ──
//
// Per-nozzle merge target for both reading channels. `DashMap` gives
// per-shard locking, so every merge is atomic for its key without a
// global lock; a `watch` version counter tells subscribers something
// changed.

use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::model::{NozzleCode, RawReading, ReadingUpdate};

/// Latest known `{cash, tag}` per nozzle code.
///
/// Entries are never removed: they persist across fueling episodes and
/// across feed outages. With a TTL configured, [`get`](Self::get) hides
/// entries that have not been refreshed recently.
pub struct RawReadingStore {
    readings: DashMap<NozzleCode, RawReading>,
    ttl: Option<Duration>,
    version: watch::Sender<u64>,
}

impl RawReadingStore {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        Self {
            readings: DashMap::new(),
            ttl: None,
            version,
        }
    }

    /// Hide readings older than `ttl` from lookups.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Merge one partial update.
    ///
    /// Cash is always overwritten. The tag is overwritten only by a
    /// non-null value, so a later update that omits it never erases it.
    pub fn merge(&self, update: ReadingUpdate) {
        self.apply(update);
        self.bump_version();
    }

    /// Merge many updates, notifying subscribers once. Returns the count.
    pub fn merge_batch(&self, updates: impl IntoIterator<Item = ReadingUpdate>) -> usize {
        let mut merged = 0;
        for update in updates {
            self.apply(update);
            merged += 1;
        }
        if merged > 0 {
            self.bump_version();
        }
        merged
    }

    /// Forget the retained tag once a fueling episode is over.
    /// Returns `true` if a tag was cleared.
    pub fn end_episode(&self, code: NozzleCode) -> bool {
        let cleared = self
            .readings
            .get_mut(&code)
            .and_then(|mut entry| entry.tag.take())
            .is_some();
        if cleared {
            tracing::debug!(nozzle = %code, "episode ended, tag released");
            self.bump_version();
        }
        cleared
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Current reading for `code`, or `None` if never seen (or stale).
    pub fn get(&self, code: NozzleCode) -> Option<RawReading> {
        let entry = self.readings.get(&code)?;
        self.is_fresh(&entry).then(|| entry.value().clone())
    }

    /// All visible readings, ordered by code.
    pub fn snapshot(&self) -> Vec<(NozzleCode, RawReading)> {
        let mut all: Vec<_> = self
            .readings
            .iter()
            .filter(|entry| self.is_fresh(entry.value()))
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        all.sort_by_key(|(code, _)| *code);
        all
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    // ── Notification ─────────────────────────────────────────────────

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn apply(&self, update: ReadingUpdate) {
        match self.readings.entry(update.code) {
            Entry::Occupied(mut entry) => entry.get_mut().merge(update),
            Entry::Vacant(entry) => {
                entry.insert(RawReading::from_update(update));
            }
        }
    }

    fn is_fresh(&self, reading: &RawReading) -> bool {
        self.ttl
            .is_none_or(|ttl| Instant::now().duration_since(reading.refreshed) <= ttl)
    }

    fn bump_version(&self) {
        // `send_modify` updates unconditionally, even with zero receivers.
        self.version.send_modify(|v| *v += 1);
    }
}

impl Default for RawReadingStore {
    fn default() -> Self {
        Self::new()
    }
}
