//! Entry Index Module
//!
//! Synchronous core of the in-process store: a HashMap of entries plus the
//! creation order used for oldest-first eviction. Callers provide locking.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::cache::order::{CreationOrder, CreationStamp};
use crate::cache::CacheEntry;

/// Superseded heap stamps tolerated before a compaction pass.
const COMPACT_SLACK: usize = 64;

#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    seq: u64,
}

// == Lookup ==
/// Result of a read against the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Fresh value
    Hit(Vec<u8>),
    /// Entry present but expired; carries its insertion sequence
    Stale(u64),
    /// No entry for the key
    Miss,
}

// == Entry Index ==
#[derive(Debug)]
pub struct EntryIndex {
    entries: HashMap<String, Slot>,
    order: CreationOrder,
    /// Maximum number of entries, 0 = unbounded
    max_size: usize,
    next_seq: u64,
}

impl EntryIndex {
    // == Constructor ==
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: CreationOrder::new(),
            max_size,
            next_seq: 0,
        }
    }

    // == Insert ==
    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// A new key that would push the index past `max_size` first evicts the
    /// entry with the oldest creation time. Overwrites never evict. Returns
    /// the evicted key, if any.
    pub fn insert(
        &mut self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
        now: Instant,
    ) -> Option<String> {
        let evicted = if self.max_size > 0
            && !self.entries.contains_key(key)
            && self.entries.len() >= self.max_size
        {
            self.evict_oldest()
        } else {
            None
        };

        let seq = self.next_seq;
        self.next_seq += 1;

        self.order.push(key, now, seq);
        self.entries.insert(
            key.to_string(),
            Slot {
                entry: CacheEntry::created_at(key, value, ttl, now),
                seq,
            },
        );

        if self.order.len() > self.entries.len() * 2 + COMPACT_SLACK {
            self.compact();
        }

        evicted
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let entries = &self.entries;
        let victim = self.order.pop_oldest(|stamp| is_live(entries, stamp))?;
        self.entries.remove(&victim.key);
        Some(victim.key)
    }

    fn compact(&mut self) {
        let entries = &self.entries;
        self.order.compact(|stamp| is_live(entries, stamp));
    }

    // == Lookup ==
    /// Reads `key` at `now` without modifying the index.
    pub fn lookup(&self, key: &str, now: Instant) -> Lookup {
        match self.entries.get(key) {
            Some(slot) if slot.entry.is_expired_at(now) => Lookup::Stale(slot.seq),
            Some(slot) => Lookup::Hit(slot.entry.value().to_vec()),
            None => Lookup::Miss,
        }
    }

    // == Remove If Stale ==
    /// Removes `key` only if it is still the insertion `seq` and expired.
    ///
    /// Guards lazy expiry against a concurrent overwrite that landed between
    /// the read and the removal.
    pub fn remove_if_stale(&mut self, key: &str, seq: u64, now: Instant) -> bool {
        let stale = self
            .entries
            .get(key)
            .is_some_and(|slot| slot.seq == seq && slot.entry.is_expired_at(now));
        if stale {
            self.entries.remove(key);
        }
        stale
    }

    // == Remove ==
    /// Removes `key`. Returns false if it was absent.
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    // == Clear ==
    /// Removes every entry. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.order.clear();
        count
    }

    // == Purge Expired ==
    /// Removes all entries stale at `now`. Returns the number removed.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, slot| !slot.entry.is_expired_at(now));
        self.compact();
        before - self.entries.len()
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry stored under `key`, stale or not.
    #[allow(dead_code)]
    pub fn entry(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key).map(|slot| &slot.entry)
    }

    #[cfg(test)]
    pub(crate) fn order_len(&self) -> usize {
        self.order.len()
    }
}

fn is_live(entries: &HashMap<String, Slot>, stamp: &CreationStamp) -> bool {
    entries
        .get(&stamp.key)
        .is_some_and(|slot| slot.seq == stamp.seq)
}
