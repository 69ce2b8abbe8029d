//! Cache Entry Module
//!
//! Defines the unit of cached data. Freshness is derived from the creation
//! instant and the TTL, never from a stored deadline.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A single cached payload with its creation time and effective TTL.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    key: String,
    value: Vec<u8>,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with the current instant.
    ///
    /// `ttl` is the already-resolved TTL; stores apply their default and
    /// ceiling before constructing the entry.
    pub fn new(key: impl Into<String>, value: Vec<u8>, ttl: Duration) -> Self {
        Self::created_at(key, value, ttl, Instant::now())
    }

    /// Creates an entry with an explicit creation instant.
    pub fn created_at(
        key: impl Into<String>,
        value: Vec<u8>,
        ttl: Duration,
        created_at: Instant,
    ) -> Self {
        Self {
            key: key.into(),
            value,
            created_at,
            ttl,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn creation_instant(&self) -> Instant {
        self.created_at
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // == Is Expired ==
    /// Checks whether the entry is stale at `now`.
    ///
    /// An entry is fresh while `now - created_at <= ttl`, so it becomes
    /// stale strictly after the TTL has fully elapsed. An instant earlier
    /// than the creation time counts as zero elapsed.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.ttl
    }

    /// Checks whether the entry is stale right now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Returns the remaining fresh time at `now`, zero once stale.
    pub fn ttl_remaining_at(&self, now: Instant) -> Duration {
        self.ttl
            .saturating_sub(now.saturating_duration_since(self.created_at))
    }
}
