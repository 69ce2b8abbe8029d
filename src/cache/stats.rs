//! Cache Statistics Module
//!
//! Tracks in-process store metrics: hits, misses, evictions and expirations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

// == Cache Stats ==
/// Point-in-time snapshot of store metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of lookups that returned a fresh value
    pub hits: u64,
    /// Number of lookups that found nothing or a stale entry
    pub misses: u64,
    /// Number of entries removed to respect the size bound
    pub evictions: u64,
    /// Number of stale entries removed, lazily or by the sweep
    pub expirations: u64,
    /// Current number of entries in the store
    pub total_entries: usize,
    /// Completion time of the most recent sweep pass
    pub last_sweep_at: Option<DateTime<Utc>>,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Stats Recorder ==
/// Lock-free counters updated from both shared and exclusive lock paths.
#[derive(Debug, Default)]
pub struct StatsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
    last_sweep_at: Mutex<Option<DateTime<Utc>>>,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expirations(&self, count: usize) {
        self.expirations.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_sweep(&self, at: DateTime<Utc>) {
        if let Ok(mut last) = self.last_sweep_at.lock() {
            *last = Some(at);
        }
    }

    // == Snapshot ==
    /// Builds a snapshot, with the entry count supplied by the caller.
    pub fn snapshot(&self, total_entries: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            total_entries,
            last_sweep_at: self.last_sweep_at.lock().ok().and_then(|last| *last),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_starts_at_zero() {
        let stats = StatsRecorder::new().snapshot(0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.expirations, 0);
        assert!(stats.last_sweep_at.is_none());
    }

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let recorder = StatsRecorder::new();
        recorder.record_hit();
        recorder.record_hit();
        recorder.record_hit();
        recorder.record_miss();
        assert_eq!(recorder.snapshot(1).hit_rate(), 0.75);
    }

    #[test]
    fn test_record_evictions_and_expirations() {
        let recorder = StatsRecorder::new();
        recorder.record_eviction();
        recorder.record_eviction();
        recorder.record_expirations(3);

        let stats = recorder.snapshot(42);
        assert_eq!(stats.evictions, 2);
        assert_eq!(stats.expirations, 3);
        assert_eq!(stats.total_entries, 42);
    }

    #[test]
    fn test_record_sweep_time() {
        let recorder = StatsRecorder::new();
        let now = Utc::now();
        recorder.record_sweep(now);
        assert_eq!(recorder.snapshot(0).last_sweep_at, Some(now));
    }

    #[test]
    fn test_stats_serialize() {
        let json = serde_json::to_value(StatsRecorder::new().snapshot(7)).unwrap();
        assert_eq!(json["total_entries"], 7);
        assert!(json["last_sweep_at"].is_null());
    }
}
