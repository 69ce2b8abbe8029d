//! In-Process Store Module
//!
//! Shared-lock reads, exclusive-lock writes, lazy expiry on read, a
//! background sweep, and oldest-created eviction once `max_size` is reached.
//!
//! Every `set` runs under the exclusive lock, so the capacity check, the
//! eviction and the insert are a single step: the entry count never exceeds
//! `max_size`, even transiently.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tokio::runtime::Handle;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::index::{EntryIndex, Lookup};
use crate::cache::stats::{CacheStats, StatsRecorder};
use crate::cache::store::{Store, TtlPolicy};
use crate::config::StoreConfig;
use crate::error::{CacheError, Result};
use crate::tasks::spawn_sweep_task;

// == Memory State ==
/// The index and counters shared between a store and its sweep task.
#[derive(Debug)]
pub struct MemoryState {
    index: RwLock<EntryIndex>,
    pub(crate) stats: StatsRecorder,
}

impl MemoryState {
    pub fn new(max_size: usize) -> Self {
        Self {
            index: RwLock::new(EntryIndex::new(max_size)),
            stats: StatsRecorder::new(),
        }
    }

    /// Inserts with an already-resolved TTL. Returns the evicted key, if any.
    pub async fn insert(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Option<String> {
        let evicted = {
            let mut index = self.index.write().await;
            index.insert(key, value, ttl, Instant::now())
        };
        if let Some(victim) = &evicted {
            self.stats.record_eviction();
            debug!("Evicted oldest entry '{}' to make room for '{}'", victim, key);
        }
        evicted
    }

    /// Returns the fresh value for `key`, lazily deleting a stale one.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let lookup = {
            let index = self.index.read().await;
            index.lookup(key, Instant::now())
        };

        match lookup {
            Lookup::Hit(value) => {
                self.stats.record_hit();
                Some(value)
            }
            Lookup::Stale(seq) => {
                let removed = {
                    let mut index = self.index.write().await;
                    index.remove_if_stale(key, seq, Instant::now())
                };
                if removed {
                    self.stats.record_expirations(1);
                }
                self.stats.record_miss();
                None
            }
            Lookup::Miss => {
                self.stats.record_miss();
                None
            }
        }
    }

    pub async fn remove(&self, key: &str) -> bool {
        self.index.write().await.remove(key)
    }

    pub async fn clear(&self) -> usize {
        self.index.write().await.clear()
    }

    // == Sweep ==
    /// Purges every stale entry. Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let removed = {
            let mut index = self.index.write().await;
            index.purge_expired(Instant::now())
        };
        self.stats.record_expirations(removed);
        self.stats.record_sweep(Utc::now());
        removed
    }

    pub async fn len(&self) -> usize {
        self.index.read().await.len()
    }
}

// == Memory Store ==
/// In-process [`Store`] implementation.
///
/// Construction spawns the sweep task on a tokio runtime. Operations after
/// [`Store::close`] remain safe but the store no longer sweeps.
#[derive(Debug)]
pub struct MemoryStore {
    state: Arc<MemoryState>,
    ttl: TtlPolicy,
    token: CancellationToken,
    closed: AtomicBool,
    sweep_handle: Mutex<Option<JoinHandle<()>>>,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates the store and starts its sweep task on the current runtime.
    ///
    /// Fails with [`CacheError::Config`] when called outside a tokio runtime.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            CacheError::Config(format!("in-process store needs a tokio runtime: {}", e))
        })?;
        Ok(Self::with_runtime(config, &runtime))
    }

    /// Creates the store with its sweep task spawned on `runtime`.
    pub fn with_runtime(config: &StoreConfig, runtime: &Handle) -> Self {
        let state = Arc::new(MemoryState::new(config.max_size));
        let token = CancellationToken::new();
        let handle = spawn_sweep_task(
            runtime,
            state.clone(),
            config.effective_sweep_interval(),
            token.clone(),
        );

        info!(
            "Memory store initialized: max_size={}, default_ttl={:?}, max_ttl={:?}",
            config.max_size, config.default_ttl, config.max_ttl
        );

        Self {
            state,
            ttl: TtlPolicy::from(config),
            token,
            closed: AtomicBool::new(false),
            sweep_handle: Mutex::new(Some(handle)),
        }
    }

    // == Stats ==
    /// Returns current store statistics.
    pub async fn stats(&self) -> CacheStats {
        self.state.stats.snapshot(self.state.len().await)
    }

    /// Returns the current number of entries, stale ones included until
    /// they are swept or read.
    pub async fn len(&self) -> usize {
        self.state.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Returns true once [`Store::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.state.get(key).await)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let ttl = self.ttl.resolve(ttl);
        self.state.insert(key, value, ttl).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.state.remove(key).await;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let removed = self.state.clear().await;
        debug!("Memory store cleared {} entries", removed);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.token.cancel();
        let handle = self
            .sweep_handle
            .lock()
            .ok()
            .and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            // A cancelled or panicked sweep has nothing left to release
            let _ = handle.await;
        }

        let dropped = self.state.clear().await;
        info!("Memory store closed, released {} entries", dropped);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
