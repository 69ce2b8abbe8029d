//! Cache Module
//!
//! The [`Store`] contract and its two backends: an in-process store with
//! lazy expiry, background sweep and oldest-first eviction, and a remote
//! store over Redis.

mod entry;
mod index;
mod memory;
mod order;
mod remote;
mod stats;
mod store;


use std::sync::Arc;

use tracing::info;

use crate::config::{Backend, Config};
use crate::error::Result;

// Re-export public types
pub use entry::CacheEntry;
pub use memory::{MemoryState, MemoryStore};
pub use remote::{KvClient, RedisClient, RemoteStore};
pub use stats::CacheStats;
pub use store::{Store, TtlPolicy};

// == Connect ==
/// Builds the backend selected by `config.backend`.
///
pub async fn connect(config: &Config) -> Result<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match config.backend {
        Backend::Memory => Arc::new(MemoryStore::new(&config.store)?),
        Backend::Remote => Arc::new(RemoteStore::connect(&config.remote, &config.store).await?),
    };
    info!("Using {} cache backend", store.backend_name());
    Ok(store)
}
