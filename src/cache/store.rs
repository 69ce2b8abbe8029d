//! Store Contract Module
//!
//! The capability every backend provides, and the TTL resolution they share.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::StoreConfig;
use crate::error::Result;

// == Store ==
/// Backend-agnostic key/value cache over opaque byte payloads.
///
/// A miss, whether the key was never set or has expired, is `Ok(None)`.
/// `Err` always means the backend itself failed and must never be read as
/// a miss.
#[async_trait]
pub trait Store: Send + Sync {
    /// Returns the fresh value for `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores `value` under `key`. A zero `ttl` selects the default TTL and
    /// anything above the configured ceiling is clamped to it.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Removes `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Removes every entry of this store.
    async fn clear(&self) -> Result<()>;

    /// Releases background tasks and connections. Idempotent.
    async fn close(&self) -> Result<()>;

    /// Short name of the backend, for logs.
    fn backend_name(&self) -> &'static str;
}

// == TTL Policy ==
/// Resolves caller-requested TTLs against the store defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub default_ttl: Duration,
    pub max_ttl: Duration,
}

impl TtlPolicy {
    pub fn new(default_ttl: Duration, max_ttl: Duration) -> Self {
        Self {
            default_ttl,
            max_ttl,
        }
    }

    /// Zero selects the default; the result never exceeds `max_ttl`.
    pub fn resolve(&self, requested: Duration) -> Duration {
        let ttl = if requested.is_zero() {
            self.default_ttl
        } else {
            requested
        };
        ttl.min(self.max_ttl)
    }
}

impl From<&StoreConfig> for TtlPolicy {
    fn from(config: &StoreConfig) -> Self {
        Self::new(config.default_ttl, config.max_ttl)
    }
}
