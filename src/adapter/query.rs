//! Query Adapter
//!
//! Loads and saves query results through a [`Store`], keeping cache errors
//! distinct from cache misses.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::Store;
use crate::error::Result;

// == Query Adapter ==
/// Caches query results as JSON payloads in a [`Store`].
///
/// The adapter never retries and never invalidates single keys: any write
/// clears the whole store through [`QueryAdapter::invalidate_all`].
#[derive(Clone)]
pub struct QueryAdapter {
    store: Arc<dyn Store>,
}

impl QueryAdapter {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    // == Load ==
    /// Hydrates `dest` from the cached result for `key`.
    ///
    /// Returns `Ok(false)` on a miss, leaving `dest` untouched; the caller
    /// runs the real query and then calls [`QueryAdapter::save`]. A payload
    /// that fails to decode is an error, not a miss.
    pub async fn load<T>(&self, key: &str, dest: &mut T) -> Result<bool>
    where
        T: DeserializeOwned,
    {
        match self.fetch(key).await? {
            Some(value) => {
                *dest = value;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn fetch<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let Some(payload) = self.store.get(key).await? else {
            debug!("Query cache miss: {}", key);
            return Ok(None);
        };
        let value = serde_json::from_slice(&payload)?;
        debug!("Query cache hit: {}", key);
        Ok(Some(value))
    }

    // == Save ==
    /// Caches `result` under `key` with the store's default TTL.
    ///
    /// Results that encode to `null`, an empty list or an empty map are not
    /// stored.
    pub async fn save<T>(&self, key: &str, result: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(result)?;
        if is_empty_result(&value) {
            debug!("Skipping cache save of empty result: {}", key);
            return Ok(());
        }

        let payload = serde_json::to_vec(&value)?;
        self.store.set(key, payload, Duration::ZERO).await
    }

    // == Invalidate All ==
    /// Drops every cached result. Called after any write.
    pub async fn invalidate_all(&self) -> Result<()> {
        debug!("Invalidating all cached query results");
        self.store.clear().await
    }

    // == Fetch Through ==
    /// Serves `key` from cache, or computes it from the source of truth.
    ///
    /// Cache failures never fail the query: a load error is logged and the
    /// result is computed without being saved, and a save error after a
    /// miss is logged and dropped. Errors from `compute` are returned as is.
    pub async fn fetch_through<T, E, F, Fut>(
        &self,
        key: &str,
        compute: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        match self.fetch::<T>(key).await {
            Ok(Some(cached)) => Ok(cached),
            Ok(None) => {
                let fresh = compute().await?;
                if let Err(err) = self.save(key, &fresh).await {
                    warn!("Query cache save failed for {}: {}", key, err);
                }
                Ok(fresh)
            }
            Err(err) => {
                warn!(
                    "Query cache unavailable for {}, reading source of truth: {}",
                    key, err
                );
                compute().await
            }
        }
    }
}

fn is_empty_result(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}
