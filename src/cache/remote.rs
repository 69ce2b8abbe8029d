//! Remote Store Module
//!
//! Adapts an external key/value service to the [`Store`] contract. Expiry
//! and eviction belong to the server; this side only resolves the TTL,
//! bounds every call with a deadline, and owns the connection handle.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::cache::store::{Store, TtlPolicy};
use crate::config::{RemoteConfig, StoreConfig};
use crate::error::{CacheError, Result};

// == KV Client ==
/// The verbs the remote store needs from a network client.
///
/// Implementations must be safe to call concurrently; the store adds no
/// locking around them.
#[async_trait]
pub trait KvClient: Send + Sync {
    /// `None` when the server has no value for `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Writes `value` with a server-side expiry of `ttl`.
    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Drops every key of the selected database.
    async fn flush_all(&self) -> Result<()>;
}

// == Redis Client ==
/// [`KvClient`] over a multiplexed, auto-reconnecting Redis connection.
#[derive(Clone)]
pub struct RedisClient {
    conn: ConnectionManager,
}

impl RedisClient {
    /// Opens a connection to the server described by `config`.
    pub async fn connect(config: &RemoteConfig) -> Result<Self> {
        let client = redis::Client::open(config.url()?)?;
        let conn = timeout(config.op_timeout, client.get_connection_manager())
            .await
            .map_err(|_| CacheError::Timeout(config.op_timeout))??;

        info!(
            "Redis connection established: addr={}, db={}",
            config.address, config.database
        );
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvClient for RedisClient {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        // PX rejects 0, so sub-millisecond TTLs round up
        let millis = ttl.as_millis().max(1) as u64;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(millis)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(())
    }

    async fn flush_all(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await?;
        Ok(())
    }
}

// == Remote Store ==
/// [`Store`] backed by a [`KvClient`].
pub struct RemoteStore<C> {
    client: RwLock<Option<Arc<C>>>,
    ttl: TtlPolicy,
    op_timeout: Duration,
}

impl RemoteStore<RedisClient> {
    /// Connects to Redis and wraps the connection in a store.
    pub async fn connect(remote: &RemoteConfig, store: &StoreConfig) -> Result<Self> {
        let client = RedisClient::connect(remote).await?;
        Ok(Self::new(client, TtlPolicy::from(store), remote.op_timeout))
    }
}

impl<C: KvClient> RemoteStore<C> {
    // == Constructor ==
    pub fn new(client: C, ttl: TtlPolicy, op_timeout: Duration) -> Self {
        Self {
            client: RwLock::new(Some(Arc::new(client))),
            ttl,
            op_timeout,
        }
    }

    async fn client(&self) -> Result<Arc<C>> {
        self.client.read().await.clone().ok_or(CacheError::Closed)
    }

    /// Runs one client call under the store deadline.
    async fn bounded<T, F>(&self, verb: &str, call: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        match timeout(self.op_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                warn!("Remote {} failed: {}", verb, err);
                Err(err)
            }
            Err(_) => {
                warn!("Remote {} timed out after {:?}", verb, self.op_timeout);
                Err(CacheError::Timeout(self.op_timeout))
            }
        }
    }
}

#[async_trait]
impl<C: KvClient + 'static> Store for RemoteStore<C> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let client = self.client().await?;
        self.bounded("GET", client.get(key)).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let client = self.client().await?;
        let ttl = self.ttl.resolve(ttl);
        self.bounded("SET", client.set_with_ttl(key, value, ttl)).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let client = self.client().await?;
        self.bounded("DEL", client.delete(key)).await
    }

    async fn clear(&self) -> Result<()> {
        let client = self.client().await?;
        self.bounded("FLUSHDB", client.flush_all()).await
    }

    async fn close(&self) -> Result<()> {
        if self.client.write().await.take().is_some() {
            info!("Remote store closed, connection released");
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Instant;

    /// In-memory stand-in for a Redis server, recording the TTL of each SET.
    #[derive(Default)]
    struct FakeClient {
        data: Mutex<HashMap<String, (Vec<u8>, Duration)>>,
        failing: AtomicBool,
        delay: Option<Duration>,
    }

    impl FakeClient {
        async fn maybe_fail(&self) -> Result<()> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(CacheError::Transport("connection refused".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl KvClient for Arc<FakeClient> {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            self.maybe_fail().await?;
            Ok(self.data.lock().unwrap().get(key).map(|(v, _)| v.clone()))
        }

        async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
            self.maybe_fail().await?;
            self.data.lock().unwrap().insert(key.to_string(), (value, ttl));
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<()> {
            self.maybe_fail().await?;
            self.data.lock().unwrap().remove(key);
            Ok(())
        }

        async fn flush_all(&self) -> Result<()> {
            self.maybe_fail().await?;
            self.data.lock().unwrap().clear();
            Ok(())
        }
    }

    fn store_over(fake: &Arc<FakeClient>) -> RemoteStore<Arc<FakeClient>> {
        RemoteStore::new(
            fake.clone(),
            TtlPolicy::new(Duration::from_secs(2), Duration::from_secs(30)),
            Duration::from_millis(100),
        )
    }

    fn recorded_ttl(fake: &FakeClient, key: &str) -> Duration {
        fake.data.lock().unwrap()[key].1
    }

    #[tokio::test]
    async fn test_absent_key_is_miss_not_error() {
        let fake = Arc::new(FakeClient::default());
        let store = store_over(&fake);

        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_and_get_round_trip() {
        let fake = Arc::new(FakeClient::default());
        let store = store_over(&fake);

        store.set("k", b"payload".to_vec(), Duration::from_secs(5)).await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some(b"payload".to_vec()));
        assert_eq!(recorded_ttl(&fake, "k"), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_set_resolves_ttl_before_delegating() {
        let fake = Arc::new(FakeClient::default());
        let store = store_over(&fake);

        store.set("default", vec![1], Duration::ZERO).await.unwrap();
        store.set("clamped", vec![1], Duration::from_secs(3600)).await.unwrap();

        assert_eq!(recorded_ttl(&fake, "default"), Duration::from_secs(2));
        assert_eq!(recorded_ttl(&fake, "clamped"), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let fake = Arc::new(FakeClient::default());
        let store = store_over(&fake);

        store.set("a", vec![1], Duration::ZERO).await.unwrap();
        store.set("b", vec![2], Duration::ZERO).await.unwrap();

        store.delete("a").await.unwrap();
        store.delete("never-set").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);

        store.clear().await.unwrap();
        assert_eq!(store.get("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_transport_failure_is_error_not_miss() {
        let fake = Arc::new(FakeClient::default());
        let store = store_over(&fake);
        fake.failing.store(true, Ordering::SeqCst);

        let result = store.get("k").await;
        assert!(matches!(result, Err(CacheError::Transport(_))));
        assert!(store.set("k", vec![1], Duration::ZERO).await.is_err());
        assert!(store.clear().await.is_err());
    }

    #[tokio::test]
    async fn test_slow_backend_times_out_promptly() {
        let fake = Arc::new(FakeClient {
            delay: Some(Duration::from_secs(5)),
            ..FakeClient::default()
        });
        let store = store_over(&fake);

        let started = Instant::now();
        let result = store.get("k").await;

        assert!(matches!(result, Err(CacheError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_close_releases_connection() {
        let fake = Arc::new(FakeClient::default());
        let store = store_over(&fake);

        store.close().await.unwrap();
        store.close().await.unwrap();

        assert!(matches!(store.get("k").await, Err(CacheError::Closed)));
        assert!(matches!(
            store.set("k", vec![1], Duration::ZERO).await,
            Err(CacheError::Closed)
        ));
        // Only the test's own handle is left
        assert_eq!(Arc::strong_count(&fake), 1);
    }

    #[tokio::test]
    #[ignore] // Requires a Redis server on 127.0.0.1:6379
    async fn test_redis_round_trip() {
        let store = RemoteStore::connect(&RemoteConfig::default(), &StoreConfig::default())
            .await
            .unwrap();

        store.set("query-cache:test", b"v".to_vec(), Duration::ZERO).await.unwrap();
        assert_eq!(
            store.get("query-cache:test").await.unwrap(),
            Some(b"v".to_vec())
        );
        store.delete("query-cache:test").await.unwrap();
        store.close().await.unwrap();
    }
}
