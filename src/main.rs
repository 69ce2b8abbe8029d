//! Query Cache demo
//!
//! Wires the configured backend in front of a small in-memory "users table"
//! and walks through a cold read, a warm read, a write and a re-read.

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use query_cache::{connect, fingerprint, Config, QueryAdapter};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
    role: String,
}

/// Source of truth standing in for the relational database.
struct UserRepository {
    rows: RwLock<Vec<User>>,
    source_reads: AtomicUsize,
    cache: QueryAdapter,
}

impl UserRepository {
    fn new(cache: QueryAdapter, rows: Vec<User>) -> Self {
        Self {
            rows: RwLock::new(rows),
            source_reads: AtomicUsize::new(0),
            cache,
        }
    }

    async fn find_by_role(&self, role: &str) -> anyhow::Result<Vec<User>> {
        let key = fingerprint("SELECT * FROM users WHERE role = $1", &[role])?;

        self.cache
            .fetch_through(&key, || async move {
                self.source_reads.fetch_add(1, Ordering::Relaxed);
                let rows = self.rows.read().await;
                Ok::<_, anyhow::Error>(rows.iter().filter(|u| u.role == role).cloned().collect())
            })
            .await
    }

    async fn insert(&self, user: User) -> anyhow::Result<()> {
        self.rows.write().await.push(user);

        // Stale entries still age out by TTL if this fails
        if let Err(err) = self.cache.invalidate_all().await {
            warn!("Cache invalidation after write failed: {}", err);
        }
        Ok(())
    }

    fn source_reads(&self) -> usize {
        self.source_reads.load(Ordering::Relaxed)
    }
}

fn seed_users() -> Vec<User> {
    vec![
        User {
            id: 1,
            name: "alice".into(),
            role: "admin".into(),
        },
        User {
            id: 2,
            name: "bob".into(),
            role: "member".into(),
        },
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "query_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("loading cache configuration")?;
    info!(
        "Configuration loaded: backend={:?}, default_ttl={:?}, max_ttl={:?}, max_size={}",
        config.backend, config.store.default_ttl, config.store.max_ttl, config.store.max_size
    );

    let store = connect(&config).await.context("connecting cache backend")?;
    let repo = UserRepository::new(QueryAdapter::new(store.clone()), seed_users());

    let admins = repo.find_by_role("admin").await?;
    info!("Cold read: {} admins, source reads={}", admins.len(), repo.source_reads());

    let admins = repo.find_by_role("admin").await?;
    info!("Warm read: {} admins, source reads={}", admins.len(), repo.source_reads());

    repo.insert(User {
        id: 3,
        name: "carol".into(),
        role: "admin".into(),
    })
    .await?;

    let admins = repo.find_by_role("admin").await?;
    info!("Read after write: {} admins, source reads={}", admins.len(), repo.source_reads());

    store.close().await?;
    info!("Shutdown complete");
    Ok(())
}
