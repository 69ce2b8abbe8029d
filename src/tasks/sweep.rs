//! Expiry Sweep Task
//!
//! Background task that periodically removes expired in-process entries.
//! Lazy expiry only reclaims keys that are read again; this task reclaims the
//! ones written once and never looked up.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::MemoryState;

/// Spawns the sweep loop for one store on `runtime`.
///
/// The loop wakes every `interval`, takes the exclusive lock and purges
/// stale entries. It exits as soon as `token` is cancelled, including while
/// waiting for the next tick.
///
/// # Example
/// ```ignore
/// let token = CancellationToken::new();
/// let handle = spawn_sweep_task(
///     &Handle::current(),
///     state.clone(),
///     Duration::from_secs(60),
///     token.clone(),
/// );
/// // Later, on close:
/// token.cancel();
/// ```
pub fn spawn_sweep_task(
    runtime: &Handle,
    state: Arc<MemoryState>,
    interval: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        info!("Starting expiry sweep with interval of {:?}", interval);

        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let removed = state.sweep().await;

            if removed > 0 {
                info!("Expiry sweep: removed {} expired entries", removed);
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }

        info!("Expiry sweep stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn state_with(key: &str, ttl: Duration) -> Arc<MemoryState> {
        let state = Arc::new(MemoryState::new(100));
        state.insert(key, b"value".to_vec(), ttl).await;
        state
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_entries() {
        let state = state_with("expire_soon", Duration::from_millis(30)).await;
        let token = CancellationToken::new();

        let handle = spawn_sweep_task(
            &Handle::current(),
            state.clone(),
            Duration::from_millis(50),
            token.clone(),
        );

        tokio::time::sleep(Duration::from_millis(200)).await;

        // Removed without any read touching the key
        assert_eq!(state.len().await, 0);
        assert!(state.stats.snapshot(0).last_sweep_at.is_some());

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_sweep_preserves_valid_entries() {
        let state = state_with("long_lived", Duration::from_secs(3600)).await;
        let token = CancellationToken::new();

        let handle = spawn_sweep_task(
            &Handle::current(),
            state.clone(),
            Duration::from_millis(20),
            token.clone(),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(state.len().await, 1);

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_sweep_stops_on_cancel_before_first_tick() {
        let state = Arc::new(MemoryState::new(0));
        let token = CancellationToken::new();

        let handle = spawn_sweep_task(
            &Handle::current(),
            state,
            Duration::from_secs(3600),
            token.clone(),
        );
        token.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweep should exit promptly after cancellation")
            .unwrap();
    }
}
