//! Expired Entry Cleanup Task
//!
//! Background task that periodically purges expired cache entries so stale
//! query results do not hold memory until their next lookup.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;

/// Spawns a task that runs `cleanup_expired` on `cache` every `interval`.
///
/// The returned handle is aborted on shutdown.
pub fn spawn_cleanup_task(cache: Arc<RwLock<CacheStore>>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting cache cleanup task with interval of {}ms",
            interval.as_millis()
        );

        let mut ticker = tokio::time::interval(interval);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let removed = cache.write().await.cleanup_expired();

            if removed > 0 {
                info!("Cache cleanup: removed {} expired entries", removed);
            } else {
                debug!("Cache cleanup: no expired entries found");
            }
        }
    })
}
