//! Expiry Sweep Task
//!
//! Background task that periodically removes expired cache entries, so
//! stale data does not linger until its next read.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::Cache;

/// Spawns a task that calls [`Cache::cleanup_expired`] every
/// `interval_secs` seconds.
///
/// Abort the returned handle to stop it during shutdown.
pub fn spawn_sweep_task(cache: Cache, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting expiry sweep task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.cleanup_expired().await;
            if removed > 0 {
                info!("Expiry sweep: removed {} expired entries", removed);
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }
    })
}
