//! Housekeeping Task
//!
//! Background task that periodically drops expired cache entries and idle
//! admission windows. Lookups already expire lazily, so this only bounds
//! memory; it never changes what a caller observes.

use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::governor::Governor;

/// Spawns a background task that periodically sweeps the governor's state.
///
/// Each run takes the cache write lock, then the limiter write lock, one at
/// a time.
///
/// # Arguments
/// * `governor` - Shared governance context
/// * `interval` - Time between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
///
/// # Example
/// ```ignore
/// let governor = Governor::<serde_json::Value>::from_config(&config)?;
/// let handle = spawn_housekeeping_task(governor.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_housekeeping_task<V>(governor: Governor<V>, interval: Duration) -> JoinHandle<()>
where
    V: Clone + Serialize + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!("Starting housekeeping task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let expired = governor.cache().write().await.cleanup_expired();
            let idle = governor.limiter().write().await.cleanup();

            if expired > 0 || idle > 0 {
                info!(
                    "Housekeeping: removed {} expired entries and {} idle admission windows",
                    expired, idle
                );
            } else {
                debug!("Housekeeping: nothing to remove");
            }
        }
    })
}
