//! Background job: sweep expired entries out of the per-session query cache.
//!
//! Reads already skip stale entries, so this only bounds memory for sessions
//! that never come back.

use std::time::Duration;
use tokio::time;

use crate::cache::QueryCache;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn the background sweep task. Call this once at startup.
pub fn spawn(cache: QueryCache) {
    tokio::spawn(async move {
        let mut interval = time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = cache.evict_expired();
            if removed > 0 {
                tracing::debug!(
                    removed,
                    sessions = cache.session_count(),
                    "evicted expired query cache entries"
                );
            }
        }
    });
}
