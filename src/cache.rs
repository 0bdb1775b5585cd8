use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Entry stored in a session partition with an expiry timestamp.
#[derive(Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// One session's cached queries plus its invalidation generation.
#[derive(Default)]
struct Partition {
    generation: u64,
    entries: HashMap<String, CacheEntry>,
}

/// Query results cached per session (identity subject).
///
/// One instance lives in application state. Partitions are keyed by session so
/// a caller only ever reads back what was cached for them. Entries are checked
/// on read and evicted lazily; `evict_expired()` sweeps everything.
///
/// Writers capture [`QueryCache::generation`] before loading and pass it to
/// [`QueryCache::set`]; a result loaded before an invalidation is dropped.
/// Partitions that were ever invalidated keep their generation for the life
/// of the process.
#[derive(Clone)]
pub struct QueryCache {
    sessions: Arc<DashMap<String, Partition>>,
    ttl: Duration,
}

impl QueryCache {
    /// A zero `ttl` disables caching.
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub fn get<T: DeserializeOwned>(&self, session: &str, key: &str) -> Option<T> {
        let mut partition = self.sessions.get_mut(session)?;
        let fresh = partition
            .entries
            .get(key)
            .map(|entry| Instant::now() < entry.expires_at)?;
        if !fresh {
            // expired: drop it now rather than waiting for the sweep
            partition.entries.remove(key);
            return None;
        }
        partition
            .entries
            .get(key)
            .and_then(|entry| serde_json::from_str(&entry.value).ok())
    }

    /// Current invalidation generation of a session.
    pub fn generation(&self, session: &str) -> u64 {
        self.sessions
            .get(session)
            .map(|partition| partition.generation)
            .unwrap_or(0)
    }

    /// Store `value` if the session has not been invalidated since
    /// `generation` was read. Returns whether the value was stored.
    pub fn set<T: Serialize>(
        &self,
        session: &str,
        key: &str,
        generation: u64,
        value: &T,
    ) -> anyhow::Result<bool> {
        if !self.is_enabled() {
            return Ok(false);
        }
        let json = serde_json::to_string(value)?;
        let mut partition = self.sessions.entry(session.to_string()).or_default();
        if partition.generation != generation {
            return Ok(false);
        }
        partition.entries.insert(
            key.to_string(),
            CacheEntry {
                value: json,
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(true)
    }

    /// Drop everything cached for one session (after a mutation).
    pub fn invalidate_session(&self, session: &str) {
        if !self.is_enabled() {
            return;
        }
        let mut partition = self.sessions.entry(session.to_string()).or_default();
        partition.generation += 1;
        partition.entries.clear();
    }

    /// Remove all expired entries, and partitions left empty that were never
    /// invalidated. Returns entries removed.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.sessions.retain(|_, partition| {
            let before = partition.entries.len();
            partition.entries.retain(|_, e| e.expires_at > now);
            removed += before - partition.entries.len();
            !partition.entries.is_empty() || partition.generation > 0
        });
        removed
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sessions_are_isolated() {
        let cache = QueryCache::new(Duration::from_secs(30));
        cache.set("alice", "pats.list", 0, &vec!["a-token"]).unwrap();

        assert_eq!(
            cache.get::<Vec<String>>("alice", "pats.list"),
            Some(vec!["a-token".to_string()])
        );
        assert_eq!(cache.get::<Vec<String>>("bob", "pats.list"), None);
    }

    #[test]
    fn test_invalidate_only_touches_one_session() {
        let cache = QueryCache::new(Duration::from_secs(30));
        cache.set("alice", "pats.list", 0, &1u32).unwrap();
        cache.set("bob", "pats.list", 0, &2u32).unwrap();

        cache.invalidate_session("alice");
        assert_eq!(cache.get::<u32>("alice", "pats.list"), None);
        assert_eq!(cache.get::<u32>("bob", "pats.list"), Some(2));
    }

    #[test]
    fn test_expired_entries_are_not_served() {
        let cache = QueryCache::new(Duration::from_millis(1));
        cache.set("alice", "pats.list", 0, &1u32).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get::<u32>("alice", "pats.list"), None);
    }

    #[test]
    fn test_evict_expired_drops_empty_sessions() {
        let cache = QueryCache::new(Duration::from_millis(1));
        cache.set("alice", "a", 0, &1u32).unwrap();
        cache.set("bob", "b", 0, &2u32).unwrap();
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(cache.evict_expired(), 2);
        assert_eq!(cache.session_count(), 0);
    }

    #[test]
    fn test_zero_ttl_disables() {
        let cache = QueryCache::new(Duration::ZERO);
        assert!(!cache.is_enabled());
        cache.set("alice", "pats.list", 0, &1u32).unwrap();
        assert_eq!(cache.get::<u32>("alice", "pats.list"), None);
        assert_eq!(cache.session_count(), 0);
    }

    #[test]
    fn test_write_loaded_before_invalidation_is_dropped() {
        let cache = QueryCache::new(Duration::from_secs(30));
        let generation = cache.generation("alice");

        // a mutation lands while the load is still in flight
        cache.invalidate_session("alice");

        let stored = cache
            .set("alice", "pats.list", generation, &vec!["deleted"])
            .unwrap();
        assert!(!stored);
        assert_eq!(cache.get::<Vec<String>>("alice", "pats.list"), None);

        let generation = cache.generation("alice");
        assert!(cache.set("alice", "pats.list", generation, &vec!["fresh"]).unwrap());
        assert_eq!(
            cache.get::<Vec<String>>("alice", "pats.list"),
            Some(vec!["fresh".to_string()])
        );
    }

    #[test]
    fn test_sweep_keeps_invalidated_generation() {
        let cache = QueryCache::new(Duration::from_secs(30));
        let generation = cache.generation("alice");
        cache.invalidate_session("alice");

        cache.evict_expired();
        assert_eq!(cache.generation("alice"), 1);
        assert!(!cache.set("alice", "pats.list", generation, &1u32).unwrap());
    }
}
