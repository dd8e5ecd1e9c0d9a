//! TTL-bounded staging pool for outbound payload objects
//!
//! Entries are disposable staging data, not the source of truth for
//! in-flight messages, so losing them early is acceptable. Insertion
//! never blocks and never evicts on the caller's path; all eviction is
//! the memory optimizer's background responsibility.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;

/// Default time-to-live stamped on every entry: 30 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Clone, Debug)]
struct PooledObject {
    value: Value,
    expires_at: Instant,
}

pub struct ObjectPool {
    entries: DashMap<String, PooledObject>,
    ttl: Duration,
}

impl ObjectPool {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Stage one object under `key`, stamped to expire at `now + TTL`.
    pub fn insert(&self, key: String, value: Value) {
        self.entries.insert(
            key,
            PooledObject {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry whose expiry has passed. Returns the number of
    /// evicted entries.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| now <= entry.expires_at);
        // producers may insert concurrently, so the delta can only be a floor
        before.saturating_sub(self.entries.len())
    }

    /// Evict roughly half the entries in iteration order.
    ///
    /// No recency or frequency ranking; bounded cost is the point.
    /// Returns the number of evicted entries.
    pub fn shrink_by_half(&self) -> usize {
        let remove_count = self.entries.len() / 2;
        let victims: Vec<String> = self
            .entries
            .iter()
            .take(remove_count)
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for key in victims {
            if self.entries.remove(&key).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Drop everything unconditionally.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for ObjectPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expired_entries_are_gone_after_a_cleanup_pass() {
        let pool = ObjectPool::with_ttl(Duration::from_millis(0));
        pool.insert("stale".to_string(), json!({"n": 1}));

        std::thread::sleep(Duration::from_millis(5));
        let evicted = pool.evict_expired();

        assert_eq!(evicted, 1);
        assert!(!pool.contains("stale"));
    }

    #[test]
    fn live_entries_survive_ttl_eviction() {
        let pool = ObjectPool::new();
        pool.insert("fresh".to_string(), json!({"n": 1}));

        assert_eq!(pool.evict_expired(), 0);
        assert_eq!(pool.get("fresh"), Some(json!({"n": 1})));
    }

    #[test]
    fn shrink_halves_the_pool_and_leaves_no_orphans() {
        let pool = ObjectPool::new();
        for i in 0..1200 {
            pool.insert(format!("event_Test_{i}"), json!(i));
        }

        let removed = pool.shrink_by_half();
        assert_eq!(removed, 600);
        assert_eq!(pool.len(), 600);

        // every surviving key still resolves to a full entry
        let surviving: Vec<String> = pool.entries.iter().map(|e| e.key().clone()).collect();
        for key in surviving {
            assert!(pool.get(&key).is_some());
        }
    }

    #[test]
    fn clear_empties_everything() {
        let pool = ObjectPool::new();
        for i in 0..10 {
            pool.insert(format!("k{i}"), json!(i));
        }
        pool.clear();
        assert!(pool.is_empty());
    }
}
