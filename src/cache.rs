use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

/// In-process key/value store with per-entry expiration.
///
/// Backed by `DashMap`, so concurrent top-level requests can read and write
/// without external locking; a write for a key always wins over a stale read
/// of the same key. Instances are created explicitly and handed to their
/// consumers rather than living in a process-wide global.
pub struct TtlCache<V: Clone> {
    entries: DashMap<String, (V, Instant)>,
    ttl: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub total_items: usize,
    pub active_items: usize,
    pub expired_items: usize,
    pub ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        TtlCache {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Returns the cached value if present and unexpired. Expired entries
    /// are removed on the way out.
    pub fn get(&self, key: &str) -> Option<V> {
        let hit = self.entries.get(key).and_then(|entry| {
            let (value, stored_at) = entry.value();
            if stored_at.elapsed() < self.ttl {
                Some(value.clone())
            } else {
                None
            }
        });

        match hit {
            Some(value) => {
                debug!("cache hit: {}", truncate_key(key));
                Some(value)
            }
            None => {
                // Drop the expired entry, if any.
                self.entries
                    .remove_if(key, |_, (_, stored_at)| stored_at.elapsed() >= self.ttl);
                None
            }
        }
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        debug!("cached: {}", truncate_key(&key));
        self.entries.insert(key, (value, Instant::now()));
    }

    /// Removes a key, reporting whether it existed.
    pub fn delete(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Removes every expired entry, returning how many were dropped.
    pub fn cleanup_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, (_, stored_at)| stored_at.elapsed() < self.ttl);
        before - self.entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        let total_items = self.entries.len();
        let expired_items = self
            .entries
            .iter()
            .filter(|entry| entry.value().1.elapsed() >= self.ttl)
            .count();
        CacheStats {
            total_items,
            active_items: total_items - expired_items,
            expired_items,
            ttl: self.ttl,
        }
    }
}

fn truncate_key(key: &str) -> &str {
    match key.char_indices().nth(50) {
        Some((idx, _)) => &key[..idx],
        None => key,
    }
}
