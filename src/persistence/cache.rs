//! Time-bounded read cache
//!
//! Entries expire a fixed window after they were written or refreshed from
//! storage. Reading an entry does not extend it.
//!
//! Every write, invalidation and clear bumps a generation counter. A value
//! loaded from storage is only cached if no such change happened while the
//! load was in flight, so a slow read never overwrites a newer write.

use std::collections::HashMap;

use serde::Serialize;

/// A cached value
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub data: serde_json::Value,
    /// When the entry was written or loaded (epoch millis)
    pub timestamp: u64,
    pub is_valid: bool,
}

impl CacheEntry {
    pub fn new(data: serde_json::Value, timestamp: u64) -> Self {
        Self {
            data,
            timestamp,
            is_valid: true,
        }
    }

    pub fn is_fresh(&self, now: u64, ttl_millis: u64) -> bool {
        self.is_valid && now.saturating_sub(self.timestamp) < ttl_millis
    }
}

/// Snapshot of cache contents and effectiveness
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    /// Sorted
    pub keys: Vec<String>,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache, 0 when there were none
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug)]
pub(crate) struct ReadCache {
    entries: HashMap<String, CacheEntry>,
    ttl_millis: u64,
    generation: u64,
    hits: u64,
    misses: u64,
}

impl ReadCache {
    pub(crate) fn new(ttl_millis: u64) -> Self {
        Self {
            entries: HashMap::new(),
            ttl_millis,
            generation: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Fresh cached value for `key`, counting the lookup
    pub(crate) fn lookup(&mut self, key: &str, now: u64) -> Option<serde_json::Value> {
        match self.entries.get(key) {
            Some(entry) if entry.is_fresh(now, self.ttl_millis) => {
                self.hits += 1;
                Some(entry.data.clone())
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    /// Current generation, taken before a storage read
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Cache a value that was just written
    pub(crate) fn insert(&mut self, key: &str, data: serde_json::Value, now: u64) {
        self.generation += 1;
        self.entries.insert(key.to_string(), CacheEntry::new(data, now));
    }

    /// Cache a value read from storage, unless the cache changed since
    /// `seen` was taken. Returns whether it was cached.
    pub(crate) fn fill(
        &mut self,
        key: &str,
        data: serde_json::Value,
        now: u64,
        seen: u64,
    ) -> bool {
        if self.generation != seen {
            return false;
        }
        self.entries.insert(key.to_string(), CacheEntry::new(data, now));
        true
    }

    pub(crate) fn invalidate(&mut self, key: &str) {
        self.generation += 1;
        self.entries.remove(key);
    }

    pub(crate) fn clear(&mut self) {
        self.generation += 1;
        self.entries.clear();
    }

    pub(crate) fn reset_counters(&mut self) {
        self.hits = 0;
        self.misses = 0;
    }

    pub(crate) fn stats(&self) -> CacheStats {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        CacheStats {
            size: self.entries.len(),
            keys,
            hits: self.hits,
            misses: self.misses,
        }
    }
}
