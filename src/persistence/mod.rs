//! Score persistence
//!
//! Features:
//! - Typed JSON values over any `StorageBackend`
//! - Read-through cache with a fixed validity window
//! - Corrupt or unreadable data reads as absent instead of failing
//! - Best-effort multi-key clear that always drops the cache

pub mod cache;

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::platform::{Clock, StorageBackend};
use cache::ReadCache;
pub use cache::{CacheEntry, CacheStats};

/// Persisted keys. Saved data depends on these staying the same.
pub mod keys {
    pub const TOP_SCORES: &str = "@dino_dash_top_scores";
    pub const HIGHEST_SCORE: &str = "@dino_dash_highest_score";
    pub const SCORE_STATS: &str = "@dino_dash_score_stats";

    pub const ALL: [&str; 3] = [TOP_SCORES, HIGHEST_SCORE, SCORE_STATS];
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to serialize {key}: {source}")]
    Serialize {
        key: String,
        source: serde_json::Error,
    },
    #[error("storage I/O failed for {key}: {source}")]
    Io { key: String, source: io::Error },
    /// Some keys were deleted, these were not
    #[error("failed to clear {}", failed.join(", "))]
    PartialClear { failed: Vec<String> },
}

/// Key/value store for score data with an in-process read cache
///
/// The cache belongs to the store; nothing else reads or writes it.
pub struct ScoreStore<B> {
    backend: B,
    clock: Arc<dyn Clock>,
    cache: Mutex<ReadCache>,
}

impl<B: StorageBackend> ScoreStore<B> {
    pub fn new(backend: B, clock: Arc<dyn Clock>, cache_ttl_millis: u64) -> Self {
        Self {
            backend,
            clock,
            cache: Mutex::new(ReadCache::new(cache_ttl_millis)),
        }
    }

    /// Serialize and write `value`, then cache it
    pub async fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let data = serde_json::to_value(value).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        let json = data.to_string();
        log::debug!("Saving {} ({} bytes)", key, json.len());

        if let Err(source) = self.backend.write(key, &json).await {
            log::error!("Error saving {}: {}", key, source);
            return Err(StoreError::Io {
                key: key.to_string(),
                source,
            });
        }

        let now = self.clock.now_millis();
        self.lock_cache().insert(key, data, now);
        Ok(())
    }

    /// Cached value if fresh, otherwise read through to storage
    ///
    /// Missing, unreadable and malformed values all come back as `None`.
    /// Malformed values are never cached.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let now = self.clock.now_millis();
        let cached = self.lock_cache().lookup(key, now);
        if let Some(data) = cached {
            match serde_json::from_value(data) {
                Ok(value) => {
                    log::debug!("Cache hit for {}", key);
                    return Some(value);
                }
                Err(e) => {
                    log::warn!("Cached {} has unexpected shape: {}", key, e);
                    self.lock_cache().invalidate(key);
                }
            }
        }

        let seen = self.lock_cache().generation();
        let text = match self.backend.read(key).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                log::debug!("No data found for {}", key);
                return None;
            }
            Err(e) => {
                log::warn!("Error reading {}: {}", key, e);
                return None;
            }
        };

        let data: serde_json::Value = match serde_json::from_str(&text) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("JSON parse error for {}: {}", key, e);
                return None;
            }
        };
        let value = match serde_json::from_value(data.clone()) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Stored {} has unexpected shape: {}", key, e);
                return None;
            }
        };

        let now = self.clock.now_millis();
        if self.lock_cache().fill(key, data, now, seen) {
            log::debug!("Read {} from storage", key);
        } else {
            log::debug!("Read {} from storage; newer data arrived, not cached", key);
        }
        Some(value)
    }

    /// Drop every cache entry. Storage is untouched.
    pub fn invalidate_all(&self) {
        self.lock_cache().clear();
    }

    /// Delete `keys` from storage, best-effort per key
    ///
    /// The cache is dropped whether or not every deletion succeeded, so a
    /// failed key is re-read from storage on its next `get`.
    pub async fn clear(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut failed = Vec::new();
        for key in keys {
            if let Err(e) = self.backend.remove(key).await {
                log::error!("Error clearing {}: {}", key, e);
                failed.push(key.to_string());
            }
        }
        self.invalidate_all();

        if failed.is_empty() {
            Ok(())
        } else {
            Err(StoreError::PartialClear { failed })
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.lock_cache().stats()
    }

    /// Zero the hit and miss counters. Cached entries stay.
    pub fn reset_cache_counters(&self) {
        self.lock_cache().reset_counters();
    }

    /// Total bytes currently stored under `keys`
    pub async fn storage_size(&self, keys: &[&str]) -> u64 {
        let mut total = 0;
        for key in keys {
            match self.backend.read(key).await {
                Ok(Some(text)) => total += text.len() as u64,
                Ok(None) => {}
                Err(e) => log::warn!("Error sizing {}: {}", key, e),
            }
        }
        total
    }

    fn lock_cache(&self) -> MutexGuard<'_, ReadCache> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
