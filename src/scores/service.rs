//! Score service
//!
//! The only writer of score data. Every read of statistics recomputes them
//! from the leaderboard rather than trusting the persisted copy.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::consts::{MAX_TOP_SCORES, MIN_SCORE_TO_SAVE};
use crate::highscores::{Leaderboard, Score, ScoreStats};
use crate::persistence::{CacheStats, ScoreStore, StoreError, keys};
use crate::platform::{Clock, FileBackend, StorageBackend, SystemClock};
use crate::settings::StorageSettings;

#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Timings of the most recent save and load
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PerformanceMetrics {
    pub save_time: Duration,
    pub load_time: Duration,
    /// Fraction of store reads answered from cache
    pub cache_hit_rate: f64,
}

pub struct ScoreService<B> {
    store: ScoreStore<B>,
    clock: Arc<dyn Clock>,
    /// Serializes read-modify-write cycles (submit, clear)
    writer: tokio::sync::Mutex<()>,
    metrics: Mutex<PerformanceMetrics>,
}

impl ScoreService<FileBackend> {
    /// Service over the configured data directory, using the system clock
    pub fn open(storage: &StorageSettings) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = ScoreStore::new(
            FileBackend::new(storage.data_dir.clone()),
            clock.clone(),
            storage.cache_ttl_millis,
        );
        Self::new(store, clock)
    }
}

impl<B: StorageBackend> ScoreService<B> {
    pub fn new(store: ScoreStore<B>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            writer: tokio::sync::Mutex::new(()),
            metrics: Mutex::new(PerformanceMetrics::default()),
        }
    }

    /// Record a finished run
    ///
    /// Values below the minimum are ignored and return `false`. Otherwise the
    /// score is merged into the top 5 and the board, highest score and stats
    /// are written. Returns whether it beat everything already on the board.
    pub async fn submit_score(&self, value: u64) -> Result<bool, ScoreError> {
        if value < MIN_SCORE_TO_SAVE {
            log::debug!("Not saving score {} (below minimum)", value);
            return Ok(false);
        }

        let _writer = self.writer.lock().await;
        let started = Instant::now();

        let mut board = self.leaderboard().await;
        let is_new_high_score = board.top_score().is_none_or(|best| value > best);

        let score = Score::new(value, self.clock.now_millis());
        match board.insert(score) {
            Some(rank) => log::debug!("Score {} ranked #{}", value, rank),
            None => log::debug!("Score {} did not make the board", value),
        }

        self.store.put(keys::TOP_SCORES, &board).await?;
        if is_new_high_score {
            log::info!("New high score: {}", value);
            self.store.put(keys::HIGHEST_SCORE, &value).await?;
        }
        self.store.put(keys::SCORE_STATS, &board.stats()).await?;

        self.lock_metrics().save_time = started.elapsed();
        Ok(is_new_high_score)
    }

    /// Current board (empty if nothing is stored)
    pub async fn leaderboard(&self) -> Leaderboard {
        self.store
            .get::<Vec<Score>>(keys::TOP_SCORES)
            .await
            .map(Leaderboard::from_entries)
            .unwrap_or_default()
    }

    /// Up to `limit` best scores, best first
    pub async fn top_scores(&self, limit: usize) -> Vec<Score> {
        let started = Instant::now();
        let scores = self.leaderboard().await.top(limit).to_vec();
        self.lock_metrics().load_time = started.elapsed();
        scores
    }

    /// Best score ever recorded, 0 if none
    pub async fn highest_score(&self) -> u64 {
        self.store.get(keys::HIGHEST_SCORE).await.unwrap_or(0)
    }

    pub async fn next_target_score(&self, current: u64) -> u64 {
        self.leaderboard().await.next_target(current)
    }

    pub async fn is_new_high_score(&self, value: u64) -> bool {
        value > self.highest_score().await
    }

    /// Stats recomputed from the board, then saved as the new cached copy
    ///
    /// Takes the writer lock so a save never lands on top of stats from a
    /// newer submission.
    pub async fn score_stats(&self) -> Result<ScoreStats, ScoreError> {
        let _writer = self.writer.lock().await;
        let stats = self.leaderboard().await.stats();
        self.store.put(keys::SCORE_STATS, &stats).await?;
        Ok(stats)
    }

    /// Delete all score data
    pub async fn clear_all_scores(&self) -> Result<(), ScoreError> {
        let _writer = self.writer.lock().await;
        self.store.clear(&keys::ALL).await?;
        log::info!("All scores cleared");
        Ok(())
    }

    pub fn performance_metrics(&self) -> PerformanceMetrics {
        let mut metrics = *self.lock_metrics();
        metrics.cache_hit_rate = self.store.cache_stats().hit_rate();
        metrics
    }

    /// Zero the timings and the cache hit rate
    pub fn reset_performance_metrics(&self) {
        *self.lock_metrics() = PerformanceMetrics::default();
        self.store.reset_cache_counters();
    }

    /// Drop cached values so the next reads go to storage
    pub fn clear_cache(&self) {
        self.store.invalidate_all();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.store.cache_stats()
    }

    /// Bytes used by all score data
    pub async fn storage_size(&self) -> u64 {
        self.store.storage_size(&keys::ALL).await
    }

    fn lock_metrics(&self) -> MutexGuard<'_, PerformanceMetrics> {
        self.metrics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
