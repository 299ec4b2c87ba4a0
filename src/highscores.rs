//! High score leaderboard
//!
//! Keeps the top 5 scores, best first. Statistics are always derived from
//! the board itself.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consts::{MAX_TOP_SCORES, TARGET_STEP};

/// A single finished run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub id: String,
    pub value: u64,
    /// Unix timestamp (ms) when achieved
    pub timestamp: u64,
}

impl Score {
    /// New score with a fresh unique ID
    pub fn new(value: u64, timestamp: u64) -> Self {
        Self {
            id: format!("score_{}_{}", timestamp, Uuid::new_v4().simple()),
            value,
            timestamp,
        }
    }
}

/// Derived statistics over the leaderboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreStats {
    pub highest_score: u64,
    /// Mean, rounded half up
    pub average_score: u64,
    pub total_games: u64,
    /// Latest timestamp on the board, 0 if empty
    pub last_played: u64,
}

impl ScoreStats {
    pub fn from_scores(scores: &[Score]) -> Self {
        if scores.is_empty() {
            return Self::default();
        }

        let count = scores.len() as u64;
        let total: u64 = scores.iter().map(|s| s.value).sum();
        Self {
            highest_score: scores.iter().map(|s| s.value).max().unwrap_or(0),
            average_score: (2 * total + count) / (2 * count),
            total_games: count,
            last_played: scores.iter().map(|s| s.timestamp).max().unwrap_or(0),
        }
    }
}

/// Top scores, sorted descending by value
///
/// Equal values keep insertion order. Serialized as a plain array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Leaderboard {
    entries: Vec<Score>,
}

impl Leaderboard {
    /// Create empty leaderboard
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build from stored entries, restoring order and size if needed
    pub fn from_entries(mut entries: Vec<Score>) -> Self {
        // Stable, so equal values keep their stored order
        entries.sort_by(|a, b| b.value.cmp(&a.value));
        entries.truncate(MAX_TOP_SCORES);
        Self { entries }
    }

    pub fn entries(&self) -> &[Score] {
        &self.entries
    }

    /// At most `limit` best entries
    pub fn top(&self, limit: usize) -> &[Score] {
        &self.entries[..limit.min(self.entries.len())]
    }

    /// Check if the leaderboard is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Get the top score (if any)
    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.value)
    }

    /// Check if a value would make it onto the board
    pub fn qualifies(&self, value: u64) -> bool {
        if self.entries.len() < MAX_TOP_SCORES {
            return true;
        }
        // Check if score beats the lowest entry
        self.entries.last().map(|e| value > e.value).unwrap_or(true)
    }

    /// Get the rank a value would achieve (1-indexed, None if it doesn't qualify)
    pub fn potential_rank(&self, value: u64) -> Option<usize> {
        if !self.qualifies(value) {
            return None;
        }
        let rank = self.entries.iter().position(|e| value > e.value);
        Some(rank.unwrap_or(self.entries.len()) + 1)
    }

    /// Merge a score into the board and trim to size
    /// Returns the rank achieved (1-indexed) or None if it fell off
    pub fn insert(&mut self, score: Score) -> Option<usize> {
        let rank = self.potential_rank(score.value)?;
        self.entries.insert(rank - 1, score);
        self.entries.truncate(MAX_TOP_SCORES);
        Some(rank)
    }

    /// Next value for a running score to beat
    ///
    /// Scans from the lowest entry up and returns the first value above
    /// `current`. With nothing left to beat the target is the best score
    /// plus a fixed step; with an empty board it is `current` plus the step.
    pub fn next_target(&self, current: u64) -> u64 {
        let Some(best) = self.top_score() else {
            return current.saturating_add(TARGET_STEP);
        };
        self.entries
            .iter()
            .rev()
            .find(|e| e.value > current)
            .map(|e| e.value)
            .unwrap_or(best.saturating_add(TARGET_STEP))
    }

    pub fn stats(&self) -> ScoreStats {
        ScoreStats::from_scores(&self.entries)
    }
}
