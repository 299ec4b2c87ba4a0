//! Dino Dash - An endless-runner jumping game
//!
//! Core modules:
//! - `sim`: Frame simulation (kinematics, obstacle stream, collisions, scoring)
//! - `highscores`: Leaderboard ranking and derived statistics
//! - `persistence`: Score store with a read-through cache
//! - `scores`: Score service and the orchestration context
//! - `platform`: Durable storage backends and wall clock
//! - `settings`: Tuning and storage configuration

pub mod highscores;
pub mod persistence;
pub mod platform;
pub mod scores;
pub mod settings;
pub mod sim;

pub use highscores::{Leaderboard, Score, ScoreStats};
pub use persistence::{ScoreStore, StoreError};
pub use scores::{ScoreContext, ScoreError, ScoreService, ScoreViewState};
pub use settings::{PhysicsSettings, Settings, StorageSettings};

/// Game configuration constants
pub mod consts {
    /// Reference frame duration (60 Hz)
    pub const TARGET_FRAME_MILLIS: f32 = 1000.0 / 60.0;
    /// Cap on frame catch-up after a hitch, so obstacles can't be tunneled through
    pub const MAX_TIME_SCALE: f32 = 2.0;

    /// Player kinematics (pixels per reference frame)
    pub const GRAVITY: f32 = 0.8;
    pub const JUMP_VELOCITY: f32 = -15.0;

    /// Horizontal world speed (pixels per reference frame)
    pub const WORLD_SPEED: f32 = 5.0;

    /// Spawn probability per reference frame
    pub const SPAWN_CHANCE: f32 = 0.02;
    /// Maximum obstacles on screen at once
    pub const MAX_OBSTACLES: usize = 3;

    /// Default playfield
    pub const ARENA_WIDTH: f32 = 800.0;
    pub const GROUND_Y: f32 = 600.0;

    /// Player sits at a fixed column. The collision box is narrower than the
    /// sprite so near misses stay near misses.
    pub const PLAYER_X: f32 = 50.0;
    pub const PLAYER_SPRITE_WIDTH: f32 = 50.0;
    pub const PLAYER_HITBOX_WIDTH: f32 = 35.0;
    pub const PLAYER_HEIGHT: f32 = 50.0;

    pub const OBSTACLE_WIDTH: f32 = 30.0;
    pub const OBSTACLE_HEIGHT: f32 = 50.0;

    /// One point per 100 ms survived
    pub const SCORE_INTERVAL_MILLIS: f64 = 100.0;

    /// Leaderboard size
    pub const MAX_TOP_SCORES: usize = 5;
    /// Scores below this are never saved
    pub const MIN_SCORE_TO_SAVE: u64 = 1;
    /// Bonus added to the best score when there is nothing left to beat
    pub const TARGET_STEP: u64 = 100;

    /// Cache validity window for persisted values
    pub const CACHE_TTL_MILLIS: u64 = 5 * 60 * 1000;
}
