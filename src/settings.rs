//! Game settings
//!
//! Physics tuning and storage configuration. Loaded from a JSON file, with a
//! couple of environment overrides for the storage side.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Environment override for the data directory
pub const ENV_DATA_DIR: &str = "DINO_DASH_DATA_DIR";
/// Environment override for the cache window (seconds)
pub const ENV_CACHE_TTL_SECS: &str = "DINO_DASH_CACHE_TTL_SECS";

/// Simulation tuning. All per-frame values are per 60 Hz reference frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    // === Timing ===
    pub target_frame_millis: f32,
    /// Catch-up cap after a long frame
    pub max_time_scale: f32,
    /// Wall-clock milliseconds per point
    pub score_interval_millis: f64,

    // === Player ===
    pub gravity: f32,
    /// Negative is upward
    pub jump_velocity: f32,
    pub player_x: f32,
    pub player_hitbox_width: f32,
    /// Drawn width. Wider than the hitbox.
    pub player_sprite_width: f32,
    pub player_height: f32,

    // === World ===
    pub world_speed: f32,
    pub arena_width: f32,
    pub ground_y: f32,

    // === Obstacles ===
    pub spawn_chance: f32,
    pub max_obstacles: usize,
    pub obstacle_width: f32,
    pub obstacle_height: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            target_frame_millis: TARGET_FRAME_MILLIS,
            max_time_scale: MAX_TIME_SCALE,
            score_interval_millis: SCORE_INTERVAL_MILLIS,

            gravity: GRAVITY,
            jump_velocity: JUMP_VELOCITY,
            player_x: PLAYER_X,
            player_hitbox_width: PLAYER_HITBOX_WIDTH,
            player_sprite_width: PLAYER_SPRITE_WIDTH,
            player_height: PLAYER_HEIGHT,

            world_speed: WORLD_SPEED,
            arena_width: ARENA_WIDTH,
            ground_y: GROUND_Y,

            spawn_chance: SPAWN_CHANCE,
            max_obstacles: MAX_OBSTACLES,
            obstacle_width: OBSTACLE_WIDTH,
            obstacle_height: OBSTACLE_HEIGHT,
        }
    }
}

impl PhysicsSettings {
    /// Fit the playfield to a screen. The ground line sits 200px above the
    /// bottom edge.
    pub fn for_screen(width: f32, height: f32) -> Self {
        Self {
            arena_width: width,
            ground_y: (height - 200.0).max(0.0),
            ..Self::default()
        }
    }
}

/// Where scores live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory holding one JSON file per persisted key
    pub data_dir: PathBuf,
    /// Read cache validity window
    pub cache_ttl_millis: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("dino-dash-data"),
            cache_ttl_millis: CACHE_TTL_MILLIS,
        }
    }
}

/// All settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub physics: PhysicsSettings,
    pub storage: StorageSettings,
}

impl Settings {
    /// Load settings from a JSON file. A missing or unreadable file gives
    /// the defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("Ignoring invalid settings file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Apply environment overrides. Empty, zero or unparsable values are ignored.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = var(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(secs) = var(ENV_CACHE_TTL_SECS)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|v| *v > 0)
        {
            self.storage.cache_ttl_millis = secs * 1000;
        }
    }
}
