//! Simulation state and entity types
//!
//! A `SimulationState` belongs to exactly one run. It is created at start or
//! reset, replaced by every `advance`, and never persisted between runs.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::Aabb;
use crate::settings::PhysicsSettings;

/// Things the orchestration layer reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// The player collided; carries the final score of the run
    RunEnded { score: u64 },
}

/// The player (vertical kinematics only, the column is fixed)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Top edge of the player box (screen coordinates, y grows downward)
    pub y: f32,
    /// Vertical velocity, negative is upward
    pub velocity_y: f32,
    pub airborne: bool,
}

impl Player {
    /// Player standing on the ground line
    pub fn grounded(physics: &PhysicsSettings) -> Self {
        Self {
            y: physics.ground_y,
            velocity_y: 0.0,
            airborne: false,
        }
    }

    /// Collision box. Narrower than the sprite.
    pub fn hitbox(&self, physics: &PhysicsSettings) -> Aabb {
        Aabb::new(
            Vec2::new(physics.player_x, self.y),
            Vec2::new(physics.player_hitbox_width, physics.player_height),
        )
    }

    /// Drawn area, for presentation only
    pub fn sprite_bounds(&self, physics: &PhysicsSettings) -> Aabb {
        Aabb::new(
            Vec2::new(physics.player_x, self.y),
            Vec2::new(physics.player_sprite_width, physics.player_height),
        )
    }
}

/// An obstacle scrolling from the right edge to the left
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: u32,
    /// Top-left corner
    pub pos: Vec2,
    pub size: Vec2,
}

impl Obstacle {
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.pos, self.size)
    }

    /// True once the right edge has passed the left boundary
    pub fn is_offscreen(&self) -> bool {
        self.pos.x + self.size.x <= 0.0
    }
}

/// Complete state of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub player: Player,
    /// Spawn order, which is also left-to-right order. Only ever filtered.
    pub obstacles: Vec<Obstacle>,
    /// Points survived; never decreases within a run
    pub score: u64,
    /// Set on collision. Only a reset clears it.
    pub terminal: bool,
    /// Wall-clock start of the run
    pub started_at_epoch_millis: u64,
    /// Wall-clock time accumulated since the start (uncapped elapsed sum)
    pub run_millis: f64,
    /// Next obstacle ID
    next_id: u32,
}

impl SimulationState {
    /// Fresh run starting at the given wall-clock time
    pub fn new(started_at_epoch_millis: u64, physics: &PhysicsSettings) -> Self {
        Self {
            player: Player::grounded(physics),
            obstacles: Vec::new(),
            score: 0,
            terminal: false,
            started_at_epoch_millis,
            run_millis: 0.0,
            next_id: 1,
        }
    }

    /// Allocate a new obstacle ID
    pub fn next_obstacle_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Append an obstacle at the right edge, standing on the ground line
    pub fn spawn_obstacle(&mut self, physics: &PhysicsSettings) {
        let id = self.next_obstacle_id();
        self.obstacles.push(Obstacle {
            id,
            pos: Vec2::new(physics.arena_width, physics.ground_y),
            size: Vec2::new(physics.obstacle_width, physics.obstacle_height),
        });
    }

    /// Current wall-clock time as seen by the run
    pub fn now_epoch_millis(&self) -> u64 {
        self.started_at_epoch_millis + self.run_millis as u64
    }
}
