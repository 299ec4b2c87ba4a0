//! Runner simulation module
//!
//! All gameplay logic lives here. Nothing in this module suspends or
//! touches storage:
//! - `advance` is a pure function of state, input and one random draw
//! - Obstacle order is spawn order and is only ever filtered
//! - No rendering or platform dependencies

pub mod autopilot;
pub mod collision;
pub mod runner;
pub mod state;
pub mod tick;

pub use collision::{Aabb, first_hit};
pub use runner::Runner;
pub use state::{GameEvent, Obstacle, Player, SimulationState};
pub use tick::{FrameInput, SpawnRoll, Step, advance, time_scale};
