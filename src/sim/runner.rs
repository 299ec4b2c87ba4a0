//! Frame driver
//!
//! Sits between the display scheduler and `advance`: turns monotonically
//! increasing timestamps into elapsed time, latches jump presses until the
//! next frame, and owns the seeded spawn RNG. One `frame` call must finish
//! before the next begins.

use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::autopilot;
use super::state::{GameEvent, SimulationState};
use super::tick::{FrameInput, advance};
use crate::settings::PhysicsSettings;

pub struct Runner {
    state: SimulationState,
    physics: PhysicsSettings,
    rng: Pcg32,
    seed: u64,
    last_timestamp: Option<f64>,
    jump_latch: bool,
    idle_mode: bool,
}

impl Runner {
    /// Start a run at `started_at_epoch_millis` with a seeded spawn stream
    pub fn new(seed: u64, started_at_epoch_millis: u64, physics: PhysicsSettings) -> Self {
        Self {
            state: SimulationState::new(started_at_epoch_millis, &physics),
            physics,
            rng: Pcg32::seed_from_u64(seed),
            seed,
            last_timestamp: None,
            jump_latch: false,
            idle_mode: false,
        }
    }

    /// Let the autopilot press jump
    pub fn set_idle_mode(&mut self, idle_mode: bool) {
        self.idle_mode = idle_mode;
    }

    /// Record a jump press for the next frame. Repeats before then collapse
    /// into one.
    pub fn request_jump(&mut self) {
        self.jump_latch = true;
    }

    /// Run one frame at the given scheduler timestamp (milliseconds)
    pub fn frame(&mut self, timestamp_millis: f64) -> Option<GameEvent> {
        let elapsed = self
            .last_timestamp
            .map(|last| (timestamp_millis - last).max(0.0))
            .unwrap_or(0.0);
        self.last_timestamp = Some(timestamp_millis);

        let pressed = std::mem::take(&mut self.jump_latch);
        let jump = pressed || (self.idle_mode && autopilot::wants_jump(&self.state, &self.physics));

        let input = FrameInput {
            elapsed_millis: elapsed as f32,
            jump,
        };
        let step = advance(&self.state, &input, &self.physics, &mut self.rng);
        self.state = step.state;
        step.event
    }

    /// Discard the current run and start a new one. The spawn stream
    /// continues, so consecutive runs differ.
    pub fn reset(&mut self, started_at_epoch_millis: u64) {
        log::debug!(
            "Run reset (seed {}, previous score {})",
            self.seed,
            self.state.score
        );
        self.state = SimulationState::new(started_at_epoch_millis, &self.physics);
        self.last_timestamp = None;
        self.jump_latch = false;
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn is_over(&self) -> bool {
        self.state.terminal
    }
}
