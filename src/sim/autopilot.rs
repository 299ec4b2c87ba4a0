//! Idle/demo mode
//!
//! Plays the game without input: jump when the next obstacle is about to
//! reach the player. It reacts only to the nearest obstacle, so tightly
//! packed obstacles still end the run eventually.

use super::state::SimulationState;
use crate::settings::PhysicsSettings;

/// How many reference frames ahead of contact the autopilot jumps
const LEAD_FRAMES: f32 = 12.0;

/// Whether the autopilot would press jump this frame
pub fn wants_jump(state: &SimulationState, physics: &PhysicsSettings) -> bool {
    if state.terminal || state.player.airborne {
        return false;
    }

    let front = physics.player_x + physics.player_hitbox_width;
    let lead = physics.world_speed * LEAD_FRAMES;

    // Obstacles are in left-to-right order, so the first one not yet past
    // the player is the nearest threat
    state
        .obstacles
        .iter()
        .find(|o| o.pos.x + o.size.x > physics.player_x)
        .map(|o| o.pos.x - front)
        .is_some_and(|gap| gap <= lead)
}
