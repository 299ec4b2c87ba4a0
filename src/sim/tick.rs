//! Per-frame simulation step
//!
//! `advance` is the whole game: it takes the previous state plus what happened
//! since the last frame and produces the next state. Deltas are scaled by the
//! elapsed time relative to a 60 Hz reference frame so the game plays at the
//! same speed on any display.

use rand::Rng;
use rand_pcg::Pcg32;

use super::collision::first_hit;
use super::state::{GameEvent, SimulationState};
use crate::settings::PhysicsSettings;

/// Source of the per-frame spawn draw
pub trait SpawnRoll {
    /// Uniform draw in `[0, 1)`
    fn roll(&mut self) -> f32;
}

impl SpawnRoll for Pcg32 {
    fn roll(&mut self) -> f32 {
        self.random::<f32>()
    }
}

/// What happened since the previous frame
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInput {
    /// Wall-clock time since the previous frame
    pub elapsed_millis: f32,
    /// Jump pressed since the previous frame
    pub jump: bool,
}

/// Result of one `advance`
#[derive(Debug, Clone)]
pub struct Step {
    pub state: SimulationState,
    /// Set only on the frame the run ends
    pub event: Option<GameEvent>,
}

/// Elapsed time as a multiple of the reference frame, capped after hitches.
/// Negative or NaN elapsed time counts as zero.
pub fn time_scale(elapsed_millis: f32, physics: &PhysicsSettings) -> f32 {
    let elapsed = elapsed_millis.max(0.0);
    (elapsed / physics.target_frame_millis).min(physics.max_time_scale)
}

/// Advance the simulation by one frame
pub fn advance(
    state: &SimulationState,
    input: &FrameInput,
    physics: &PhysicsSettings,
    rng: &mut impl SpawnRoll,
) -> Step {
    // Frozen until reset
    if state.terminal {
        return Step {
            state: state.clone(),
            event: None,
        };
    }

    let elapsed = input.elapsed_millis.max(0.0);
    let scale = time_scale(elapsed, physics);
    let mut next = state.clone();

    // Player kinematics
    let player = &mut next.player;
    player.velocity_y += physics.gravity * scale;
    player.y += player.velocity_y * scale;
    if player.y >= physics.ground_y && player.velocity_y >= 0.0 {
        // Landing absorbs all vertical energy
        player.y = physics.ground_y;
        player.velocity_y = 0.0;
        player.airborne = false;
    }

    // No double jump, no queueing
    if input.jump && !player.airborne {
        player.velocity_y = physics.jump_velocity;
        player.airborne = true;
    }

    // Scroll and cull
    let dx = physics.world_speed * scale;
    for obstacle in &mut next.obstacles {
        obstacle.pos.x -= dx;
    }
    next.obstacles.retain(|o| !o.is_offscreen());

    // Spawn (one draw per live frame)
    let roll = rng.roll();
    if roll < physics.spawn_chance * scale && next.obstacles.len() < physics.max_obstacles {
        next.spawn_obstacle(physics);
    }

    // Score from wall-clock time, not frames or distance
    next.run_millis += f64::from(elapsed);
    let points = (next.run_millis / physics.score_interval_millis).floor() as u64;
    next.score = points.max(state.score);

    let hitbox = next.player.hitbox(physics);
    let event = first_hit(&hitbox, &next.obstacles).map(|obstacle_id| {
        log::info!(
            "Run ended: hit obstacle {} with score {}",
            obstacle_id,
            next.score
        );
        next.terminal = true;
        GameEvent::RunEnded { score: next.score }
    });

    Step { state: next, event }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use proptest::prelude::*;

    use crate::sim::state::Obstacle;

    /// Draw that never passes the spawn check
    struct NeverSpawn;

    impl SpawnRoll for NeverSpawn {
        fn roll(&mut self) -> f32 {
            0.999
        }
    }

    /// Draw that always passes the spawn check when time moves
    struct AlwaysSpawn;

    impl SpawnRoll for AlwaysSpawn {
        fn roll(&mut self) -> f32 {
            0.0
        }
    }

    const FRAME: f32 = 1000.0 / 60.0;

    fn frame(elapsed_millis: f32) -> FrameInput {
        FrameInput {
            elapsed_millis,
            jump: false,
        }
    }

    fn jump_frame() -> FrameInput {
        FrameInput {
            elapsed_millis: FRAME,
            jump: true,
        }
    }

    fn obstacle_at(id: u32, x: f32, physics: &PhysicsSettings) -> Obstacle {
        Obstacle {
            id,
            pos: Vec2::new(x, physics.ground_y),
            size: Vec2::new(physics.obstacle_width, physics.obstacle_height),
        }
    }

    #[test]
    fn test_time_scale() {
        let physics = PhysicsSettings::default();
        assert!((time_scale(FRAME, &physics) - 1.0).abs() < 1e-5);
        assert!((time_scale(FRAME / 2.0, &physics) - 0.5).abs() < 1e-5);
        // Hitch is capped
        assert_eq!(time_scale(1000.0, &physics), physics.max_time_scale);
        assert_eq!(time_scale(-5.0, &physics), 0.0);
        assert_eq!(time_scale(f32::NAN, &physics), 0.0);
    }

    #[test]
    fn test_jump_and_land() {
        let physics = PhysicsSettings::default();
        let mut state = SimulationState::new(0, &physics);

        state = advance(&state, &jump_frame(), &physics, &mut NeverSpawn).state;
        assert!(state.player.airborne);
        assert_eq!(state.player.velocity_y, physics.jump_velocity);

        let mut frames = 0;
        while state.player.airborne {
            state = advance(&state, &frame(FRAME), &physics, &mut NeverSpawn).state;
            assert!(state.player.y <= physics.ground_y);
            frames += 1;
            assert!(frames < 200, "player never landed");
        }

        assert_eq!(state.player.y, physics.ground_y);
        assert_eq!(state.player.velocity_y, 0.0);
        assert!(!state.player.airborne);
    }

    #[test]
    fn test_no_double_jump() {
        let physics = PhysicsSettings::default();
        let state = SimulationState::new(0, &physics);

        let state = advance(&state, &jump_frame(), &physics, &mut NeverSpawn).state;
        let state = advance(&state, &jump_frame(), &physics, &mut NeverSpawn).state;

        // Second press ignored: gravity has already started slowing the jump
        assert!(state.player.velocity_y > physics.jump_velocity);
        assert!(state.player.y < physics.ground_y);
    }

    #[test]
    fn test_jump_survives_zero_elapsed_frame() {
        let physics = PhysicsSettings::default();
        let state = SimulationState::new(0, &physics);

        let jumped = advance(&state, &jump_frame(), &physics, &mut NeverSpawn).state;
        let next = advance(&jumped, &frame(0.0), &physics, &mut NeverSpawn).state;
        assert_eq!(next.player, jumped.player);
    }

    #[test]
    fn test_obstacles_scroll_and_cull() {
        let physics = PhysicsSettings::default();
        let mut state = SimulationState::new(0, &physics);
        // Airborne and high so nothing collides
        state.player.y = 100.0;
        state.player.airborne = true;
        state.obstacles.push(obstacle_at(1, -25.0, &physics));
        state.obstacles.push(obstacle_at(2, 400.0, &physics));

        let next = advance(&state, &frame(FRAME), &physics, &mut NeverSpawn).state;
        assert_eq!(next.obstacles.len(), 1);
        assert_eq!(next.obstacles[0].id, 2);
        assert!((next.obstacles[0].pos.x - (400.0 - physics.world_speed)).abs() < 1e-3);
    }

    #[test]
    fn test_hitch_is_capped() {
        let physics = PhysicsSettings::default();
        let mut state = SimulationState::new(0, &physics);
        state.obstacles.push(obstacle_at(1, 500.0, &physics));

        let next = advance(&state, &frame(5_000.0), &physics, &mut NeverSpawn).state;
        let moved = 500.0 - next.obstacles[0].pos.x;
        assert!((moved - physics.world_speed * physics.max_time_scale).abs() < 1e-3);
        // Score still follows the full wall-clock time
        assert_eq!(next.score, 50);
    }

    #[test]
    fn test_spawn_respects_max_obstacles() {
        let physics = PhysicsSettings::default();
        let mut state = SimulationState::new(0, &physics);
        state.player.y = -10_000.0;
        state.player.airborne = true;

        for _ in 0..10 {
            state = advance(&state, &frame(FRAME), &physics, &mut AlwaysSpawn).state;
        }
        assert_eq!(state.obstacles.len(), physics.max_obstacles);
        // Appended in spawn order
        let ids: Vec<u32> = state.obstacles.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_spawn_appears_at_right_edge() {
        let physics = PhysicsSettings::default();
        let state = SimulationState::new(0, &physics);

        let next = advance(&state, &frame(FRAME), &physics, &mut AlwaysSpawn).state;
        assert_eq!(next.obstacles.len(), 1);
        assert_eq!(next.obstacles[0].pos.x, physics.arena_width);
        assert_eq!(next.obstacles[0].pos.y, physics.ground_y);
    }

    #[test]
    fn test_score_is_time_based() {
        let physics = PhysicsSettings::default();
        let mut state = SimulationState::new(10_000, &physics);
        for _ in 0..10 {
            state = advance(&state, &frame(100.0), &physics, &mut NeverSpawn).state;
        }
        assert_eq!(state.score, 10);
        assert_eq!(state.now_epoch_millis(), 11_000);

        // Same wall time at a higher frame rate gives the same score
        let mut fast = SimulationState::new(10_000, &physics);
        for _ in 0..40 {
            fast = advance(&fast, &frame(25.0), &physics, &mut NeverSpawn).state;
        }
        assert_eq!(fast.score, 10);
    }

    #[test]
    fn test_collision_ends_run_once() {
        let physics = PhysicsSettings::default();
        let mut state = SimulationState::new(0, &physics);
        state.run_millis = 1_234.0;
        state.obstacles.push(obstacle_at(1, physics.player_x + 10.0, &physics));

        let step = advance(&state, &frame(FRAME), &physics, &mut NeverSpawn);
        assert!(step.state.terminal);
        assert_eq!(step.event, Some(GameEvent::RunEnded { score: 12 }));

        // Frozen afterwards, even with jump input and a long frame
        let after = advance(&step.state, &jump_frame(), &physics, &mut AlwaysSpawn);
        assert_eq!(after.state, step.state);
        assert!(after.event.is_none());
    }

    #[test]
    fn test_negative_elapsed_is_zero() {
        let physics = PhysicsSettings::default();
        let mut state = SimulationState::new(0, &physics);
        state.obstacles.push(obstacle_at(1, 400.0, &physics));

        let next = advance(&state, &frame(-50.0), &physics, &mut AlwaysSpawn).state;
        assert_eq!(next, state);
    }

    proptest! {
        #[test]
        fn prop_zero_elapsed_is_noop(
            height in 0.0f32..400.0,
            velocity in -15.0f32..15.0,
            xs in proptest::collection::vec(100.0f32..800.0, 0..3),
            run_millis in 0.0f64..100_000.0,
            jump in any::<bool>(),
        ) {
            let physics = PhysicsSettings::default();
            let mut state = SimulationState::new(0, &physics);
            state.player.y = physics.ground_y - height;
            state.player.velocity_y = velocity;
            state.player.airborne = height > 0.0;
            state.run_millis = run_millis;
            state.score = (run_millis / physics.score_interval_millis).floor() as u64;
            for (i, x) in xs.iter().enumerate() {
                state.obstacles.push(obstacle_at(i as u32 + 1, *x, &physics));
            }

            let input = FrameInput { elapsed_millis: 0.0, jump };
            let next = advance(&state, &input, &physics, &mut AlwaysSpawn).state;
            prop_assert_eq!(next.player.y, state.player.y);
            prop_assert_eq!(next.score, state.score);
            prop_assert_eq!(next.obstacles, state.obstacles);
        }

        #[test]
        fn prop_fall_is_monotonic_and_clamped(
            height in 0.0f32..400.0,
            frames in proptest::collection::vec(0.0f32..60.0, 1..200),
        ) {
            let physics = PhysicsSettings::default();
            let mut state = SimulationState::new(0, &physics);
            state.player.y = physics.ground_y - height;
            state.player.airborne = height > 0.0;

            let mut last_y = state.player.y;
            for elapsed in frames {
                state = advance(&state, &frame(elapsed), &physics, &mut NeverSpawn).state;
                prop_assert!(state.player.y >= last_y);
                prop_assert!(state.player.y <= physics.ground_y);
                last_y = state.player.y;
            }

            // Enough frames always bring it down
            for _ in 0..200 {
                state = advance(&state, &frame(FRAME), &physics, &mut NeverSpawn).state;
            }
            prop_assert_eq!(state.player.y, physics.ground_y);
            prop_assert_eq!(state.player.velocity_y, 0.0);
            prop_assert!(!state.player.airborne);
        }
    }
}
