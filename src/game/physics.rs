//! Player movement integration and platform landing

use crate::util::time::tick_scale;

use super::player::Player;
use super::stage::Platform;
use super::InputState;

/// Downward acceleration per nominal tick, before the character multiplier
pub const GRAVITY: f32 = 0.5;
/// Gravity alone never accelerates a fall beyond this speed
pub const MAX_FALL_SPEED: f32 = 16.0;
/// Per-tick horizontal velocity retention on the ground with no input
pub const GROUND_FRICTION: f32 = 0.90;
/// Per-tick horizontal velocity retention in the air with no input
pub const AIR_DRAG: f32 = 0.98;
/// Fraction of the gap to target speed closed per tick on the ground
pub const GROUND_ACCEL: f32 = 0.25;
/// Fraction of the gap to target speed closed per tick in the air
pub const AIR_ACCEL: f32 = 0.08;
/// Movement speed multiplier while guarding
pub const GUARD_MOVE_MULTIPLIER: f32 = 0.3;
/// Tolerance for the previous bottom edge when testing a landing
const LANDING_EPSILON: f32 = 0.01;

/// Per-tick rate `r` expressed over `step` nominal ticks
fn rate_over(rate: f32, step: f32) -> f32 {
    1.0 - (1.0 - rate).powf(step)
}

/// Physics system for updating player positions and velocities
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Apply horizontal control, facing and jump from latched input.
    ///
    /// Expects guard activation for this tick to have happened already so a
    /// guard that starts this tick also blocks the jump.
    pub fn apply_input(player: &mut Player, input: &InputState, elapsed_ms: f32) {
        let step = tick_scale(elapsed_ms);
        let profile = player.profile();
        let direction = input.horizontal();

        if direction != 0.0 {
            let guard = if player.is_guarding {
                GUARD_MOVE_MULTIPLIER
            } else {
                1.0
            };
            let target = direction * profile.move_speed * guard;
            let accel = if player.on_ground {
                GROUND_ACCEL
            } else {
                AIR_ACCEL
            };
            player.vx += (target - player.vx) * rate_over(accel, step);
            player.facing = direction;
        } else if player.on_ground {
            player.vx *= GROUND_FRICTION.powf(step);
        } else {
            player.vx *= AIR_DRAG.powf(step);
        }

        if input.jump && player.on_ground && !player.is_guarding {
            player.vy = -profile.jump_strength;
            player.on_ground = false;
        }
    }

    /// Apply gravity, move, and resolve landing against the stage.
    /// Hanging players must not be passed in.
    pub fn integrate(player: &mut Player, platforms: &[Platform], elapsed_ms: f32) {
        let step = tick_scale(elapsed_ms);
        let gravity = GRAVITY * player.profile().gravity_multiplier * step;
        if player.vy < MAX_FALL_SPEED {
            player.vy = (player.vy + gravity).min(MAX_FALL_SPEED);
        }

        let prev_bottom = player.y + player.height;
        player.x += player.vx * step;
        player.y += player.vy * step;

        player.on_ground = Self::resolve_landing(player, prev_bottom, platforms);
    }

    /// Clamp the player onto the first platform whose top it crossed this
    /// tick. Sides and undersides never collide.
    fn resolve_landing(player: &mut Player, prev_bottom: f32, platforms: &[Platform]) -> bool {
        if player.vy < 0.0 {
            return false;
        }
        let bottom = player.y + player.height;
        for platform in platforms {
            let top = platform.rect.y;
            let crossed = prev_bottom <= top + LANDING_EPSILON && bottom >= top;
            let overlaps = player.x < platform.rect.right() && player.x + player.width > platform.rect.x;
            if crossed && overlaps {
                player.y = top - player.height;
                player.vy = 0.0;
                return true;
            }
        }
        false
    }
}
