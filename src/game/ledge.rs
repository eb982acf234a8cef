//! Ledge grabbing - edge detection while falling and the hang/release cycle

use serde::Serialize;

use super::player::{LedgeGrip, LedgeSide, Player};
use super::stage::Platform;
use super::InputState;

/// Horizontal and vertical reach for grabbing an edge
pub const LEDGE_GRAB_RANGE: f32 = 25.0;
/// Maximum time a player can hang before dropping (ms)
pub const LEDGE_HANG_DURATION_MS: f32 = 3000.0;
/// Time after a release during which no edge can be grabbed (ms)
pub const LEDGE_REGRAB_LOCKOUT_MS: f32 = 400.0;
/// Minimum downward speed to count as falling
pub const LEDGE_FALL_THRESHOLD: f32 = 0.5;

pub const CLIMB_VELOCITY: f32 = 12.8;
pub const CLIMB_PUSH: f32 = 4.0;
pub const BACKWARD_PUSH: f32 = 6.0;
pub const BACKWARD_LIFT: f32 = 4.0;
pub const LET_GO_DROP: f32 = 2.0;

/// How a hanging player leaves the ledge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgeRelease {
    /// Jump up and over the edge
    Climb,
    /// Push off away from the platform
    Backward,
    /// Drop straight down
    LetGo,
}

/// A grabbable edge and where the player snaps to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgeCandidate {
    pub grip: LedgeGrip,
    pub anchor_x: f32,
    pub anchor_y: f32,
}

pub struct LedgeGrabSystem;

impl LedgeGrabSystem {
    /// Whether the player is in a state that allows grabbing at all.
    /// Attacking and guarding players cannot grab.
    pub fn is_eligible(player: &Player) -> bool {
        !player.on_ground
            && !player.is_hanging()
            && player.vy > LEDGE_FALL_THRESHOLD
            && !player.is_attacking()
            && !player.is_guarding
            && player.timers.ledge_regrab <= 0.0
    }

    /// First grabbable edge in platform order; the left edge of a platform
    /// is tested before its right edge.
    pub fn find_ledge(player: &Player, platforms: &[Platform]) -> Option<LedgeCandidate> {
        let bottom = player.y + player.height;
        let right = player.x + player.width;

        platforms.iter().enumerate().find_map(|(index, platform)| {
            let rect = &platform.rect;
            // Band around the top surface only; the side of a tall platform
            // below it is not grabbable
            if bottom <= rect.y || bottom >= rect.y + player.height + LEDGE_GRAB_RANGE {
                return None;
            }
            if (right - rect.x).abs() < LEDGE_GRAB_RANGE && player.x < rect.x {
                return Some(LedgeCandidate {
                    grip: LedgeGrip {
                        platform: index,
                        side: LedgeSide::Left,
                    },
                    anchor_x: rect.x - player.width,
                    anchor_y: rect.y,
                });
            }
            if (player.x - rect.right()).abs() < LEDGE_GRAB_RANGE && right > rect.right() {
                return Some(LedgeCandidate {
                    grip: LedgeGrip {
                        platform: index,
                        side: LedgeSide::Right,
                    },
                    anchor_x: rect.right(),
                    anchor_y: rect.y,
                });
            }
            None
        })
    }

    /// Grab an edge if the player qualifies. Returns true on grab.
    pub fn try_grab(player: &mut Player, platforms: &[Platform]) -> bool {
        if !Self::is_eligible(player) {
            return false;
        }
        let Some(candidate) = Self::find_ledge(player, platforms) else {
            return false;
        };
        player.x = candidate.anchor_x;
        player.y = candidate.anchor_y;
        player.vx = 0.0;
        player.vy = 0.0;
        player.facing = candidate.grip.side.toward_platform();
        player.ledge = Some(candidate.grip);
        player.timers.ledge_hang = LEDGE_HANG_DURATION_MS;
        true
    }

    /// Pick a release for a hanging player from this tick's input.
    pub fn release_for_input(player: &Player, input: &InputState) -> Option<LedgeRelease> {
        let grip = player.ledge?;
        let away = -grip.side.toward_platform();
        if input.jump {
            Some(LedgeRelease::Climb)
        } else if input.horizontal() == away {
            Some(LedgeRelease::Backward)
        } else if input.guard {
            Some(LedgeRelease::LetGo)
        } else {
            None
        }
    }

    /// Leave the ledge with the trajectory for `release`
    pub fn release(player: &mut Player, release: LedgeRelease) {
        let toward = player
            .ledge
            .map(|grip| grip.side.toward_platform())
            .unwrap_or(player.facing);
        player.ledge = None;
        player.timers.ledge_hang = 0.0;
        player.timers.ledge_regrab = LEDGE_REGRAB_LOCKOUT_MS;

        let (vx, vy) = match release {
            LedgeRelease::Climb => (toward * CLIMB_PUSH, -CLIMB_VELOCITY),
            LedgeRelease::Backward => (-toward * BACKWARD_PUSH, -BACKWARD_LIFT),
            LedgeRelease::LetGo => (0.0, LET_GO_DROP),
        };
        player.vx = vx;
        player.vy = vy;
    }
}
