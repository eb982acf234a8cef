//! Per-slot player state

use serde::{Deserialize, Serialize};

use super::character::{CharacterProfile, CharacterType};
use super::stage::{Rect, SpawnPoint};

pub const PLAYER_WIDTH: f32 = 50.0;
pub const PLAYER_HEIGHT: f32 = 50.0;

/// One of the two participant slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    #[serde(rename = "player1")]
    One,
    #[serde(rename = "player2")]
    Two,
}

impl Slot {
    pub const ALL: [Slot; 2] = [Slot::One, Slot::Two];

    pub fn index(self) -> usize {
        match self {
            Slot::One => 0,
            Slot::Two => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Slot::One),
            1 => Some(Slot::Two),
            _ => None,
        }
    }

    pub fn opponent(self) -> Self {
        match self {
            Slot::One => Slot::Two,
            Slot::Two => Slot::One,
        }
    }

    /// Initial facing: slot 0 looks right, slot 1 looks left
    pub fn spawn_facing(self) -> f32 {
        match self {
            Slot::One => 1.0,
            Slot::Two => -1.0,
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Slot::One => write!(f, "player1"),
            Slot::Two => write!(f, "player2"),
        }
    }
}

/// Countdown timers for one player, in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerTimers {
    pub basic_cooldown: f32,
    pub basic_active: f32,
    pub special_cooldown: f32,
    pub special_active: f32,
    pub guard_cooldown: f32,
    pub guard_active: f32,
    pub ledge_hang: f32,
    /// Blocks re-grabbing right after a ledge release
    pub ledge_regrab: f32,
}

/// Which expired active windows need their status flag cleared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpiredTimers {
    pub basic: bool,
    pub special: bool,
    pub guard: bool,
    pub ledge_hang: bool,
}

fn count_down(timer: &mut f32, elapsed_ms: f32) -> bool {
    if *timer <= 0.0 {
        *timer = 0.0;
        return false;
    }
    *timer = (*timer - elapsed_ms).max(0.0);
    *timer == 0.0
}

impl PlayerTimers {
    /// Decrement every timer, clamping at zero. Reports active windows that
    /// reached zero during this call.
    pub fn advance(&mut self, elapsed_ms: f32) -> ExpiredTimers {
        count_down(&mut self.basic_cooldown, elapsed_ms);
        count_down(&mut self.special_cooldown, elapsed_ms);
        count_down(&mut self.guard_cooldown, elapsed_ms);
        count_down(&mut self.ledge_regrab, elapsed_ms);
        ExpiredTimers {
            basic: count_down(&mut self.basic_active, elapsed_ms),
            special: count_down(&mut self.special_active, elapsed_ms),
            guard: count_down(&mut self.guard_active, elapsed_ms),
            ledge_hang: count_down(&mut self.ledge_hang, elapsed_ms),
        }
    }
}

/// Side of a platform a hanging player holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgeSide {
    /// Hanging off the platform's left edge (platform is to the right)
    Left,
    /// Hanging off the platform's right edge (platform is to the left)
    Right,
}

impl LedgeSide {
    /// Horizontal direction from the hanging player toward the platform
    pub fn toward_platform(self) -> f32 {
        match self {
            LedgeSide::Left => 1.0,
            LedgeSide::Right => -1.0,
        }
    }
}

/// Grabbed ledge: index into the active stage's platform list and side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgeGrip {
    pub platform: usize,
    pub side: LedgeSide,
}

/// Authoritative player state for one slot
#[derive(Debug, Clone)]
pub struct Player {
    pub slot: Slot,
    pub character: CharacterType,

    // Position (top-left) and movement
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub width: f32,
    pub height: f32,
    pub facing: f32,
    pub on_ground: bool,

    // Combat
    pub percentage: f32,
    pub is_basic_attacking: bool,
    pub is_special_attacking: bool,
    pub is_guarding: bool,

    // Ledge
    pub ledge: Option<LedgeGrip>,

    pub timers: PlayerTimers,
}

impl Player {
    /// Create a fresh player centered on a spawn point
    pub fn new(slot: Slot, character: CharacterType, spawn: SpawnPoint) -> Self {
        let mut player = Self {
            slot,
            character,
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
            width: PLAYER_WIDTH,
            height: PLAYER_HEIGHT,
            facing: slot.spawn_facing(),
            on_ground: false,
            percentage: 0.0,
            is_basic_attacking: false,
            is_special_attacking: false,
            is_guarding: false,
            ledge: None,
            timers: PlayerTimers::default(),
        };
        player.place_at(spawn);
        player
    }

    /// Move back to a spawn point and clear per-round state.
    /// Identity and character are kept.
    pub fn respawn(&mut self, spawn: SpawnPoint) {
        self.place_at(spawn);
        self.vx = 0.0;
        self.vy = 0.0;
        self.facing = self.slot.spawn_facing();
        self.on_ground = false;
        self.percentage = 0.0;
        self.is_basic_attacking = false;
        self.is_special_attacking = false;
        self.is_guarding = false;
        self.ledge = None;
        self.timers = PlayerTimers::default();
    }

    fn place_at(&mut self, spawn: SpawnPoint) {
        self.x = spawn.x - self.width / 2.0;
        self.y = spawn.y - self.height / 2.0;
    }

    pub fn profile(&self) -> &'static CharacterProfile {
        self.character.profile()
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn is_hanging(&self) -> bool {
        self.ledge.is_some()
    }

    pub fn is_attacking(&self) -> bool {
        self.is_basic_attacking || self.is_special_attacking
    }
}
