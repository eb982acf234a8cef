//! Character catalog - static per-type movement and combat profiles

use serde::{Deserialize, Serialize};

/// Character types available in the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CharacterType {
    /// Heavy bruiser with a ground pound special
    #[serde(alias = "red_knight")]
    RedKnight,
    /// Light, fast fighter with a dash special
    #[serde(alias = "blue_ninja")]
    BlueNinja,
}

impl CharacterType {
    /// Default pick for a slot when the participant does not choose one
    pub fn default_for_slot(slot_index: usize) -> Self {
        if slot_index == 0 {
            Self::RedKnight
        } else {
            Self::BlueNinja
        }
    }

    pub fn profile(self) -> &'static CharacterProfile {
        match self {
            Self::RedKnight => &RED_KNIGHT,
            Self::BlueNinja => &BLUE_NINJA,
        }
    }
}

/// Shape of a character's special attack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialKind {
    /// Area check beneath and around the attacker, no self-movement
    GroundPound,
    /// Forward dash with a hitbox covering the dash path
    Dash,
}

/// Immutable movement and combat numbers for one character type.
///
/// Speeds are in pixels per nominal tick, ranges in pixels. Knockback values
/// are multipliers on the global base knockback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterProfile {
    pub move_speed: f32,
    pub jump_strength: f32,
    /// Scales gravity and divides incoming knockback
    pub gravity_multiplier: f32,
    pub basic_damage: f32,
    pub basic_range: f32,
    pub basic_knockback: f32,
    pub special_damage: f32,
    pub special_range: f32,
    pub special_knockback: f32,
    /// Fraction of guarded knockback that is absorbed (0..1)
    pub guard_reduction: f32,
    pub special: SpecialKind,
}

pub static RED_KNIGHT: CharacterProfile = CharacterProfile {
    move_speed: 6.0,
    jump_strength: 12.0,
    gravity_multiplier: 1.0,
    basic_damage: 7.0,
    basic_range: 60.0,
    basic_knockback: 1.2,
    special_damage: 12.0,
    special_range: 80.0,
    special_knockback: 1.5,
    guard_reduction: 0.5,
    special: SpecialKind::GroundPound,
};

pub static BLUE_NINJA: CharacterProfile = CharacterProfile {
    move_speed: 7.5,
    jump_strength: 14.0,
    gravity_multiplier: 0.95,
    basic_damage: 4.0,
    basic_range: 40.0,
    basic_knockback: 0.8,
    special_damage: 8.0,
    special_range: 60.0,
    special_knockback: 1.0,
    guard_reduction: 0.8,
    special: SpecialKind::Dash,
};
