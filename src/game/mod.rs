//! Game simulation modules

pub mod character;
pub mod combat;
pub mod ledge;
pub mod r#match;
pub mod physics;
pub mod player;
pub mod snapshot;
pub mod stage;

pub use character::{CharacterProfile, CharacterType, SpecialKind};
pub use player::{Player, PlayerTimers, Slot};
pub use r#match::{Arena, ArenaCommand, ArenaError, GameMatch, MatchHandle, MatchPhase, SlotError};
pub use stage::{Platform, Stage, STAGES};

use serde_json::Value;

/// Latest button state for one slot, overwritten by the transport and read
/// once per tick. Absent fields read as released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub move_left: bool,
    pub move_right: bool,
    pub jump: bool,
    pub basic_attack: bool,
    pub special_attack: bool,
    pub guard: bool,
}

impl InputState {
    /// Lenient decode of a client input payload.
    ///
    /// Anything other than a literal `true` is treated as released, and a
    /// payload that is not an object is treated as no input at all.
    pub fn from_value(value: &Value) -> Self {
        let Some(fields) = value.as_object() else {
            return Self::default();
        };
        let pressed = |keys: &[&str]| {
            keys.iter()
                .any(|k| matches!(fields.get(*k), Some(Value::Bool(true))))
        };
        Self {
            move_left: pressed(&["left", "move_left", "moveLeft"]),
            move_right: pressed(&["right", "move_right", "moveRight"]),
            jump: pressed(&["jump"]),
            basic_attack: pressed(&["basicAttack", "basic_attack"]),
            special_attack: pressed(&["specialAttack", "special_attack"]),
            guard: pressed(&["guard"]),
        }
    }

    /// Horizontal direction requested this tick. Left wins if both are held.
    pub fn horizontal(&self) -> f32 {
        if self.move_left {
            -1.0
        } else if self.move_right {
            1.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn input_reads_client_field_names() {
        let input = InputState::from_value(&json!({
            "left": true,
            "jump": true,
            "basicAttack": true,
        }));
        assert!(input.move_left);
        assert!(input.jump);
        assert!(input.basic_attack);
        assert!(!input.guard);
        assert_eq!(input.horizontal(), -1.0);
    }

    #[test]
    fn malformed_input_reads_as_released() {
        assert_eq!(InputState::from_value(&json!(null)), InputState::default());
        assert_eq!(InputState::from_value(&json!("jump")), InputState::default());
        let input = InputState::from_value(&json!({ "jump": 1, "guard": "yes", "right": true }));
        assert!(!input.jump);
        assert!(!input.guard);
        assert!(input.move_right);
    }
}
