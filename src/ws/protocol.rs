//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::game::character::CharacterType;
use crate::game::combat::AttackKind;
use crate::game::ledge::LedgeRelease;
use crate::game::player::Slot;
use crate::game::stage::Platform;
use crate::game::{InputState, MatchPhase};

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMsg {
    /// Latest button state, replaces whatever was latched before
    Input(InputState),
    /// Ask for the next round after a round ended
    RequestNextRound,
    /// Ask for a fresh match after a match ended
    RequestNewMatch,
    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Envelope every client message arrives in: `{"type": .., "payload": ..}`
#[derive(Debug, Deserialize)]
struct RawClientMsg {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

/// Client message decoding errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown message type: {0}")]
    UnknownType(String),
}

impl ClientMsg {
    /// Decode a text frame. Input payloads are decoded leniently so a bad
    /// payload reads as "nothing pressed" instead of being dropped.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let raw: RawClientMsg = serde_json::from_str(text)?;
        match raw.kind.as_str() {
            "input" => Ok(ClientMsg::Input(InputState::from_value(&raw.payload))),
            "request_next_round" => Ok(ClientMsg::RequestNextRound),
            "request_new_match" => Ok(ClientMsg::RequestNewMatch),
            "ping" => {
                let t = raw
                    .payload
                    .get("t")
                    .and_then(Value::as_u64)
                    .or_else(|| raw.payload.as_u64())
                    .unwrap_or(0);
                Ok(ClientMsg::Ping { t })
            }
            _ => Err(ProtocolError::UnknownType(raw.kind)),
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Slot assigned to this connection
    YourPlayerId(Slot),

    /// Authoritative state, once per tick
    GameState(GameSnapshot),

    /// A participant left mid-match; the arena is back to waiting
    OpponentLeft {},

    /// A participant left while no match was running
    PlayerLeft { player_id: Slot },

    /// Error message
    Error(String),

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

/// Full authoritative state for one tick
#[derive(Debug, Clone, Serialize)]
pub struct GameSnapshot {
    pub state: MatchPhase,
    /// Simulation tick counter
    pub tick: u64,
    /// Milliseconds since server start (monotonic)
    pub server_time: u64,
    pub players: Vec<PlayerSnapshot>,
    pub stage: Option<StageSnapshot>,
    pub scores: [u32; 2],
    pub round_winner: Option<Slot>,
    pub match_winner: Option<Slot>,
    /// Events that occurred during this tick
    pub events: Vec<GameEvent>,
}

/// Player state in a snapshot
#[derive(Debug, Clone, Serialize)]
pub struct PlayerSnapshot {
    pub id: Slot,
    pub character: CharacterType,
    /// Top-left X
    pub x: f32,
    /// Top-left Y (grows downward)
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub width: f32,
    pub height: f32,
    /// +1 facing right, -1 facing left
    pub facing: f32,
    pub percentage: f32,
    pub on_ground: bool,
    pub is_basic_attacking: bool,
    pub is_special_attacking: bool,
    pub is_guarding: bool,
    pub is_ledge_hanging: bool,
}

/// Active stage in a snapshot
#[derive(Debug, Clone, Serialize)]
pub struct StageSnapshot {
    pub id: &'static str,
    pub name: &'static str,
    pub platforms: &'static [Platform],
    pub background: &'static str,
}

/// Game events (hits, ledge grabs, round results)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum GameEvent {
    /// Stage picked for a new round
    StageSelected { stage: &'static str },

    /// Unguarded hit registered
    Hit {
        attacker: Slot,
        target: Slot,
        attack: AttackKind,
        damage: f32,
        /// Target percentage after the hit
        percentage: f32,
    },

    /// Hit absorbed by guard
    Blocked {
        attacker: Slot,
        target: Slot,
        attack: AttackKind,
    },

    LedgeGrabbed { player: Slot },

    LedgeReleased {
        player: Slot,
        release: LedgeRelease,
    },

    /// A player left the arena bounds
    RoundEnd { winner: Slot, loser: Slot },

    MatchEnd { winner: Slot },
}
