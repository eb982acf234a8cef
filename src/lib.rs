//! Brawl Server - authoritative two-player platform fighter
//!
//! The simulation core lives in [`game`]; [`ws`] and [`http`] expose it over
//! a WebSocket endpoint with a health check.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod util;
pub mod ws;

pub use app::AppState;
pub use config::{Config, ConfigError};
pub use game::{Arena, ArenaCommand, ArenaError, GameMatch, MatchHandle, MatchPhase, SlotError};
