//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{Arena, GameMatch, MatchHandle};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub arena: MatchHandle,
}

impl AppState {
    /// Build the state along with the arena task that must be spawned
    pub fn new(config: Config) -> (Self, GameMatch) {
        let config = Arc::new(config);

        let seed = config.arena_seed.unwrap_or_else(rand::random);
        let (game_match, arena) = GameMatch::new(Arena::new(seed));

        (Self { config, arena }, game_match)
    }
}
