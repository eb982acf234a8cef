//! Snapshot building

use crate::ws::protocol::{GameEvent, GameSnapshot, PlayerSnapshot, StageSnapshot};

use super::player::Player;
use super::r#match::Arena;
use super::stage::Stage;

/// Builds per-tick snapshots for network transmission
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    /// Last server time handed out, keeps `server_time` non-decreasing
    last_server_time: u64,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the arena as it stands after a tick
    pub fn build(&mut self, arena: &Arena, events: Vec<GameEvent>, now_ms: u64) -> GameSnapshot {
        self.last_server_time = self.last_server_time.max(now_ms);
        let score = arena.score();

        GameSnapshot {
            state: arena.phase(),
            tick: arena.tick_count(),
            server_time: self.last_server_time,
            players: arena.players().map(player_snapshot).collect(),
            stage: arena.stage().map(stage_snapshot),
            scores: score.scores,
            round_winner: score.round_winner,
            match_winner: score.match_winner,
            events,
        }
    }
}

fn player_snapshot(player: &Player) -> PlayerSnapshot {
    PlayerSnapshot {
        id: player.slot,
        character: player.character,
        x: player.x,
        y: player.y,
        vx: player.vx,
        vy: player.vy,
        width: player.width,
        height: player.height,
        facing: player.facing,
        percentage: player.percentage,
        on_ground: player.on_ground,
        is_basic_attacking: player.is_basic_attacking,
        is_special_attacking: player.is_special_attacking,
        is_guarding: player.is_guarding,
        is_ledge_hanging: player.is_hanging(),
    }
}

fn stage_snapshot(stage: &'static Stage) -> StageSnapshot {
    StageSnapshot {
        id: stage.id,
        name: stage.name,
        platforms: stage.platforms,
        background: stage.background,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::player::Slot;
    use crate::game::MatchPhase;

    #[test]
    fn waiting_arena_has_no_players_or_stage() {
        let arena = Arena::new(3);
        let snapshot = SnapshotBuilder::new().build(&arena, Vec::new(), 10);
        assert_eq!(snapshot.state, MatchPhase::Waiting);
        assert!(snapshot.players.is_empty());
        assert!(snapshot.stage.is_none());
        assert_eq!(snapshot.scores, [0, 0]);
    }

    #[test]
    fn playing_arena_reports_both_players() {
        let mut arena = Arena::new(3);
        arena.join(Slot::One, None);
        arena.join(Slot::Two, None);
        let snapshot = SnapshotBuilder::new().build(&arena, Vec::new(), 10);
        assert_eq!(snapshot.state, MatchPhase::Playing);
        assert_eq!(snapshot.players.len(), 2);
        assert_eq!(snapshot.players[0].id, Slot::One);
        assert!(snapshot.stage.is_some());

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["state"], "playing");
        assert_eq!(json["players"][1]["id"], "player2");
        assert_eq!(json["players"][0]["character"], "RED_KNIGHT");
        assert!(json["stage"]["platforms"][0]["width"].is_number());
    }

    #[test]
    fn server_time_never_goes_backwards() {
        let arena = Arena::new(3);
        let mut builder = SnapshotBuilder::new();
        assert_eq!(builder.build(&arena, Vec::new(), 500).server_time, 500);
        assert_eq!(builder.build(&arena, Vec::new(), 400).server_time, 500);
        assert_eq!(builder.build(&arena, Vec::new(), 600).server_time, 600);
    }
}
