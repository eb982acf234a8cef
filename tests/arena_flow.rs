use std::time::Duration;

use tokio::sync::broadcast;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

use brawl_server::game::{CharacterType, InputState, Slot};
use brawl_server::ws::protocol::{GameSnapshot, ServerMsg};
use brawl_server::{Arena, ArenaCommand, GameMatch, MatchHandle, MatchPhase, SlotError};

fn spawn_arena(seed: u64) -> MatchHandle {
    let (game_match, handle) = GameMatch::new(Arena::new(seed));
    tokio::spawn(game_match.run());
    handle
}

async fn next_state<F>(rx: &mut broadcast::Receiver<ServerMsg>, pred: F) -> GameSnapshot
where
    F: Fn(&GameSnapshot) -> bool,
{
    let wait = async {
        loop {
            match rx.recv().await {
                Ok(ServerMsg::GameState(snapshot)) if pred(&snapshot) => return snapshot,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("arena stopped"),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(2), wait)
        .await
        .expect("timed out waiting for state")
}

async fn join_both(handle: &MatchHandle) -> [Uuid; 2] {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let first = assert_ok!(handle.acquire_slot(a));
    let second = assert_ok!(handle.acquire_slot(b));
    assert_eq!((first, second), (Slot::One, Slot::Two));

    assert!(
        handle
            .send(ArenaCommand::Join {
                slot: first,
                character: None,
            })
            .await
    );
    assert!(
        handle
            .send(ArenaCommand::Join {
                slot: second,
                character: Some(CharacterType::RedKnight),
            })
            .await
    );
    [a, b]
}

#[tokio::test]
async fn two_joins_start_play_and_third_is_rejected() {
    let handle = spawn_arena(11);
    let mut rx = handle.subscribe();
    join_both(&handle).await;

    let err = assert_err!(handle.acquire_slot(Uuid::new_v4()));
    assert_eq!(err, SlotError::Full);
    assert_eq!(err.to_string(), "Game is full");

    let snapshot = next_state(&mut rx, |s| s.state == MatchPhase::Playing).await;
    assert_eq!(snapshot.players.len(), 2);
    assert!(snapshot.stage.is_some());
    assert_eq!(snapshot.players[1].character, CharacterType::RedKnight);
    assert_eq!(snapshot.scores, [0, 0]);
}

#[tokio::test]
async fn ticks_advance_with_monotonic_server_time() {
    let handle = spawn_arena(12);
    let mut rx = handle.subscribe();
    join_both(&handle).await;

    let first = next_state(&mut rx, |s| s.state == MatchPhase::Playing && s.tick > 0).await;
    let later = next_state(&mut rx, |s| s.tick >= first.tick + 5).await;
    assert!(later.server_time >= first.server_time);

    let latest = handle.latest_snapshot().expect("snapshot published");
    assert!(latest.tick >= later.tick);
}

#[tokio::test]
async fn input_moves_player() {
    let handle = spawn_arena(13);
    let mut rx = handle.subscribe();
    join_both(&handle).await;

    let start = next_state(&mut rx, |s| s.state == MatchPhase::Playing).await;
    let x0 = start.players[0].x;

    assert!(
        handle
            .send(ArenaCommand::Input {
                slot: Slot::One,
                input: InputState {
                    move_right: true,
                    ..Default::default()
                },
            })
            .await
    );
    next_state(&mut rx, |s| {
        s.state != MatchPhase::Playing || s.players.first().is_some_and(|p| p.x > x0 + 1.0)
    })
    .await;
}

#[tokio::test]
async fn leaving_mid_match_notifies_and_returns_to_waiting() {
    let handle = spawn_arena(14);
    let mut rx = handle.subscribe();
    let [_, b] = join_both(&handle).await;
    next_state(&mut rx, |s| s.state == MatchPhase::Playing).await;

    assert!(handle.send(ArenaCommand::Leave { slot: Slot::Two }).await);
    handle.release_slot(Slot::Two, b);

    let notified = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if let Ok(ServerMsg::OpponentLeft {}) = rx.recv().await {
                return;
            }
        }
    })
    .await;
    assert_ok!(notified);

    let waiting = next_state(&mut rx, |s| s.state == MatchPhase::Waiting).await;
    assert!(waiting.players.is_empty());
    assert_eq!(handle.connected(), 1);

    // The freed slot can be taken again
    assert_eq!(assert_ok!(handle.acquire_slot(Uuid::new_v4())), Slot::Two);
}
