//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{ArenaCommand, CharacterType, MatchHandle, Slot};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

type WsSink = futures::stream::SplitSink<WebSocket, Message>;
type WsStream = futures::stream::SplitStream<WebSocket>;

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Optional character pick, e.g. `blue_ninja`
    pub character: Option<String>,
}

impl WsQuery {
    /// Unknown names fall back to the slot default
    fn character(&self) -> Option<CharacterType> {
        let name = self.character.as_deref()?;
        serde_json::from_value(serde_json::Value::String(name.to_string())).ok()
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let character = query.character();
    if query.character.is_some() && character.is_none() {
        warn!(requested = ?query.character, "Unknown character requested, using default");
    }
    ws.on_upgrade(move |socket| handle_socket(socket, character, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, character: Option<CharacterType>, state: AppState) {
    let connection_id = Uuid::new_v4();
    let (mut ws_sink, ws_stream) = socket.split();
    let arena = state.arena.clone();

    let slot = match arena.acquire_slot(connection_id) {
        Ok(slot) => slot,
        Err(e) => {
            info!(connection_id = %connection_id, "Rejecting connection: {}", e);
            let _ = send_msg(&mut ws_sink, &ServerMsg::Error(e.to_string())).await;
            let _ = ws_sink.close().await;
            return;
        }
    };

    info!(connection_id = %connection_id, slot = %slot, "New WebSocket connection");

    // Subscribe before joining so no state after the join is missed
    let snapshot_rx = arena.subscribe();

    if let Err(e) = send_msg(&mut ws_sink, &ServerMsg::YourPlayerId(slot)).await {
        error!(connection_id = %connection_id, error = %e, "Failed to send slot assignment");
        arena.release_slot(slot, connection_id);
        return;
    }
    if let Some(snapshot) = arena.latest_snapshot() {
        if let Err(e) = send_msg(&mut ws_sink, &ServerMsg::GameState(snapshot)).await {
            debug!(connection_id = %connection_id, error = %e, "Failed to send initial state");
        }
    }

    if arena.send(ArenaCommand::Join { slot, character }).await {
        let limiter = ConnectionRateLimiter::new(state.config.input_rate_limit);
        run_session(connection_id, slot, &arena, limiter, ws_sink, ws_stream, snapshot_rx).await;
    } else {
        error!(connection_id = %connection_id, "Arena task is gone");
    }

    // Leave is queued before the slot frees up, so a reconnect's join lands after it
    let _ = arena.send(ArenaCommand::Leave { slot }).await;
    arena.release_slot(slot, connection_id);

    info!(connection_id = %connection_id, slot = %slot, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    connection_id: Uuid,
    slot: Slot,
    arena: &MatchHandle,
    rate_limiter: ConnectionRateLimiter,
    mut ws_sink: WsSink,
    mut ws_stream: WsStream,
    mut snapshot_rx: broadcast::Receiver<ServerMsg>,
) {
    // Replies addressed to this connection only
    let (direct_tx, mut direct_rx) = mpsc::channel::<ServerMsg>(16);

    // Writer task: broadcast state and direct replies -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                direct = direct_rx.recv() => match direct {
                    Some(msg) => msg,
                    None => break,
                },
                broadcast = snapshot_rx.recv() => match broadcast {
                    Ok(msg) => msg,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(
                            connection_id = %connection_id,
                            lagged_count = n,
                            "Client lagged, skipping {} snapshots", n
                        );
                        // Continue - don't disconnect for lag
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(connection_id = %connection_id, "Snapshot channel closed");
                        break;
                    }
                },
            };
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> arena
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(connection_id = %connection_id, "Rate limited inbound message");
                    continue;
                }

                let command = match ClientMsg::parse(&text) {
                    Ok(ClientMsg::Input(input)) => ArenaCommand::Input { slot, input },
                    Ok(ClientMsg::RequestNextRound) => ArenaCommand::NextRound { slot },
                    Ok(ClientMsg::RequestNewMatch) => ArenaCommand::NewMatch { slot },
                    Ok(ClientMsg::Ping { t }) => {
                        let _ = direct_tx.send(ServerMsg::Pong { t }).await;
                        continue;
                    }
                    Err(e) => {
                        warn!(connection_id = %connection_id, error = %e, "Failed to parse client message");
                        continue;
                    }
                };

                if !arena.send(command).await {
                    debug!(connection_id = %connection_id, "Command channel closed");
                    break;
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(connection_id = %connection_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(connection_id = %connection_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(connection_id = %connection_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut WsSink, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
