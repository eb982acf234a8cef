//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::app::AppState;
use crate::game::MatchPhase;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins(&state.config.client_origins))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// No configured origins allows any
fn allowed_origins(origins: &[String]) -> AllowOrigin {
    if origins.is_empty() {
        return AllowOrigin::any();
    }
    let values: Vec<header::HeaderValue> = origins
        .iter()
        .filter_map(|s| s.parse::<header::HeaderValue>().ok())
        .collect();
    AllowOrigin::list(values)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    phase: MatchPhase,
    participants: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let phase = state
        .arena
        .latest_snapshot()
        .map(|s| s.state)
        .unwrap_or(MatchPhase::Waiting);

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        phase,
        participants: state.arena.connected(),
    })
}
