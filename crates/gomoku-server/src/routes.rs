use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::state::AppState;
use crate::ws;

pub async fn root() -> &'static str {
    "Gomoku server is running."
}

pub async fn health() -> &'static str {
    "ok"
}

// ── WebSocket upgrade ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Optional display name; connections work fine fully anonymous.
    pub name: Option<String>,
}

pub async fn ws_upgrade(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, StatusCode> {
    if state.hub.connection_count() as u32 >= state.config.max_connections {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(ws.on_upgrade(move |socket| ws::handle_socket(state, socket, query.name)))
}
