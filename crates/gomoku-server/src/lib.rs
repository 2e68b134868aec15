pub mod broadcast;
pub mod config;
pub mod report;
pub mod routes;
pub mod state;
pub mod ws;

use std::sync::Arc;
use std::time::Instant;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::state::{AppState, RoomPhase};

/// Build a fully configured Router + shared state. Must run inside a tokio
/// runtime (it spawns the cleanup task).
pub fn build_app(config: ServerConfig) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config));

    {
        let state = state.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(state.config.cleanup_interval);
            loop {
                interval.tick().await;
                cleanup(&state);
            }
        });
    }

    let app = Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/ws", get(routes::ws_upgrade))
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    (app, state)
}

fn cleanup(state: &AppState) {
    let now = Instant::now();
    let mut to_remove = Vec::new();

    for mut entry in state.registry.iter_mut() {
        let room = entry.value_mut();

        // Dangling offers must not outlive an abandoned negotiation.
        if room
            .pending_draw
            .map(|o| now.duration_since(o.at) > state.config.offer_ttl)
            .unwrap_or(false)
        {
            debug!(room_id = %room.id, "draw offer expired");
            room.pending_draw = None;
        }
        if room
            .pending_rematch
            .map(|o| now.duration_since(o.at) > state.config.offer_ttl)
            .unwrap_or(false)
        {
            debug!(room_id = %room.id, "rematch request expired");
            room.pending_rematch = None;
        }

        match room.phase {
            RoomPhase::Waiting => {
                if now.duration_since(room.created_at) > state.config.waiting_room_ttl {
                    to_remove.push(room.id.clone());
                }
            }
            RoomPhase::Finished => {
                if now.duration_since(room.last_activity) > state.config.finished_room_ttl {
                    to_remove.push(room.id.clone());
                }
            }
            RoomPhase::Active => {}
        }
    }

    for id in to_remove {
        state.registry.delete(&id);
        info!(room_id = %id, "stale room removed");
    }
}
