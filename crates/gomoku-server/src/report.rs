use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use gomoku_core::GameResult;

use crate::broadcast::ConnId;
use crate::state::AppState;

/// Summary of a finished match, POSTed as JSON to the collaborator endpoint
/// when one is configured. Persistence itself lives elsewhere; this server
/// only emits.
#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub room_id: String,
    pub result: GameResult,
    pub ended_by: &'static str,
    pub move_count: usize,
    /// Display names of the seated players; anonymous seats are null.
    pub players: Vec<Option<String>>,
}

impl MatchReport {
    pub fn new(
        state: &AppState,
        room_id: &str,
        members: &[ConnId],
        result: GameResult,
        ended_by: &'static str,
        move_count: usize,
    ) -> MatchReport {
        MatchReport {
            room_id: room_id.to_string(),
            result,
            ended_by,
            move_count,
            players: members.iter().map(|&id| state.hub.name_of(id)).collect(),
        }
    }
}

/// Fire-and-forget delivery. The coordinator never waits on or inspects the
/// result; failures are logged and dropped.
pub fn spawn_report(state: &Arc<AppState>, report: MatchReport) {
    let url = match &state.config.match_report_url {
        Some(u) => u.clone(),
        None => return,
    };
    let client = state.http.clone();
    tokio::spawn(async move {
        match client.post(&url).json(&report).send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!(room_id = %report.room_id, "match reported");
            }
            Ok(resp) => {
                warn!(room_id = %report.room_id, status = %resp.status(), "match report rejected");
            }
            Err(err) => {
                warn!(room_id = %report.room_id, error = %err, "match report failed");
            }
        }
    });
}
