//! HTTP API endpoints.
//!
//! Read-only view of the room for dashboards and health checks.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::game::LeaderboardEntry;
use crate::state::AppState;

/// Summary of the last finished game
#[derive(Debug, Clone, Serialize)]
pub struct LastGame {
    pub session_id: String,
    pub resolved: bool,
    pub rounds_played: usize,
    pub rounds_skipped: usize,
    pub standings: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub game_running: bool,
    pub catalog: String,
    pub lyrics: String,
    pub last_game: Option<LastGame>,
}

/// Room status.
///
/// GET /api/status
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let last_game = state.last_report().await.map(|report| LastGame {
        standings: report.leaderboard.standings(),
        session_id: report.session_id,
        resolved: report.resolved,
        rounds_played: report.rounds_played,
        rounds_skipped: report.rounds_skipped,
    });

    Json(StatusResponse {
        game_running: state.is_game_running().await,
        catalog: state.catalog.name().to_string(),
        lyrics: state.lyrics.name().to_string(),
        last_game,
    })
}
