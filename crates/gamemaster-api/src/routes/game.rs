//! Turn processing and session history.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use gamemaster_core::play_log::PlayLogEntry;
use gamemaster_turn::application::engine::{NpcTurnResult, PlayerTurnResult};
use serde::Deserialize;
use tracing::instrument;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for a player turn.
#[derive(Debug, Deserialize)]
pub struct PlayerTurnRequest {
    /// Session to play in.
    pub session_id: String,
    /// The player's action, in free text.
    pub content: String,
}

/// Request body for a standalone NPC turn.
#[derive(Debug, Deserialize)]
pub struct NpcTurnRequest {
    /// Session to play in.
    pub session_id: String,
}

/// POST /api/v1/game/turn
#[instrument(skip(state, request), fields(session_id = %request.session_id))]
async fn player_turn(
    State(state): State<AppState>,
    Json(request): Json<PlayerTurnRequest>,
) -> Result<Json<PlayerTurnResult>, ApiError> {
    let result = state
        .engine
        .process_player_turn(&request.session_id, &request.content)
        .await?;
    Ok(Json(result))
}

/// POST /api/v1/game/npc-turn
#[instrument(skip(state, request), fields(session_id = %request.session_id))]
async fn npc_turn(
    State(state): State<AppState>,
    Json(request): Json<NpcTurnRequest>,
) -> Result<Json<NpcTurnResult>, ApiError> {
    let result = state.engine.process_npc_turn(&request.session_id).await?;
    Ok(Json(result))
}

/// GET /api/v1/game/history/{session_id}
#[instrument(skip(state))]
async fn history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<PlayLogEntry>>, ApiError> {
    let entries = state.engine.get_session_history(&session_id).await?;
    Ok(Json(entries))
}

/// Returns the game router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/turn", post(player_turn))
        .route("/npc-turn", post(npc_turn))
        .route("/history/{session_id}", get(history))
}
