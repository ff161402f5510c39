//! Downstream service health.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use gamemaster_turn::application::engine::SystemStatus;
use tracing::instrument;

use crate::state::AppState;

/// GET /api/v1/system/status
#[instrument(skip(state))]
async fn system_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(state.engine.system_status().await)
}

/// Returns the system router.
pub fn router() -> Router<AppState> {
    Router::new().route("/status", get(system_status))
}
