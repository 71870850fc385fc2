use axum::{extract::State, Json};
use serde::Serialize;

use super::state::AppState;

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub uptime_seconds: u64,
}

/// Liveness only; never touches storage.
pub async fn readyz(State(state): State<AppState>) -> Json<ReadyResponse> {
    Json(ReadyResponse {
        status: "ok",
        uptime_seconds: state.uptime_seconds(),
    })
}
