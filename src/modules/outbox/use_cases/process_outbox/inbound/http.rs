use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tokio_util::sync::CancellationToken;

use crate::shell::state::AppState;

/// Runs one pass right away, outside the poll interval.
pub async fn handle(State(state): State<AppState>) -> impl IntoResponse {
    match state.scheduler.run_pass(&CancellationToken::new()).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}
