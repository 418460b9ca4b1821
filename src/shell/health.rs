// Liveness of the relay, judged by how long ago a pass last completed.
//
// The scheduler records every successful pass. The probe compares the last
// success against the clock and a maximum staleness.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::shell::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Default)]
pub struct PassHealth {
    last_success: RwLock<Option<DateTime<Utc>>>,
}

impl PassHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_success(&self, at: DateTime<Utc>) {
        *self.last_success.write().await = Some(at);
    }

    pub async fn last_success(&self) -> Option<DateTime<Utc>> {
        *self.last_success.read().await
    }

    /// Unhealthy until the first pass succeeds, and again once the last success is older than
    /// `max_staleness`.
    pub async fn status(&self, now: DateTime<Utc>, max_staleness: TimeDelta) -> HealthStatus {
        match self.last_success().await {
            Some(at) if now - at <= max_staleness => HealthStatus::Healthy,
            _ => HealthStatus::Unhealthy,
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub last_successful_pass: Option<DateTime<Utc>>,
}

pub async fn handle(State(state): State<AppState>) -> impl IntoResponse {
    let status = state
        .health
        .status(state.clock.now(), state.health_max_staleness)
        .await;
    let code = match status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (
        code,
        Json(HealthResponse {
            status,
            last_successful_pass: state.health.last_success().await,
        }),
    )
}
