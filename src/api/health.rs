use crate::api::AppState;
use crate::pool::{ConnectionState, PoolStatus};
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    connection: ConnectionState,
    connection_since: DateTime<Utc>,
    timestamp: DateTime<Utc>,
    uptime_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pool: Option<PoolStatus>,
}

/// Reports lifecycle state without touching the engine. Always 200, so
/// liveness probes never trigger or wait on initialization.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let health = state.lifecycle.health();

    Json(HealthResponse {
        status: match health.state {
            ConnectionState::Ready => "healthy",
            ConnectionState::Uninitialized | ConnectionState::Initializing => "starting",
            ConnectionState::Failed => "unhealthy",
        },
        connection: health.state,
        connection_since: health.since,
        timestamp: Utc::now(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        error: health.error,
        pool: health.pool,
    })
}
