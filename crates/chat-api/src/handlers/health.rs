//! Health check handlers
//!
//! Endpoints for liveness and readiness probes.

use axum::{extract::State, http::StatusCode, Json};
use chat_realtime::RouterStats;
use chat_service::dto::{HealthResponse, ReadinessResponse};

use crate::response::{ApiError, ApiResult};
use crate::state::AppState;

/// Basic health check (liveness probe)
///
/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Readiness check with dependency health
///
/// GET /health/ready
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let db_healthy = state.pool().acquire().await.is_ok();
    let router_healthy = state.event_router().stats().await.is_ok();

    let response = ReadinessResponse::ready(db_healthy, router_healthy);
    let status = if response.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// Event router counters
///
/// GET /health/realtime
pub async fn realtime_stats(State(state): State<AppState>) -> ApiResult<Json<RouterStats>> {
    state
        .event_router()
        .stats()
        .await
        .map(Json)
        .map_err(|e| ApiError::Unavailable(e.to_string()))
}
