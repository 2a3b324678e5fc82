//! Health Routes
//!
//! Health check endpoints for monitoring and Kubernetes probes.
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (hub is processing events)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::error::ApiResult;
use crate::api::state::AppState;

/// GET /health/live
///
/// Kubernetes liveness probe.
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Kubernetes readiness probe.
/// Returns 200 once the hub answers a stats query.
pub async fn readiness(State(state): State<Arc<AppState>>) -> ApiResult<StatusCode> {
    state.hub.stats().await?;
    Ok(StatusCode::OK)
}

/// GET /health
///
/// Full health status with registry details.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let stats = state.hub.stats().await;

    let (status, hub) = if stats.is_ok() {
        ("healthy", "ok")
    } else {
        ("unhealthy", "stopped")
    };
    let stats = stats.unwrap_or_default();

    Json(HealthResponse {
        status: status.to_string(),
        hub: hub.to_string(),
        translator: state.translator.clone(),
        connections: stats.connections,
        speakers: stats.speakers,
        audience: stats.audience,
        languages: stats.languages,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
