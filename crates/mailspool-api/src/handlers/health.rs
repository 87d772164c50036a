//! Health check handlers for service monitoring.
//!
//! Provides liveness, readiness, and health endpoints. Readiness
//! verifies the spool root is present and is a directory, since the
//! service is useless if it cannot persist notifications.

use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error};

use crate::state::AppState;

/// Health check response structure.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service health status.
    pub status: HealthStatus,
    /// Timestamp when the health check was performed.
    pub timestamp: DateTime<Utc>,
    /// Individual component health checks.
    pub checks: HealthChecks,
    /// Service version information.
    pub version: String,
}

/// Overall health status enumeration.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All systems operational.
    Healthy,
    /// Critical systems failing.
    Unhealthy,
}

/// Individual component health check results.
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    /// Spool root accessibility.
    pub spool: ComponentHealth,
}

/// Health status for an individual component.
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    /// Component status.
    pub status: ComponentStatus,
    /// Optional error message if unhealthy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Response time in milliseconds.
    pub response_time_ms: u64,
}

/// Component-level health status.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Component is healthy.
    Up,
    /// Component is experiencing issues.
    Down,
}

/// Primary health check endpoint.
///
/// Returns structured JSON with overall status and per-component
/// details; 503 when any critical component is down.
pub async fn health_check(State(state): State<AppState>) -> Response {
    debug!("performing health check");

    let timestamp = state.clock.now_utc();
    let spool = check_spool(&state).await;

    let status = match spool.status {
        ComponentStatus::Up => HealthStatus::Healthy,
        ComponentStatus::Down => HealthStatus::Unhealthy,
    };

    let http_status = match status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    let response = HealthResponse {
        status,
        timestamp,
        checks: HealthChecks { spool },
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (http_status, Json(response)).into_response()
}

/// Readiness probe: 200 once the spool root is usable.
pub async fn readiness_check(State(state): State<AppState>) -> Response {
    let spool = check_spool(&state).await;
    match spool.status {
        ComponentStatus::Up => {
            (StatusCode::OK, Json(serde_json::json!({ "status": "ready" }))).into_response()
        },
        ComponentStatus::Down => {
            error!(message = ?spool.message, "readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, Json(serde_json::json!({ "status": "not ready" })))
                .into_response()
        },
    }
}

/// Liveness probe: 200 while the process can serve requests at all.
pub async fn liveness_check() -> Response {
    (StatusCode::OK, Json(serde_json::json!({ "status": "alive" }))).into_response()
}

async fn check_spool(state: &AppState) -> ComponentHealth {
    let started = Instant::now();
    let root = state.spool.root().to_path_buf();

    let result = tokio::fs::metadata(&root).await;
    let response_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    match result {
        Ok(meta) if meta.is_dir() => {
            ComponentHealth { status: ComponentStatus::Up, message: None, response_time_ms }
        },
        Ok(_) => ComponentHealth {
            status: ComponentStatus::Down,
            message: Some(format!("spool root {} is not a directory", root.display())),
            response_time_ms,
        },
        Err(e) => ComponentHealth {
            status: ComponentStatus::Down,
            message: Some(format!("spool root {} inaccessible: {e}", root.display())),
            response_time_ms,
        },
    }
}
