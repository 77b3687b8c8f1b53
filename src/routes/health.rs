//! Health check endpoints
//!
//! - `/health` - full health check with dependency status
//! - `/health/ready` - readiness probe
//! - `/health/live` - liveness probe

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Individual dependency check result
#[derive(Debug, Serialize)]
pub struct DependencyCheck {
    pub status: HealthStatus,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DependencyChecks {
    pub store: DependencyCheck,
}

#[derive(Debug, Serialize)]
pub struct HealthStats {
    pub uptime_seconds: u64,
    /// Clicks accepted but not yet written
    pub click_queue_depth: usize,
}

/// Full health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: String,
    pub checks: DependencyChecks,
    pub stats: HealthStats,
}

#[derive(Debug, Serialize)]
pub struct SimpleHealthResponse {
    pub status: HealthStatus,
}

async fn check_store(state: &AppState) -> DependencyCheck {
    let start = Instant::now();

    match state.store.ping().await {
        Ok(()) => DependencyCheck {
            status: HealthStatus::Healthy,
            latency_ms: start.elapsed().as_millis() as u64,
            error: None,
        },
        Err(e) => DependencyCheck {
            status: HealthStatus::Unhealthy,
            latency_ms: start.elapsed().as_millis() as u64,
            error: Some(e.to_string()),
        },
    }
}

/// Full health check endpoint
///
/// The store being down makes the service unhealthy (503). Collaborator
/// services are not probed: the meter degrades around them.
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let store_check = check_store(&state).await;
    let status = store_check.status.clone();

    let response = HealthResponse {
        status: status.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        checks: DependencyChecks { store: store_check },
        stats: HealthStats {
            uptime_seconds: state.start_time.elapsed().as_secs(),
            click_queue_depth: state.click_recorder.queued(),
        },
    };

    let status_code = match status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response))
}

/// Readiness probe endpoint
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<SimpleHealthResponse>) {
    if check_store(&state).await.status == HealthStatus::Unhealthy {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(SimpleHealthResponse {
                status: HealthStatus::Unhealthy,
            }),
        );
    }

    (
        StatusCode::OK,
        Json(SimpleHealthResponse {
            status: HealthStatus::Healthy,
        }),
    )
}

/// Liveness probe endpoint
pub async fn liveness_check() -> (StatusCode, Json<SimpleHealthResponse>) {
    (
        StatusCode::OK,
        Json(SimpleHealthResponse {
            status: HealthStatus::Healthy,
        }),
    )
}
