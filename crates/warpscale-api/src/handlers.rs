//! REST API handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use tracing::warn;

use warpscale_core::{
    LeadershipOracle, MonitorId, MonitorRegistry, ScaleMonitorDescriptor, ScaleStatusContext,
    TriggerMetrics,
};
use warpscale_metrics::ServiceState;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

// ── Scale decision ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ScaleQuery {
    pub worker_count: u32,
}

/// GET /api/v1/scale?worker_count=N
pub async fn get_scale(
    State(state): State<ApiState>,
    Query(query): Query<ScaleQuery>,
) -> impl IntoResponse {
    let context = ScaleStatusContext::new(query.worker_count);
    match state.manager.evaluate(&context).await {
        Ok(evaluation) => ApiResponse::ok(evaluation).into_response(),
        Err(e) => {
            warn!(error = %e, worker_count = query.worker_count, "scale aggregation failed");
            error_response(&e.to_string(), StatusCode::BAD_GATEWAY).into_response()
        }
    }
}

// ── Monitors ───────────────────────────────────────────────────

/// GET /api/v1/monitors
pub async fn list_monitors(State(state): State<ApiState>) -> impl IntoResponse {
    match state.registry.get_monitors() {
        Ok(monitors) => {
            let descriptors: Vec<ScaleMonitorDescriptor> =
                monitors.iter().map(|m| m.descriptor().clone()).collect();
            ApiResponse::ok(descriptors).into_response()
        }
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

#[derive(Serialize)]
pub struct MonitorMetrics {
    pub monitor: MonitorId,
    pub samples: Vec<TriggerMetrics>,
}

/// GET /api/v1/monitors/{id}/metrics
pub async fn get_monitor_metrics(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let id = MonitorId::new(id);
    match state.registry.get(&id) {
        Ok(Some(_)) => {}
        Ok(None) => return error_response("monitor not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => {
            return error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response();
        }
    }

    match state.store.list_samples(&id) {
        Ok(samples) => ApiResponse::ok(MonitorMetrics { monitor: id, samples }).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

// ── Status ─────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatusResponse {
    pub primary: bool,
    pub sampler: &'static str,
    pub interval_ms: u64,
    pub monitors: usize,
    pub max_samples_per_monitor: usize,
}

/// GET /api/v1/status
pub async fn get_status(State(state): State<ApiState>) -> impl IntoResponse {
    let sampler = match state.service.state() {
        ServiceState::Running => "running",
        ServiceState::Stopped => "stopped",
    };

    ApiResponse::ok(StatusResponse {
        primary: state.leadership.is_primary(),
        sampler,
        interval_ms: state.service.interval().as_millis() as u64,
        monitors: state.registry.len(),
        max_samples_per_monitor: state.store.max_samples(),
    })
}
