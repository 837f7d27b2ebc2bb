//! warpscale-api — REST API for WarpScale.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/scale?worker_count=N` | Aggregate scale decision |
//! | GET | `/api/v1/monitors` | List registered monitors |
//! | GET | `/api/v1/monitors/{id}/metrics` | Retained samples for a monitor |
//! | GET | `/api/v1/status` | Primary flag and sampler state |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;

use warpscale_autoscale::ScaleManager;
use warpscale_core::{MonitorProvider, PrimaryHostState};
use warpscale_metrics::ScaleMonitorService;
use warpscale_state::MetricsStore;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub manager: Arc<ScaleManager>,
    pub registry: Arc<MonitorProvider>,
    pub store: MetricsStore,
    pub leadership: Arc<PrimaryHostState>,
    pub service: Arc<ScaleMonitorService>,
}

/// Build the API router.
pub fn build_router(state: ApiState) -> Router {
    let api_routes = Router::new()
        .route("/scale", get(handlers::get_scale))
        .route("/monitors", get(handlers::list_monitors))
        .route("/monitors/{id}/metrics", get(handlers::get_monitor_metrics))
        .route("/status", get(handlers::get_status))
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}
