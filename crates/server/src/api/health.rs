//! Service info, health and operational metrics endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use planit_scheduler::{CycleMetrics, HealthReport};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn index(State(state): State<Arc<AppState>>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "Planit Scheduler",
        status: "running",
        version: state.version,
    })
}

/// 200 when the store, the sink and the scheduler loop are all up, else 503.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthReport>) {
    let report = state.liveness.report(state.scheduler_running()).await;
    let code = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(report))
}

pub async fn scheduler_metrics(State(state): State<Arc<AppState>>) -> Json<CycleMetrics> {
    Json(state.orchestrator.metrics())
}

pub async fn config(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(state.config_summary.clone())
}
