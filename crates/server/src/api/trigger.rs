//! Manual notification check.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use planit_scheduler::CycleTrigger;
use serde::Serialize;
use tracing::{error, info};

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_sent: Option<usize>,
    pub timestamp: String,
}

/// Run one cycle right away and wait for it.
///
/// The cycle runs on its own task so that a panic escaping the orchestrator
/// becomes a 500 instead of dropping the connection. It may overlap a
/// scheduled cycle.
pub async fn trigger(State(state): State<Arc<AppState>>) -> (StatusCode, Json<TriggerResponse>) {
    info!("Manual notification check triggered");
    let orchestrator = Arc::clone(&state.orchestrator);
    let cycle = tokio::spawn(async move { orchestrator.run_cycle(Utc::now(), CycleTrigger::Manual).await });

    match cycle.await {
        Ok(report) => (
            StatusCode::OK,
            Json(TriggerResponse {
                status: "success",
                message: format!("Notification check completed. Sent {} notifications.", report.total_sent),
                total_sent: Some(report.total_sent),
                timestamp: Utc::now().to_rfc3339(),
            }),
        ),
        Err(e) => {
            error!(error = %e, "Manual notification check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(TriggerResponse {
                    status: "error",
                    message: e.to_string(),
                    total_sent: None,
                    timestamp: Utc::now().to_rfc3339(),
                }),
            )
        }
    }
}
