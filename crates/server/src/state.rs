use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use planit_scheduler::{CycleOrchestrator, LivenessChecker};

pub struct AppState {
    pub orchestrator: Arc<CycleOrchestrator>,
    pub liveness: LivenessChecker,
    /// Cleared by the runner when its loop exits.
    pub scheduler_running: Arc<AtomicBool>,
    /// Redacted config snapshot served at `/config`.
    pub config_summary: serde_json::Value,
    pub version: &'static str,
}

impl AppState {
    pub fn scheduler_running(&self) -> bool {
        self.scheduler_running.load(Ordering::Relaxed)
    }
}
