//! Reachability probes feeding the health endpoint.
//!
//! Probe failures are logged and reported as `false`; they never affect
//! notification processing.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use planit_notify::Notifier;
use planit_store::TaskStore;
use serde::Serialize;
use tracing::error;

#[derive(Debug, Clone, Serialize)]
pub struct ComponentStatus {
    pub task_store: &'static str,
    pub scheduler: &'static str,
    pub messaging_queue: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// `"healthy"` when every component is up, else `"unhealthy"`.
    pub status: &'static str,
    pub components: ComponentStatus,
    pub timestamp: String,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

pub struct LivenessChecker {
    store: Arc<dyn TaskStore>,
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
}

impl LivenessChecker {
    pub fn new(store: Arc<dyn TaskStore>, notifier: Arc<dyn Notifier>, timeout: Duration) -> Self {
        Self {
            store,
            notifier,
            timeout,
        }
    }

    pub async fn check_store(&self) -> bool {
        match tokio::time::timeout(self.timeout, self.store.ping()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!(backend = self.store.backend_name(), error = %e, "Task store health check failed");
                false
            }
            Err(_) => {
                error!(backend = self.store.backend_name(), timeout_ms = self.timeout.as_millis() as u64, "Task store health check timed out");
                false
            }
        }
    }

    pub async fn check_sink(&self) -> bool {
        match tokio::time::timeout(self.timeout, self.notifier.health_check()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!(channel = self.notifier.channel_name(), error = %e, "Failed to connect to messaging queue");
                false
            }
            Err(_) => {
                error!(channel = self.notifier.channel_name(), timeout_ms = self.timeout.as_millis() as u64, "Messaging queue health check timed out");
                false
            }
        }
    }

    /// Probe both dependencies concurrently and combine with scheduler liveness.
    pub async fn report(&self, scheduler_running: bool) -> HealthReport {
        let (store_ok, sink_ok) = tokio::join!(self.check_store(), self.check_sink());
        let healthy = store_ok && sink_ok && scheduler_running;

        HealthReport {
            status: if healthy { "healthy" } else { "unhealthy" },
            components: ComponentStatus {
                task_store: if store_ok { "connected" } else { "disconnected" },
                scheduler: if scheduler_running { "running" } else { "stopped" },
                messaging_queue: if sink_ok { "reachable" } else { "unreachable" },
            },
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}
