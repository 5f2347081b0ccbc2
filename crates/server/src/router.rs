//! HTTP router construction.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::api;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>, cors_origin: &str) -> Router {
    Router::new()
        .route("/", get(api::index))
        .route("/health", get(api::health))
        .route("/trigger", post(api::trigger))
        .route("/scheduler/metrics", get(api::scheduler_metrics))
        .route("/config", get(api::config))
        .layer(cors_layer(cors_origin))
        .with_state(state)
}

/// `*` allows any origin; anything else is matched exactly.
fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::permissive();
    }
    match HeaderValue::from_str(origin) {
        Ok(value) => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(value))
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => {
            warn!(origin, "invalid CORS_ORIGIN, allowing any origin");
            CorsLayer::permissive()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use http_body_util::BodyExt;
    use planit_core::{default_thresholds, Task};
    use planit_notify::{Dispatcher, NotificationPayload, Notifier, NotifyError};
    use planit_scheduler::{CycleOrchestrator, LivenessChecker, ThresholdEvaluator};
    use planit_store::{InMemoryTaskStore, TaskStore};
    use tower::ServiceExt;

    #[derive(Default)]
    struct CountingNotifier {
        sent: AtomicUsize,
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        async fn send(&self, _payload: &NotificationPayload) -> Result<(), NotifyError> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn health_check(&self) -> Result<(), NotifyError> {
            Ok(())
        }
        fn channel_name(&self) -> &str {
            "counting"
        }
    }

    fn app(tasks: Vec<Task>, running: bool) -> (Router, Arc<CountingNotifier>) {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::with_tasks(tasks));
        let notifier = Arc::new(CountingNotifier::default());
        let evaluator = ThresholdEvaluator::new(
            Arc::clone(&store),
            Arc::new(Dispatcher::new(notifier.clone())),
            chrono::Duration::minutes(15),
            Duration::from_secs(5),
        );
        let state = Arc::new(AppState {
            orchestrator: Arc::new(CycleOrchestrator::new(default_thresholds(), evaluator)),
            liveness: LivenessChecker::new(store, notifier.clone(), Duration::from_secs(5)),
            scheduler_running: Arc::new(AtomicBool::new(running)),
            config_summary: serde_json::json!({ "profile": "default" }),
            version: "0.1.0",
        });
        (build_router(state, "*"), notifier)
    }

    async fn send(router: Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn index_reports_service_info() {
        let (router, _) = app(vec![], true);
        let (status, body) = send(router, "GET", "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "Planit Scheduler");
        assert_eq!(body["status"], "running");
        assert_eq!(body["version"], "0.1.0");
    }

    #[tokio::test]
    async fn health_is_ok_when_everything_is_up() {
        let (router, _) = app(vec![], true);
        let (status, body) = send(router, "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["components"]["task_store"], "connected");
    }

    #[tokio::test]
    async fn health_is_unavailable_when_scheduler_stopped() {
        let (router, _) = app(vec![], false);
        let (status, body) = send(router, "GET", "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["components"]["scheduler"], "stopped");
    }

    #[tokio::test]
    async fn trigger_runs_a_manual_cycle() {
        let due = Utc::now() + chrono::Duration::minutes(10);
        let (router, notifier) = app(vec![Task::new("t1", "u1", "Pay invoice", due)], true);

        let (status, body) = send(router.clone(), "POST", "/trigger").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["total_sent"], 1);
        assert_eq!(body["message"], "Notification check completed. Sent 1 notifications.");
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 1);

        let (_, metrics) = send(router, "GET", "/scheduler/metrics").await;
        assert_eq!(metrics["manual_cycles"], 1);
        assert_eq!(metrics["notifications_sent"], 1);
    }

    #[tokio::test]
    async fn config_is_served() {
        let (router, _) = app(vec![], true);
        let (status, body) = send(router, "GET", "/config").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["profile"], "default");
    }
}
