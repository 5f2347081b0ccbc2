//! Sends payloads to the configured sink and reports the outcome.
//!
//! The dispatcher never retries. A failed send is logged and reported as
//! unsuccessful; whether the task gets another chance is decided by the
//! next cycle's window, not here.

use std::sync::Arc;
use std::time::Instant;

use crate::payload::NotificationPayload;
use crate::traits::{DispatchResult, Notifier};

pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
}

impl Dispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// The underlying sink (used by liveness probes).
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        Arc::clone(&self.notifier)
    }

    /// Deliver `payload`, returning a timed result. Never fails.
    pub async fn dispatch(&self, payload: &NotificationPayload) -> DispatchResult {
        let start = Instant::now();
        let result = self.notifier.send(payload).await;
        let duration_ms = start.elapsed().as_millis() as u64;
        let channel = self.notifier.channel_name();

        let (success, error) = match result {
            Ok(()) => {
                tracing::info!(
                    task_id = %payload.task_id,
                    threshold = %payload.notification_threshold,
                    channel,
                    duration_ms,
                    "Notification sent"
                );
                (true, None)
            }
            Err(e) => {
                tracing::error!(
                    task_id = %payload.task_id,
                    threshold = %payload.notification_threshold,
                    channel,
                    timeout = e.is_timeout(),
                    error = %e,
                    duration_ms,
                    "Notification delivery failed"
                );
                (false, Some(e.to_string()))
            }
        };

        DispatchResult {
            channel: channel.to_string(),
            task_id: payload.task_id.clone(),
            threshold: payload.notification_threshold.clone(),
            success,
            error,
            duration_ms,
        }
    }

    /// `true` only when the sink confirmed delivery.
    pub async fn send(&self, payload: &NotificationPayload) -> bool {
        self.dispatch(payload).await.success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{TimeZone, Utc};
    use planit_core::{Task, Threshold};

    use crate::traits::NotifyError;

    struct MockNotifier {
        send_count: Arc<AtomicUsize>,
        should_fail: bool,
    }

    #[async_trait::async_trait]
    impl Notifier for MockNotifier {
        async fn send(&self, _payload: &NotificationPayload) -> Result<(), NotifyError> {
            self.send_count.fetch_add(1, Ordering::SeqCst);
            if self.should_fail {
                Err(NotifyError::Status {
                    status: 500,
                    body: "boom".to_string(),
                })
            } else {
                Ok(())
            }
        }

        async fn health_check(&self) -> Result<(), NotifyError> {
            Ok(())
        }

        fn channel_name(&self) -> &str {
            "mock"
        }
    }

    fn payload() -> NotificationPayload {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let deadline = Utc.with_ymd_and_hms(2025, 3, 10, 21, 0, 0).unwrap();
        let task = Task::new("t-9", "u-1", "Renew passport", deadline);
        NotificationPayload::for_task(&task, deadline, Threshold::hours(12), now)
    }

    #[tokio::test]
    async fn successful_send_reports_success() {
        let count = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::new(Arc::new(MockNotifier {
            send_count: count.clone(),
            should_fail: false,
        }));

        let result = dispatcher.dispatch(&payload()).await;
        assert!(result.success);
        assert!(result.error.is_none());
        assert_eq!(result.channel, "mock");
        assert_eq!(result.task_id, "t-9");
        assert_eq!(result.threshold, "12");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_send_is_reported_not_raised() {
        let count = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::new(Arc::new(MockNotifier {
            send_count: count.clone(),
            should_fail: true,
        }));

        assert!(!dispatcher.send(&payload()).await);
        let result = dispatcher.dispatch(&payload()).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("500"));
        assert_eq!(count.load(Ordering::SeqCst), 2); // no retries
    }
}
