//! One evaluation pass for one threshold.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use planit_core::{Task, Threshold, Window};
use planit_notify::{Dispatcher, NotificationPayload};
use planit_store::{StoreError, TaskQuery, TaskStore};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::EvaluateError;

/// Counts for one threshold in one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct ThresholdOutcome {
    pub threshold: Threshold,
    pub label: String,
    pub window: Window,
    /// Tasks the store returned.
    pub candidates: usize,
    /// Confirmed deliveries.
    pub sent: usize,
    /// Sink refused or was unreachable.
    pub failed: usize,
    /// Data problems or tasks the store should not have returned.
    pub skipped: usize,
    /// Delivered but the dedup mark could not be written.
    pub unmarked: usize,
}

impl ThresholdOutcome {
    fn new(threshold: Threshold, window: Window) -> Self {
        Self {
            threshold,
            label: threshold.label(),
            window,
            candidates: 0,
            sent: 0,
            failed: 0,
            skipped: 0,
            unmarked: 0,
        }
    }
}

enum TaskOutcome {
    Sent,
    SentUnmarked,
    Failed,
    Skipped,
}

pub struct ThresholdEvaluator {
    store: Arc<dyn TaskStore>,
    dispatcher: Arc<Dispatcher>,
    interval: chrono::Duration,
    timeout: Duration,
}

impl ThresholdEvaluator {
    /// `interval` is the poll interval (window length); `timeout` bounds
    /// each store call.
    pub fn new(
        store: Arc<dyn TaskStore>,
        dispatcher: Arc<Dispatcher>,
        interval: chrono::Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            dispatcher,
            interval,
            timeout,
        }
    }

    /// Notify every open, not-yet-notified task whose deadline lies in this
    /// threshold's window at `now`.
    ///
    /// Only a failed candidate query is an error. Per-task problems are
    /// logged and counted; they never abort the batch.
    pub async fn evaluate(&self, threshold: Threshold, now: DateTime<Utc>) -> Result<ThresholdOutcome, EvaluateError> {
        let window = Window::for_threshold(threshold, now, self.interval);
        let mut outcome = ThresholdOutcome::new(threshold, window);
        info!(
            threshold = %outcome.label,
            window_start = %window.start,
            window_end = %window.end,
            "Checking for tasks approaching threshold"
        );

        let query = TaskQuery::for_threshold(threshold, window);
        let tasks = self
            .bounded(self.store.find_due(&query))
            .await
            .map_err(|source| EvaluateError::Query {
                label: outcome.label.clone(),
                source,
            })?;
        outcome.candidates = tasks.len();

        for task in &tasks {
            match self.process(task, threshold, &outcome.label, &window, now).await {
                TaskOutcome::Sent => outcome.sent += 1,
                TaskOutcome::SentUnmarked => {
                    outcome.sent += 1;
                    outcome.unmarked += 1;
                }
                TaskOutcome::Failed => outcome.failed += 1,
                TaskOutcome::Skipped => outcome.skipped += 1,
            }
        }

        info!(
            threshold = %outcome.label,
            candidates = outcome.candidates,
            failed = outcome.failed,
            skipped = outcome.skipped,
            "Sent {} notifications for {} threshold",
            outcome.sent,
            outcome.label
        );
        Ok(outcome)
    }

    async fn process(
        &self,
        task: &Task,
        threshold: Threshold,
        label: &str,
        window: &Window,
        now: DateTime<Utc>,
    ) -> TaskOutcome {
        if task.is_completed() || task.was_notified(label) {
            debug!(task_id = %task.id, threshold = %label, "store returned an ineligible task, skipping");
            return TaskOutcome::Skipped;
        }

        let deadline = match task.deadline.resolve() {
            Ok(deadline) => deadline,
            Err(e) => {
                warn!(task_id = %task.id, threshold = %label, error = %e, "skipping task with unparsable deadline");
                return TaskOutcome::Skipped;
            }
        };
        if !window.contains(deadline) {
            debug!(task_id = %task.id, threshold = %label, %deadline, "deadline outside window, skipping");
            return TaskOutcome::Skipped;
        }

        let payload = NotificationPayload::for_task(task, deadline, threshold, now);
        if !self.dispatcher.send(&payload).await {
            return TaskOutcome::Failed;
        }

        match self.bounded(self.store.mark_notified(&task.id, label)).await {
            Ok(true) => TaskOutcome::Sent,
            Ok(false) => {
                warn!(task_id = %task.id, threshold = %label, "dedup marker not added (already present or task gone)");
                TaskOutcome::Sent
            }
            Err(e) => {
                error!(
                    task_id = %task.id,
                    threshold = %label,
                    error = %e,
                    "notification sent but dedup mark failed; a later cycle may repeat it"
                );
                TaskOutcome::SentUnmarked
            }
        }
    }

    async fn bounded<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.timeout.as_millis() as u64)),
        }
    }
}
