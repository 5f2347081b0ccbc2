//! Runs every configured threshold once per cycle.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use planit_core::Threshold;
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::EvaluateError;
use crate::evaluator::{ThresholdEvaluator, ThresholdOutcome};
use crate::metrics::CycleMetrics;

/// What started a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleTrigger {
    Scheduled,
    Manual,
}

/// A threshold whose evaluation failed as a whole.
#[derive(Debug, Clone, Serialize)]
pub struct ThresholdFailure {
    pub label: String,
    pub error: String,
}

/// Summary of one completed cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub trigger: CycleTrigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_sent: usize,
    pub thresholds: Vec<ThresholdOutcome>,
    pub errors: Vec<ThresholdFailure>,
}

impl CycleReport {
    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at).num_milliseconds().max(0) as u64
    }
}

/// Walks the ordered threshold list, one [`ThresholdEvaluator`] pass each.
///
/// Cycles are not serialized against each other: a manual trigger may run
/// alongside a scheduled tick.
pub struct CycleOrchestrator {
    thresholds: Vec<Threshold>,
    evaluator: Arc<ThresholdEvaluator>,
    metrics: Arc<RwLock<CycleMetrics>>,
}

impl CycleOrchestrator {
    pub fn new(thresholds: Vec<Threshold>, evaluator: ThresholdEvaluator) -> Self {
        Self {
            thresholds,
            evaluator: Arc::new(evaluator),
            metrics: Arc::new(RwLock::new(CycleMetrics::default())),
        }
    }

    pub fn thresholds(&self) -> &[Threshold] {
        &self.thresholds
    }

    /// Evaluate every threshold at `now` and return the cycle summary.
    ///
    /// A threshold that errors or panics is logged and recorded in
    /// [`CycleReport::errors`]; the remaining thresholds still run.
    pub async fn run_cycle(&self, now: DateTime<Utc>, trigger: CycleTrigger) -> CycleReport {
        let cycle_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%cycle_id, ?trigger, "Running notification check");

        let mut thresholds = Vec::with_capacity(self.thresholds.len());
        let mut errors = Vec::new();

        for &threshold in &self.thresholds {
            match self.evaluate_guarded(threshold, now).await {
                Ok(outcome) => thresholds.push(outcome),
                Err(e) => {
                    error!(%cycle_id, threshold = %e.label(), error = %e, "Threshold evaluation failed");
                    errors.push(ThresholdFailure {
                        label: e.label().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let total_sent = thresholds.iter().map(|t| t.sent).sum();
        let report = CycleReport {
            cycle_id,
            trigger,
            started_at,
            finished_at: Utc::now(),
            total_sent,
            thresholds,
            errors,
        };

        self.metrics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .record_cycle(&report);
        info!(
            %cycle_id,
            failed_thresholds = report.errors.len(),
            duration_ms = report.duration_ms(),
            "Completed notification check. Sent {} notifications.",
            report.total_sent
        );
        report
    }

    /// Each threshold runs on its own task so a panic surfaces as a
    /// `JoinError` instead of unwinding through the cycle.
    async fn evaluate_guarded(&self, threshold: Threshold, now: DateTime<Utc>) -> Result<ThresholdOutcome, EvaluateError> {
        let evaluator = Arc::clone(&self.evaluator);
        match tokio::spawn(async move { evaluator.evaluate(threshold, now).await }).await {
            Ok(result) => result,
            Err(e) => {
                let message = match e.try_into_panic() {
                    Ok(panic) => panic_message(panic.as_ref()),
                    Err(e) => e.to_string(),
                };
                Err(EvaluateError::Panicked {
                    label: threshold.label(),
                    message,
                })
            }
        }
    }

    /// Snapshot of the running totals.
    pub fn metrics(&self) -> CycleMetrics {
        self.metrics.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn record_skipped_tick(&self) {
        self.metrics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .record_skipped_tick();
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
