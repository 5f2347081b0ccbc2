//! Threshold-crossing detection and idempotent dispatch.
//!
//! One cycle walks the configured thresholds in order. For each threshold
//! the [`ThresholdEvaluator`] computes the deadline window, pulls candidate
//! tasks from the store, dispatches a payload per task and records the
//! threshold label in the task's dedup ledger after a confirmed send.
//!
//! Send and mark are two separate steps. A send whose mark fails is logged
//! and may be repeated by a later cycle whose window still covers the task.
//! Two cycles running at once (scheduled tick plus manual trigger) can both
//! pass the dedup check for the same task and threshold before either marks
//! it, producing a duplicate notification. That race is accepted.

pub mod error;
pub mod evaluator;
pub mod liveness;
pub mod metrics;
pub mod orchestrator;
pub mod runner;

pub use error::EvaluateError;
pub use evaluator::{ThresholdEvaluator, ThresholdOutcome};
pub use liveness::{HealthReport, LivenessChecker};
pub use metrics::CycleMetrics;
pub use orchestrator::{CycleOrchestrator, CycleReport, CycleTrigger};
pub use runner::{SchedulerHandle, SchedulerRunner};
