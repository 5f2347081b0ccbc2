use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::orchestrator::{CycleReport, CycleTrigger};

/// Scheduler operational metrics exposed over HTTP.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleMetrics {
    /// Cycles completed, by any trigger.
    pub cycles_run: u64,
    pub scheduled_cycles: u64,
    pub manual_cycles: u64,
    /// Confirmed deliveries across all cycles.
    pub notifications_sent: u64,
    /// Confirmed deliveries by threshold label.
    pub sent_by_threshold: HashMap<String, u64>,
    pub dispatch_failures: u64,
    /// Sends whose dedup mark could not be written.
    pub unmarked_sends: u64,
    /// Thresholds whose evaluation failed outright.
    pub threshold_errors: u64,
    /// Scheduled ticks dropped for arriving later than the misfire grace.
    pub skipped_ticks: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub last_cycle_sent: Option<usize>,
    pub last_cycle_duration_ms: Option<u64>,
}

impl CycleMetrics {
    /// Fold a finished cycle into the totals.
    pub fn record_cycle(&mut self, report: &CycleReport) {
        self.cycles_run += 1;
        match report.trigger {
            CycleTrigger::Scheduled => self.scheduled_cycles += 1,
            CycleTrigger::Manual => self.manual_cycles += 1,
        }

        for outcome in &report.thresholds {
            *self.sent_by_threshold.entry(outcome.label.clone()).or_default() += outcome.sent as u64;
            self.dispatch_failures += outcome.failed as u64;
            self.unmarked_sends += outcome.unmarked as u64;
        }
        self.notifications_sent += report.total_sent as u64;
        self.threshold_errors += report.errors.len() as u64;

        self.last_cycle_at = Some(report.started_at);
        self.last_cycle_sent = Some(report.total_sent);
        self.last_cycle_duration_ms = Some(report.duration_ms());
    }

    pub fn record_skipped_tick(&mut self) {
        self.skipped_ticks += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use planit_core::{Threshold, Window};
    use uuid::Uuid;

    use crate::evaluator::ThresholdOutcome;
    use crate::orchestrator::ThresholdFailure;

    fn outcome(hours: u32, sent: usize, failed: usize) -> ThresholdOutcome {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let threshold = Threshold::hours(hours);
        ThresholdOutcome {
            threshold,
            label: threshold.label(),
            window: Window::for_threshold(threshold, now, Duration::minutes(15)),
            candidates: sent + failed,
            sent,
            failed,
            skipped: 0,
            unmarked: 0,
        }
    }

    fn report(trigger: CycleTrigger, thresholds: Vec<ThresholdOutcome>, errors: usize) -> CycleReport {
        let started_at = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        CycleReport {
            cycle_id: Uuid::new_v4(),
            trigger,
            started_at,
            finished_at: started_at + Duration::milliseconds(250),
            total_sent: thresholds.iter().map(|t| t.sent).sum(),
            thresholds,
            errors: (0..errors)
                .map(|_| ThresholdFailure {
                    label: "6".into(),
                    error: "boom".into(),
                })
                .collect(),
        }
    }

    #[test]
    fn record_cycle_accumulates_totals() {
        let mut m = CycleMetrics::default();
        m.record_cycle(&report(CycleTrigger::Scheduled, vec![outcome(12, 2, 1), outcome(1, 1, 0)], 0));
        m.record_cycle(&report(CycleTrigger::Manual, vec![outcome(12, 1, 0)], 1));

        assert_eq!(m.cycles_run, 2);
        assert_eq!((m.scheduled_cycles, m.manual_cycles), (1, 1));
        assert_eq!(m.notifications_sent, 4);
        assert_eq!(m.sent_by_threshold["12"], 3);
        assert_eq!(m.sent_by_threshold["1"], 1);
        assert_eq!(m.dispatch_failures, 1);
        assert_eq!(m.threshold_errors, 1);
        assert_eq!(m.last_cycle_sent, Some(1));
        assert_eq!(m.last_cycle_duration_ms, Some(250));
    }

    #[test]
    fn skipped_ticks_are_counted() {
        let mut m = CycleMetrics::default();
        m.record_skipped_tick();
        m.record_skipped_tick();
        assert_eq!(m.skipped_ticks, 2);
        assert_eq!(m.cycles_run, 0);
    }
}
