//! Periodic cycle loop.
//!
//! Fires [`CycleOrchestrator::run_cycle`] every poll interval, starting one
//! interval after spawn. A tick delivered more than `misfire_grace` after its
//! scheduled instant (because the previous cycle overran, or the runtime was
//! starved) is dropped rather than run late.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::orchestrator::{CycleOrchestrator, CycleTrigger};

pub struct SchedulerRunner {
    orchestrator: Arc<CycleOrchestrator>,
    period: Duration,
    misfire_grace: Duration,
}

impl SchedulerRunner {
    pub fn new(orchestrator: Arc<CycleOrchestrator>, period: Duration, misfire_grace: Duration) -> Self {
        Self {
            orchestrator,
            period,
            misfire_grace,
        }
    }

    /// Start the loop on the current tokio runtime.
    pub fn spawn(self) -> SchedulerHandle {
        let running = Arc::new(AtomicBool::new(true));
        let shutdown = Arc::new(Notify::new());
        let join = tokio::spawn(self.run(RunningGuard(running.clone()), shutdown.clone()));
        SchedulerHandle {
            running,
            shutdown,
            join,
        }
    }

    async fn run(self, _running: RunningGuard, shutdown: Arc<Notify>) {
        info!(
            period_secs = self.period.as_secs(),
            misfire_grace_secs = self.misfire_grace.as_secs(),
            thresholds = ?self.orchestrator.thresholds(),
            "Scheduler started"
        );

        let mut interval = tokio::time::interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

        loop {
            tokio::select! {
                _ = shutdown.notified() => break,
                scheduled = interval.tick() => {
                    let lateness = Instant::now().saturating_duration_since(scheduled);
                    if lateness > self.misfire_grace {
                        warn!(
                            late_secs = lateness.as_secs(),
                            grace_secs = self.misfire_grace.as_secs(),
                            "Scheduled check missed its grace window, skipping"
                        );
                        self.orchestrator.record_skipped_tick();
                        continue;
                    }
                    self.orchestrator.run_cycle(Utc::now(), CycleTrigger::Scheduled).await;
                }
            }
        }

        info!("Scheduler stopped");
    }
}

/// Clears the shared liveness flag when the loop future is dropped, whether
/// it returned, panicked or was aborted.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Handle to a spawned [`SchedulerRunner`].
pub struct SchedulerHandle {
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Whether the loop is alive. Feeds the health report.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed) && !self.join.is_finished()
    }

    /// A cloneable liveness flag for callers that must not own the handle.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Stop after the in-flight cycle (if any) and wait for the loop to exit.
    pub async fn shutdown(self) {
        info!("Scheduler shutdown requested");
        self.shutdown.notify_one();
        if let Err(e) = self.join.await {
            warn!(error = %e, "scheduler task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use planit_core::{Task, Threshold};
    use planit_notify::{Dispatcher, NotificationPayload, Notifier, NotifyError};
    use planit_store::InMemoryTaskStore;

    use crate::evaluator::ThresholdEvaluator;

    /// Sink that takes `delay` (virtual time) per send.
    struct SlowNotifier {
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl Notifier for SlowNotifier {
        async fn send(&self, _payload: &NotificationPayload) -> Result<(), NotifyError> {
            tokio::time::sleep(self.delay).await;
            Ok(())
        }
        async fn health_check(&self) -> Result<(), NotifyError> {
            Ok(())
        }
        fn channel_name(&self) -> &str {
            "slow"
        }
    }

    fn orchestrator(tasks: Vec<Task>, send_delay: Duration) -> Arc<CycleOrchestrator> {
        let evaluator = ThresholdEvaluator::new(
            Arc::new(InMemoryTaskStore::with_tasks(tasks)),
            Arc::new(Dispatcher::new(Arc::new(SlowNotifier { delay: send_delay }))),
            chrono::Duration::minutes(1),
            Duration::from_secs(5),
        );
        Arc::new(CycleOrchestrator::new(vec![Threshold::DEADLINE], evaluator))
    }

    #[tokio::test(start_paused = true)]
    async fn first_cycle_runs_after_one_period() {
        let orch = orchestrator(vec![], Duration::ZERO);
        let handle = SchedulerRunner::new(orch.clone(), Duration::from_secs(60), Duration::from_secs(10)).spawn();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(orch.metrics().cycles_run, 0);
        assert!(handle.is_running());

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(orch.metrics().cycles_run, 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(orch.metrics().scheduled_cycles, 2);

        let flag = handle.running_flag();
        handle.shutdown().await;
        assert!(!flag.load(Ordering::Relaxed));
    }

    #[tokio::test(start_paused = true)]
    async fn overrunning_cycle_skips_stale_ticks() {
        // The deadline window is [now, now + 1m] against wall-clock time,
        // which barely moves while tokio time is paused.
        let task = Task::new("t", "u", "n", Utc::now() + chrono::Duration::seconds(30));
        let orch = orchestrator(vec![task], Duration::from_secs(150));
        let handle = SchedulerRunner::new(orch.clone(), Duration::from_secs(60), Duration::from_secs(10)).spawn();

        // Tick at 60s runs until 210s; ticks due at 120s and 180s are stale.
        // The tick at 240s runs normally.
        tokio::time::sleep(Duration::from_secs(250)).await;

        let m = orch.metrics();
        assert_eq!(m.cycles_run, 2);
        assert_eq!(m.skipped_ticks, 2);
        assert_eq!(m.notifications_sent, 1);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn aborted_loop_clears_running_flag() {
        let orch = orchestrator(vec![], Duration::ZERO);
        let handle = SchedulerRunner::new(orch, Duration::from_secs(60), Duration::from_secs(10)).spawn();
        let flag = handle.running_flag();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(flag.load(Ordering::Relaxed));

        handle.join.abort();
        assert!(handle.join.await.unwrap_err().is_cancelled());
        assert!(!flag.load(Ordering::Relaxed));
    }
}
