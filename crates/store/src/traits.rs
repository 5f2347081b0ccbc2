//! Task store trait and query types.

use async_trait::async_trait;
use planit_core::{Task, TaskStatus, Threshold, Window};

use crate::error::StoreError;

/// Selects tasks that are candidates for one threshold in one cycle.
#[derive(Debug, Clone)]
pub struct TaskQuery {
    /// Deadlines must fall in this window; see [`Window::contains`].
    pub window: Window,
    /// Tasks in this status are never returned.
    pub exclude_status: TaskStatus,
    /// Tasks whose dedup ledger already holds this label are never returned.
    pub exclude_label: String,
}

impl TaskQuery {
    /// Open, not-yet-notified tasks due inside `window` for `threshold`.
    pub fn for_threshold(threshold: Threshold, window: Window) -> Self {
        Self {
            window,
            exclude_status: TaskStatus::Completed,
            exclude_label: threshold.label(),
        }
    }

    /// Whether `task` satisfies the status and label filters. The deadline
    /// range is checked separately since it may need parsing.
    pub fn admits(&self, task: &Task) -> bool {
        task.status != self.exclude_status && !task.was_notified(&self.exclude_label)
    }
}

/// Read-mostly access to the external task store.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Tasks matching `query`.
    async fn find_due(&self, query: &TaskQuery) -> Result<Vec<Task>, StoreError>;

    /// Add `label` to the task's dedup ledger.
    ///
    /// Idempotent. Returns `true` when the label was newly added and `false`
    /// when it was already present or the task no longer exists.
    async fn mark_notified(&self, task_id: &str, label: &str) -> Result<bool, StoreError>;

    /// Reachability probe.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Human-readable backend name (e.g., "postgres", "memory").
    fn backend_name(&self) -> &str;
}
