//! In-process task store.

use std::collections::HashMap;

use async_trait::async_trait;
use planit_core::Task;
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::StoreError;
use crate::traits::{TaskQuery, TaskStore};

/// `HashMap`-backed [`TaskStore`]. Same filter semantics as the Postgres
/// adapter, with text deadlines parsed on the fly.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<String, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let map = tasks.into_iter().map(|t| (t.id.clone(), t)).collect();
        Self {
            tasks: RwLock::new(map),
        }
    }

    /// Insert or replace a task.
    pub async fn insert(&self, task: Task) {
        self.tasks.write().await.insert(task.id.clone(), task);
    }

    pub async fn get(&self, task_id: &str) -> Option<Task> {
        self.tasks.read().await.get(task_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn find_due(&self, query: &TaskQuery) -> Result<Vec<Task>, StoreError> {
        let tasks = self.tasks.read().await;
        let mut due: Vec<Task> = tasks
            .values()
            .filter(|task| query.admits(task))
            .filter(|task| match task.deadline.resolve() {
                Ok(deadline) => query.window.contains(deadline),
                Err(e) => {
                    warn!(task_id = %task.id, error = %e, "skipping task with unparsable deadline");
                    false
                }
            })
            .cloned()
            .collect();
        due.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(due)
    }

    async fn mark_notified(&self, task_id: &str, label: &str) -> Result<bool, StoreError> {
        let mut tasks = self.tasks.write().await;
        Ok(match tasks.get_mut(task_id) {
            Some(task) => task.notifications_sent.insert(label.to_string()),
            None => false,
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}
