//! PostgreSQL task store.
//!
//! Expects the `tasks` table from `migrations/`. Every call is bounded by
//! the configured outbound timeout; expiry surfaces as [`StoreError::Timeout`].

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use planit_core::{Deadline, Task, TaskKind, TaskStatus};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::traits::{TaskQuery, TaskStore};

#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: String,
    owner_id: String,
    name: String,
    deadline: DateTime<Utc>,
    status: String,
    kind: String,
    attendees: Option<Vec<String>>,
    location: Option<String>,
    notifications_sent: Vec<String>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        let kind = match row.kind.as_str() {
            "meeting" => TaskKind::Meeting {
                attendees: row.attendees.unwrap_or_default(),
                location: row.location.unwrap_or_default(),
            },
            _ => TaskKind::Generic,
        };
        Task {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            deadline: Deadline::At(row.deadline),
            status: TaskStatus::from(row.status),
            kind,
            notifications_sent: row.notifications_sent.into_iter().collect::<BTreeSet<_>>(),
        }
    }
}

pub struct PgTaskStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgTaskStore {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Build a pool that connects on first use. Only a malformed URL fails
    /// here; an unreachable database surfaces on the first query or ping.
    pub fn connect_lazy(url: &str, max_connections: u32, timeout: Duration) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(timeout)
            .connect_lazy(url)?;
        Ok(Self::new(pool, timeout))
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        info!("Task store migrations applied");
        Ok(())
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => {
                let ms = self.timeout.as_millis() as u64;
                warn!(op, timeout_ms = ms, "task store call timed out");
                Err(StoreError::Timeout(ms))
            }
        }
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn find_due(&self, query: &TaskQuery) -> Result<Vec<Task>, StoreError> {
        let rows = self
            .bounded(
                "find_due",
                sqlx::query_as::<_, TaskRow>(
                    "SELECT id, owner_id, name, deadline, status, kind, attendees, location, notifications_sent \
                     FROM tasks \
                     WHERE (deadline > $1 OR ($5 AND deadline = $1)) AND deadline <= $2 \
                       AND status <> $3 \
                       AND NOT ($4 = ANY(notifications_sent)) \
                     ORDER BY deadline, id",
                )
                .bind(query.window.start)
                .bind(query.window.end)
                .bind(query.exclude_status.as_str())
                .bind(&query.exclude_label)
                .bind(query.window.start_inclusive)
                .fetch_all(&self.pool),
            )
            .await?;
        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn mark_notified(&self, task_id: &str, label: &str) -> Result<bool, StoreError> {
        let result = self
            .bounded(
                "mark_notified",
                sqlx::query(
                    "UPDATE tasks SET notifications_sent = array_append(notifications_sent, $2) \
                     WHERE id = $1 AND NOT ($2 = ANY(notifications_sent))",
                )
                .bind(task_id)
                .bind(label)
                .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.bounded(
            "ping",
            sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&self.pool),
        )
        .await
        .map(|_| ())
    }

    fn backend_name(&self) -> &str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(kind: &str) -> TaskRow {
        TaskRow {
            id: "t1".into(),
            owner_id: "u1".into(),
            name: "Quarterly review".into(),
            deadline: Utc.with_ymd_and_hms(2025, 3, 10, 15, 0, 0).unwrap(),
            status: "in_progress".into(),
            kind: kind.into(),
            attendees: Some(vec!["u2".into()]),
            location: None,
            notifications_sent: vec!["12".into(), "6".into()],
        }
    }

    #[test]
    fn meeting_row_maps_to_meeting_kind() {
        let task = Task::from(row("meeting"));
        assert_eq!(
            task.kind,
            TaskKind::Meeting {
                attendees: vec!["u2".into()],
                location: String::new()
            }
        );
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(task.was_notified("12") && task.was_notified("6"));
    }

    #[test]
    fn unknown_kind_maps_to_generic() {
        let task = Task::from(row("errand"));
        assert_eq!(task.kind, TaskKind::Generic);
    }
}
