//! Task model as read from the external task store.
//!
//! The scheduler never creates or edits tasks. It only reads them and adds
//! labels to [`Task::notifications_sent`].

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Naive layouts accepted for text deadlines. Interpreted as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

// ── Deadline ──────────────────────────────────────────────────

/// A task deadline. Stores may hand it back either as a timestamp or as
/// raw text that still needs parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Deadline {
    At(DateTime<Utc>),
    Text(String),
}

impl Deadline {
    /// Normalize to a UTC timestamp.
    ///
    /// Text is tried as RFC 3339, then RFC 2822, then a few naive layouts
    /// (read as UTC), then a bare `YYYY-MM-DD` (midnight UTC).
    pub fn resolve(&self) -> Result<DateTime<Utc>, CoreError> {
        match self {
            Deadline::At(at) => Ok(*at),
            Deadline::Text(raw) => parse_deadline(raw),
        }
    }
}

impl From<DateTime<Utc>> for Deadline {
    fn from(at: DateTime<Utc>) -> Self {
        Deadline::At(at)
    }
}

fn parse_deadline(raw: &str) -> Result<DateTime<Utc>, CoreError> {
    let value = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(CoreError::InvalidDeadline {
        value: raw.to_string(),
        reason: "unrecognized timestamp format".to_string(),
    })
}

// ── Status ────────────────────────────────────────────────────

/// Task lifecycle state. Only `completed` matters to the scheduler; any
/// other value the store reports is carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Other(s) => s,
        }
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => TaskStatus::Pending,
            "in_progress" => TaskStatus::InProgress,
            "completed" => TaskStatus::Completed,
            _ => TaskStatus::Other(s),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        status.as_str().to_string()
    }
}

// ── Kind ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskKind {
    Generic,
    Meeting {
        #[serde(default)]
        attendees: Vec<String>,
        #[serde(default)]
        location: String,
    },
}

// ── Task ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub deadline: Deadline,
    pub status: TaskStatus,
    #[serde(flatten)]
    pub kind: TaskKind,
    /// Dedup ledger: labels of thresholds already notified. Only ever grows.
    #[serde(default)]
    pub notifications_sent: BTreeSet<String>,
}

impl Task {
    /// A pending generic task with an empty dedup ledger.
    pub fn new(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        name: impl Into<String>,
        deadline: impl Into<Deadline>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            name: name.into(),
            deadline: deadline.into(),
            status: TaskStatus::Pending,
            kind: TaskKind::Generic,
            notifications_sent: BTreeSet::new(),
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_kind(mut self, kind: TaskKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_sent(mut self, label: impl Into<String>) -> Self {
        self.notifications_sent.insert(label.into());
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn is_meeting(&self) -> bool {
        matches!(self.kind, TaskKind::Meeting { .. })
    }

    pub fn was_notified(&self, label: &str) -> bool {
        self.notifications_sent.contains(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn resolve_rfc3339_with_offset() {
        let d = Deadline::Text("2025-03-10T17:00:00+02:00".into());
        assert_eq!(d.resolve().unwrap(), utc(2025, 3, 10, 15, 0, 0));
    }

    #[test]
    fn resolve_naive_as_utc() {
        let d = Deadline::Text("2025-03-10 15:30:00".into());
        assert_eq!(d.resolve().unwrap(), utc(2025, 3, 10, 15, 30, 0));
        let d = Deadline::Text("2025-03-10T15:30:00.250".into());
        assert_eq!(d.resolve().unwrap().timestamp(), utc(2025, 3, 10, 15, 30, 0).timestamp());
    }

    #[test]
    fn resolve_rfc2822_and_bare_date() {
        let d = Deadline::Text("Mon, 10 Mar 2025 15:00:00 +0000".into());
        assert_eq!(d.resolve().unwrap(), utc(2025, 3, 10, 15, 0, 0));
        let d = Deadline::Text("2025-03-10".into());
        assert_eq!(d.resolve().unwrap(), utc(2025, 3, 10, 0, 0, 0));
    }

    #[test]
    fn resolve_garbage_fails() {
        let err = Deadline::Text("next tuesday-ish".into()).resolve().unwrap_err();
        assert!(matches!(err, CoreError::InvalidDeadline { .. }));
    }

    #[test]
    fn status_round_trips_unknown_values() {
        assert_eq!(TaskStatus::from("completed".to_string()), TaskStatus::Completed);
        let custom = TaskStatus::from("blocked".to_string());
        assert_eq!(custom, TaskStatus::Other("blocked".into()));
        assert_eq!(String::from(custom), "blocked");
    }

    #[test]
    fn meeting_task_deserializes_with_defaults() {
        let json = r#"{
            "id": "t1", "owner_id": "u1", "name": "Standup",
            "deadline": "2025-03-10T09:00:00Z", "status": "pending",
            "type": "meeting", "attendees": ["u2", "u3"]
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.deadline, Deadline::At(utc(2025, 3, 10, 9, 0, 0)));
        assert_eq!(
            task.kind,
            TaskKind::Meeting {
                attendees: vec!["u2".into(), "u3".into()],
                location: String::new()
            }
        );
        assert!(task.notifications_sent.is_empty());
    }

    #[test]
    fn unparsable_text_deadline_survives_deserialization() {
        let json = r#"{
            "id": "t2", "owner_id": "u1", "name": "x", "deadline": "whenever",
            "status": "pending", "type": "generic", "notifications_sent": ["6"]
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.deadline, Deadline::Text("whenever".into()));
        assert!(task.was_notified("6"));
        assert!(!task.is_meeting());
    }
}
