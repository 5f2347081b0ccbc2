//! Notification payload sent to the messaging queue.

use chrono::{DateTime, SecondsFormat, Utc};
use planit_core::{Priority, Task, TaskKind, Threshold};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    DeadlineApproaching,
    MeetingApproaching,
}

/// JSON body posted to the queue. Never persisted by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub user_id: String,
    pub task_id: String,
    pub task_name: String,
    /// ISO-8601 due timestamp.
    pub due_date: String,
    /// Hours from evaluation time to the deadline, one decimal place.
    pub hours_remaining: f64,
    /// Dedup label of the threshold that fired.
    pub notification_threshold: String,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl NotificationPayload {
    /// Build the payload for `task` crossing `threshold` at `now`.
    ///
    /// `deadline` is the task's already-resolved deadline.
    pub fn for_task(task: &Task, deadline: DateTime<Utc>, threshold: Threshold, now: DateTime<Utc>) -> Self {
        let (kind, attendees, location) = match &task.kind {
            TaskKind::Meeting { attendees, location } => (
                NotificationType::MeetingApproaching,
                Some(attendees.clone()),
                Some(location.clone()),
            ),
            TaskKind::Generic => (NotificationType::DeadlineApproaching, None, None),
        };

        Self {
            kind,
            user_id: task.owner_id.clone(),
            task_id: task.id.clone(),
            task_name: task.name.clone(),
            due_date: deadline.to_rfc3339_opts(SecondsFormat::AutoSi, false),
            hours_remaining: hours_between(now, deadline),
            notification_threshold: threshold.label(),
            priority: threshold.priority(),
            attendees,
            location,
        }
    }
}

/// `(to - from)` in hours, rounded to one decimal.
fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let hours = (to - from).num_milliseconds() as f64 / 3_600_000.0;
    (hours * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn generic_task_payload() {
        let deadline = now() + Duration::hours(6) - Duration::minutes(6);
        let task = Task::new("42", "user-7", "Ship release", deadline);
        let p = NotificationPayload::for_task(&task, deadline, Threshold::hours(6), now());

        assert_eq!(p.kind, NotificationType::DeadlineApproaching);
        assert_eq!(p.user_id, "user-7");
        assert_eq!(p.task_id, "42");
        assert_eq!(p.hours_remaining, 5.9);
        assert_eq!(p.notification_threshold, "6");
        assert_eq!(p.priority, Priority::Medium);
        assert_eq!(p.due_date, "2025-03-10T14:54:00+00:00");
        assert!(p.attendees.is_none() && p.location.is_none());
    }

    #[test]
    fn meeting_payload_carries_attendees_and_location() {
        let deadline = now() + Duration::minutes(55);
        let task = Task::new("m1", "u1", "Design sync", deadline).with_kind(TaskKind::Meeting {
            attendees: vec!["u2".into(), "u3".into()],
            location: "Room 4".into(),
        });
        let p = NotificationPayload::for_task(&task, deadline, Threshold::hours(1), now());

        assert_eq!(p.kind, NotificationType::MeetingApproaching);
        assert_eq!(p.priority, Priority::High);
        assert_eq!(p.attendees.as_deref(), Some(&["u2".to_string(), "u3".to_string()][..]));
        assert_eq!(p.location.as_deref(), Some("Room 4"));
        assert_eq!(p.hours_remaining, 0.9);
    }

    #[test]
    fn json_shape_matches_queue_contract() {
        let deadline = now() + Duration::minutes(10);
        let task = Task::new("t", "u", "n", deadline);
        let p = NotificationPayload::for_task(&task, deadline, Threshold::DEADLINE, now());
        let json = serde_json::to_value(&p).unwrap();

        assert_eq!(json["type"], "deadline_approaching");
        assert_eq!(json["notification_threshold"], "deadline");
        assert_eq!(json["priority"], "high");
        assert_eq!(json["hours_remaining"], 0.2);
        assert!(json.get("attendees").is_none());
        assert!(json.get("location").is_none());
    }

    #[test]
    fn overdue_deadline_gives_negative_hours() {
        assert_eq!(hours_between(now(), now() - Duration::minutes(30)), -0.5);
    }
}
