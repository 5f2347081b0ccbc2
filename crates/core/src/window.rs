//! Deadline windows: which deadlines a threshold fires for in one poll.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::threshold::Threshold;

/// Range of deadlines in scope for one threshold during one cycle.
///
/// Threshold windows are open at `start` and closed at `end`: `(start, end]`.
/// A deadline sitting exactly on a boundary belongs to the earlier poll, so
/// consecutive polls share no instant and leave no gap. The deadline window
/// also admits `start` itself so a task due at the poll instant still fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub start_inclusive: bool,
}

impl Window {
    /// Compute the window for `threshold` at `now`, sized to one poll `interval`.
    ///
    /// - `h > 0`: `(now + h - interval, now + h]`. Consecutive polls tile the
    ///   timeline as long as the interval stays fixed.
    /// - `0`: `[now, now + interval]`, never reaching back before `now`.
    ///
    /// Offsets past the representable range saturate at the latest instant.
    pub fn for_threshold(threshold: Threshold, now: DateTime<Utc>, interval: Duration) -> Self {
        if threshold.is_deadline() {
            Self {
                start: now,
                end: saturating_add(now, interval),
                start_inclusive: true,
            }
        } else {
            let end = saturating_add(now, Duration::hours(i64::from(threshold.as_hours())));
            Self {
                start: end.checked_sub_signed(interval).unwrap_or(DateTime::<Utc>::MIN_UTC),
                end,
                start_inclusive: false,
            }
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        let after_start = instant > self.start || (self.start_inclusive && instant == self.start);
        after_start && instant <= self.end
    }

    pub fn length(&self) -> Duration {
        self.end - self.start
    }
}

fn saturating_add(at: DateTime<Utc>, offset: Duration) -> DateTime<Utc> {
    at.checked_add_signed(offset).unwrap_or(DateTime::<Utc>::MAX_UTC)
}
