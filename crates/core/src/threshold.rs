//! Notification thresholds and their stable dedup labels.
//!
//! A threshold is a number of hours before a task's deadline. The value `0`
//! is the deadline itself. Every threshold maps to a label that is persisted
//! in a task's `notifications_sent` set, so labels must never change shape.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Label persisted for the `0` threshold.
pub const DEADLINE_LABEL: &str = "deadline";

/// Threshold list used when none is configured.
pub const DEFAULT_THRESHOLDS: [u32; 4] = [12, 6, 1, 0];

/// Largest accepted threshold, one year. Keeps window arithmetic in range.
pub const MAX_THRESHOLD_HOURS: u32 = 24 * 365;

/// Thresholds at or below this many hours are sent with [`Priority::High`].
const HIGH_PRIORITY_MAX_HOURS: u32 = 1;

/// Delivery priority attached to every notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
        }
    }
}

/// Hours-before-deadline boundary. `Threshold(0)` means "at the deadline".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Threshold(u32);

impl Threshold {
    pub const DEADLINE: Threshold = Threshold(0);

    pub const fn hours(hours: u32) -> Self {
        Self(hours)
    }

    pub fn as_hours(self) -> u32 {
        self.0
    }

    pub fn is_deadline(self) -> bool {
        self.0 == 0
    }

    /// Stable dedup key: `"deadline"` for 0, otherwise the decimal hour count.
    pub fn label(self) -> String {
        if self.is_deadline() {
            DEADLINE_LABEL.to_string()
        } else {
            self.0.to_string()
        }
    }

    pub fn priority(self) -> Priority {
        if self.0 <= HIGH_PRIORITY_MAX_HOURS {
            Priority::High
        } else {
            Priority::Medium
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl FromStr for Threshold {
    type Err = CoreError;

    /// Accepts a bare hour count (`"6"`), an hour count with an `h` suffix
    /// (`"6h"`) or the literal `"deadline"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case(DEADLINE_LABEL) {
            return Ok(Threshold::DEADLINE);
        }
        let digits = trimmed
            .strip_suffix('h')
            .or_else(|| trimmed.strip_suffix('H'))
            .unwrap_or(trimmed);
        let hours = digits
            .parse::<u32>()
            .map_err(|_| CoreError::InvalidThreshold(format!("'{trimmed}' is not a whole number of hours")))?;
        if hours > MAX_THRESHOLD_HOURS {
            return Err(CoreError::InvalidThreshold(format!(
                "{hours}h exceeds the {MAX_THRESHOLD_HOURS}h maximum"
            )));
        }
        Ok(Threshold(hours))
    }
}

/// The default `[12, 6, 1, 0]` threshold list.
pub fn default_thresholds() -> Vec<Threshold> {
    DEFAULT_THRESHOLDS.iter().copied().map(Threshold).collect()
}

/// Parse a comma-separated threshold list such as `"12,6,1,0"`.
///
/// Order is preserved. Repeated values are dropped after their first
/// occurrence since two entries would share one dedup label.
pub fn parse_thresholds(input: &str) -> Result<Vec<Threshold>, CoreError> {
    let mut out: Vec<Threshold> = Vec::new();
    for part in input.split(',').filter(|p| !p.trim().is_empty()) {
        let threshold: Threshold = part.parse()?;
        if out.contains(&threshold) {
            tracing::warn!(threshold = %threshold, "duplicate threshold ignored");
            continue;
        }
        out.push(threshold);
    }
    if out.is_empty() {
        return Err(CoreError::InvalidThreshold("threshold list is empty".to_string()));
    }
    Ok(out)
}
