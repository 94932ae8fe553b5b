//! Occurrence tracker model backing tiered penalties.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// When an occurrence counter resets to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResetPeriod {
    /// Resets when the calendar month changes.
    #[serde(rename = "MONTHLY")]
    Monthly,
    /// Resets when the calendar quarter changes.
    #[serde(rename = "QUARTERLY")]
    Quarterly,
    /// Resets when the calendar year changes.
    #[serde(rename = "YEARLY")]
    Yearly,
    /// Never resets.
    #[serde(rename = "NEVER")]
    Never,
}

impl Default for ResetPeriod {
    fn default() -> Self {
        ResetPeriod::Monthly
    }
}

fn quarter(month: u32) -> u32 {
    (month - 1) / 3
}

impl ResetPeriod {
    /// True when `now` has crossed a reset boundary since `last_reset`.
    pub fn boundary_crossed(&self, last_reset: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            ResetPeriod::Monthly => {
                now.year() != last_reset.year() || now.month() != last_reset.month()
            }
            ResetPeriod::Quarterly => {
                now.year() != last_reset.year() || quarter(now.month()) != quarter(last_reset.month())
            }
            ResetPeriod::Yearly => now.year() != last_reset.year(),
            ResetPeriod::Never => false,
        }
    }
}

/// Persistent counter keyed by (policy, employee, occurrence type).
///
/// Created on the first occurrence, incremented on each subsequent one,
/// and reset to zero when the current date crosses a reset boundary.
/// Never deleted; a reset mutates the row in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceTracker {
    /// Unique identifier.
    pub id: String,
    /// The policy the counter belongs to.
    pub policy_id: String,
    /// The employee being counted.
    pub employee_id: String,
    /// Occurrence type, e.g. `LATE`.
    pub occurrence_type: String,
    /// Current count within the reset window.
    pub count: u32,
    /// The reset rule.
    #[serde(default)]
    pub reset_period: ResetPeriod,
    /// Timestamp of the most recent occurrence.
    #[serde(default)]
    pub last_occurred_at: Option<DateTime<Utc>>,
    /// Timestamp of the most recent reset (or creation).
    pub last_reset_at: DateTime<Utc>,
    /// Payload of the most recent occurrence, for audit.
    #[serde(default)]
    pub last_event_data: serde_json::Value,
}

impl OccurrenceTracker {
    /// A fresh tracker with a zero count, created "now".
    pub fn new(
        policy_id: &str,
        employee_id: &str,
        occurrence_type: &str,
        reset_period: ResetPeriod,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            policy_id: policy_id.to_string(),
            employee_id: employee_id.to_string(),
            occurrence_type: occurrence_type.to_string(),
            count: 0,
            reset_period,
            last_occurred_at: None,
            last_reset_at: Utc::now(),
            last_event_data: serde_json::Value::Null,
        }
    }

    /// True when the counter should reset before its next use.
    pub fn should_reset(&self, now: DateTime<Utc>) -> bool {
        self.reset_period.boundary_crossed(self.last_reset_at, now)
    }

    /// The composite key identifying this counter.
    pub fn key(&self) -> String {
        tracker_key(&self.policy_id, &self.employee_id, &self.occurrence_type)
    }
}

/// Composite key for a (policy, employee, occurrence type) counter.
pub fn tracker_key(policy_id: &str, employee_id: &str, occurrence_type: &str) -> String {
    format!("{}:{}:{}", policy_id, employee_id, occurrence_type)
}
