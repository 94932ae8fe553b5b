//! Policy exception model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of entity an exception targets. Matching during exclusion
/// checks follows this declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ExceptionTarget {
    /// A single employee.
    #[serde(rename = "EMPLOYEE")]
    Employee,
    /// Everyone in a department.
    #[serde(rename = "DEPARTMENT")]
    Department,
    /// Everyone in a branch.
    #[serde(rename = "BRANCH")]
    Branch,
    /// Everyone with a job title.
    #[serde(rename = "JOB_TITLE")]
    JobTitle,
}

impl ExceptionTarget {
    /// Canonical uppercase label, as stored and reported.
    pub fn label(&self) -> &'static str {
        match self {
            ExceptionTarget::Employee => "EMPLOYEE",
            ExceptionTarget::Department => "DEPARTMENT",
            ExceptionTarget::Branch => "BRANCH",
            ExceptionTarget::JobTitle => "JOB_TITLE",
        }
    }

    /// All targets in matching priority order.
    pub fn match_order() -> [ExceptionTarget; 4] {
        [
            ExceptionTarget::Employee,
            ExceptionTarget::Department,
            ExceptionTarget::Branch,
            ExceptionTarget::JobTitle,
        ]
    }
}

/// Excludes a target from a policy, optionally within a time window.
///
/// At most one exception may exist per (policy, target type, target id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyException {
    /// Unique identifier.
    pub id: String,
    /// The policy being excepted from.
    pub policy_id: String,
    /// What kind of entity is targeted.
    pub target_type: ExceptionTarget,
    /// The targeted entity's identifier (or job title text).
    pub target_id: String,
    /// Window start; open-ended when absent.
    #[serde(default)]
    pub effective_from: Option<DateTime<Utc>>,
    /// Window end; open-ended when absent.
    #[serde(default)]
    pub effective_to: Option<DateTime<Utc>>,
    /// Inactive exceptions never match.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Optional reason, shown in exclusion explanations.
    #[serde(default)]
    pub reason: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl PolicyException {
    /// Creates an active, open-ended exception with a fresh id.
    pub fn new(policy_id: &str, target_type: ExceptionTarget, target_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            policy_id: policy_id.to_string(),
            target_type,
            target_id: target_id.to_string(),
            effective_from: None,
            effective_to: None,
            is_active: true,
            reason: None,
            created_at: Utc::now(),
        }
    }

    /// True when the exception is active and its window covers `now`.
    pub fn covers(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        if let Some(from) = self.effective_from {
            if now < from {
                return false;
            }
        }
        if let Some(to) = self.effective_to {
            if now > to {
                return false;
            }
        }
        true
    }
}

/// The outcome of an exclusion check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExclusionCheck {
    /// Whether the employee is excluded from the policy.
    pub is_excluded: bool,
    /// Why, when excluded.
    #[serde(default)]
    pub reason: Option<String>,
}

impl ExclusionCheck {
    /// A not-excluded result.
    pub fn not_excluded() -> Self {
        Self {
            is_excluded: false,
            reason: None,
        }
    }

    /// An excluded result with the given reason.
    pub fn excluded(reason: impl Into<String>) -> Self {
        Self {
            is_excluded: true,
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_open_ended_window_covers_everything() {
        let exception = PolicyException::new("p", ExceptionTarget::Employee, "e1");
        assert!(exception.covers(at(1999, 1, 1)));
        assert!(exception.covers(at(2099, 1, 1)));
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let mut exception = PolicyException::new("p", ExceptionTarget::Department, "d1");
        exception.effective_from = Some(at(2025, 1, 1));
        exception.effective_to = Some(at(2025, 6, 30));
        assert!(exception.covers(at(2025, 1, 1)));
        assert!(exception.covers(at(2025, 6, 30)));
        assert!(!exception.covers(at(2024, 12, 31)));
        assert!(!exception.covers(at(2025, 7, 1)));
    }

    #[test]
    fn test_inactive_never_covers() {
        let mut exception = PolicyException::new("p", ExceptionTarget::Branch, "b1");
        exception.is_active = false;
        assert!(!exception.covers(Utc::now()));
    }

    #[test]
    fn test_match_order() {
        let order = ExceptionTarget::match_order();
        assert_eq!(order[0], ExceptionTarget::Employee);
        assert_eq!(order[3], ExceptionTarget::JobTitle);
    }
}
