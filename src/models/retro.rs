//! Retroactive application model and state machine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::Period;

/// Lifecycle state of a retroactive application.
///
/// Transitions: PENDING → CALCULATING → REVIEWED → APPROVED → APPLIED,
/// with CANCELLED reachable from any state before APPLIED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetroStatus {
    /// Created, not yet calculated.
    #[serde(rename = "PENDING")]
    Pending,
    /// Calculation in progress.
    #[serde(rename = "CALCULATING")]
    Calculating,
    /// Calculated; results available for review.
    #[serde(rename = "REVIEWED")]
    Reviewed,
    /// Approved for application.
    #[serde(rename = "APPROVED")]
    Approved,
    /// Applied to payroll; terminal.
    #[serde(rename = "APPLIED")]
    Applied,
    /// Cancelled before application; terminal.
    #[serde(rename = "CANCELLED")]
    Cancelled,
}

impl RetroStatus {
    /// True for terminal states.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RetroStatus::Applied | RetroStatus::Cancelled)
    }
}

/// One period's contribution to an employee's retro result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetroPeriodLine {
    /// The historical period evaluated.
    pub period: Period,
    /// Signed amount for that period.
    pub amount: Decimal,
    /// Explanation of the period's result.
    #[serde(default)]
    pub description: Option<String>,
}

/// Per-employee outcome of a retro calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRetroResult {
    /// The employee evaluated.
    pub employee_id: String,
    /// Employee display name.
    pub employee_name: String,
    /// Signed net total across all evaluated periods.
    pub net_amount: Decimal,
    /// Per-period breakdown.
    pub periods: Vec<RetroPeriodLine>,
}

/// A requested retroactive re-evaluation over a period range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetroApplication {
    /// Unique identifier.
    pub id: String,
    /// The policy being re-applied.
    pub policy_id: String,
    /// Owning company.
    pub company_id: String,
    /// First historical period (inclusive).
    pub from_period: Period,
    /// Last historical period (inclusive).
    pub to_period: Period,
    /// The payroll period adjustments land in once applied.
    pub target_period: Period,
    /// Current lifecycle state.
    pub status: RetroStatus,
    /// Per-employee results; populated at REVIEWED.
    #[serde(default)]
    pub results: Vec<EmployeeRetroResult>,
    /// Warnings collected during calculation.
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Set only at APPLIED.
    #[serde(default)]
    pub applied_at: Option<DateTime<Utc>>,
    /// Who requested the application.
    pub requested_by: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl RetroApplication {
    /// Creates a PENDING application with a fresh id.
    pub fn new(
        policy_id: &str,
        company_id: &str,
        from_period: Period,
        to_period: Period,
        target_period: Period,
        requested_by: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            policy_id: policy_id.to_string(),
            company_id: company_id.to_string(),
            from_period,
            to_period,
            target_period,
            status: RetroStatus::Pending,
            results: Vec::new(),
            warnings: Vec::new(),
            applied_at: None,
            requested_by: requested_by.to_string(),
            created_at: Utc::now(),
        }
    }

    /// Moves to the given state, rejecting disallowed transitions.
    pub fn transition(&mut self, to: RetroStatus) -> EngineResult<()> {
        use RetroStatus::*;
        let allowed = match (self.status, to) {
            (Pending, Calculating) => true,
            (Calculating, Reviewed) => true,
            // Calculation failure rolls back rather than sticking.
            (Calculating, Pending) => true,
            (Reviewed, Approved) => true,
            (Approved, Applied) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        };
        if !allowed {
            return Err(EngineError::InvalidStateTransition {
                message: format!("{:?} -> {:?} is not allowed", self.status, to),
            });
        }
        self.status = to;
        Ok(())
    }
}
