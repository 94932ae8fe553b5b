//! Simulation run snapshots.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{LineSign, Period};

/// The projected effect of a policy on one employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeProjection {
    /// The employee evaluated.
    pub employee_id: String,
    /// Employee display name, for reports.
    pub employee_name: String,
    /// Whether the policy's conditions held.
    pub conditions_met: bool,
    /// Sign of the projected effect; absent when there is none.
    #[serde(default)]
    pub sign: Option<LineSign>,
    /// Projected amount magnitude.
    #[serde(default)]
    pub amount: Decimal,
    /// Explanation of the projection.
    #[serde(default)]
    pub description: Option<String>,
}

impl EmployeeProjection {
    /// A projection with no payroll effect.
    pub fn none(employee_id: &str, employee_name: &str, conditions_met: bool) -> Self {
        Self {
            employee_id: employee_id.to_string(),
            employee_name: employee_name.to_string(),
            conditions_met,
            sign: None,
            amount: Decimal::ZERO,
            description: None,
        }
    }
}

/// Aggregate totals for a simulation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSummary {
    /// Employees evaluated.
    pub employees_evaluated: u64,
    /// Employees the policy would affect.
    pub employees_affected: u64,
    /// Sum of projected earnings.
    pub total_additions: Decimal,
    /// Sum of projected deductions.
    pub total_deductions: Decimal,
    /// Net payroll impact (additions minus deductions).
    pub net_impact: Decimal,
    /// Wall-clock execution time in milliseconds.
    pub execution_ms: u64,
}

/// Write-once snapshot of a dry run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRun {
    /// Unique identifier.
    pub id: String,
    /// The policy simulated.
    pub policy_id: String,
    /// Who requested the run.
    pub actor_id: String,
    /// The hypothetical period.
    pub period: Period,
    /// Aggregate totals.
    pub summary: SimulationSummary,
    /// Per-employee projections.
    pub results: Vec<EmployeeProjection>,
    /// Non-fatal problems encountered during the run.
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl SimulationRun {
    /// Creates a run snapshot with a fresh id.
    pub fn new(
        policy_id: &str,
        actor_id: &str,
        period: Period,
        summary: SimulationSummary,
        results: Vec<EmployeeProjection>,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            policy_id: policy_id.to_string(),
            actor_id: actor_id.to_string(),
            period,
            summary,
            results,
            warnings,
            created_at: Utc::now(),
        }
    }
}
