//! Execution audit records and payroll line output.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Period;

/// Whether a payroll line adds to or deducts from pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineSign {
    /// The line adds to the employee's pay.
    #[serde(rename = "EARNING")]
    Earning,
    /// The line deducts from the employee's pay.
    #[serde(rename = "DEDUCTION")]
    Deduction,
}

/// Provenance of a payroll line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSource {
    /// The policy that produced the line.
    pub policy_id: String,
    /// The specific rule or tier within the policy, when applicable.
    #[serde(default)]
    pub rule_id: Option<String>,
}

/// A signed payroll adjustment produced by policy execution, consumed by
/// the payroll-assembly collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollLine {
    /// Payroll component identifier.
    pub component_id: String,
    /// Payroll component display name.
    pub component_name: String,
    /// Positive magnitude of the adjustment, rounded to 2 decimals.
    pub amount: Decimal,
    /// Whether the line adds or deducts.
    pub sign: LineSign,
    /// Human-readable explanation for payslips and audit.
    pub description: String,
    /// Where the line came from.
    pub source: LineSource,
}

/// Converts an evaluated amount into a monetary `Decimal` rounded to
/// 2 places. Non-finite inputs collapse to zero; callers treat those as
/// errors before reaching this point.
pub fn to_money(amount: f64) -> Decimal {
    Decimal::from_f64(amount).unwrap_or(Decimal::ZERO).round_dp(2)
}

/// Immutable audit row for one policy evaluation attempt.
///
/// The only permitted mutation is stamping `payroll_period` when the
/// record is consumed by a payroll run; that transition happens at most
/// once and guards against double-application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    /// Unique identifier.
    pub id: String,
    /// The policy that was evaluated.
    pub policy_id: String,
    /// The employee the evaluation was for.
    pub employee_id: String,
    /// What triggered the evaluation (payroll run, attendance event, ...).
    pub trigger_event: String,
    /// Whether conditions held.
    pub conditions_met: bool,
    /// Whether the evaluation completed without error.
    pub success: bool,
    /// Action type, when the policy produced an effect.
    #[serde(default)]
    pub action_type: Option<String>,
    /// Computed amount magnitude.
    #[serde(default)]
    pub amount: Decimal,
    /// Free-form result payload for audit.
    #[serde(default)]
    pub result: serde_json::Value,
    /// Error explanation when `success` is false.
    #[serde(default)]
    pub error: Option<String>,
    /// Stamped once when a payroll run consumes the record.
    #[serde(default)]
    pub payroll_period: Option<Period>,
    /// Creation timestamp.
    pub executed_at: DateTime<Utc>,
}

impl ExecutionRecord {
    /// Creates an unstamped record with a fresh id.
    pub fn new(policy_id: &str, employee_id: &str, trigger_event: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            policy_id: policy_id.to_string(),
            employee_id: employee_id.to_string(),
            trigger_event: trigger_event.to_string(),
            conditions_met: false,
            success: false,
            action_type: None,
            amount: Decimal::ZERO,
            result: serde_json::Value::Null,
            error: None,
            payroll_period: None,
            executed_at: Utc::now(),
        }
    }
}

/// A standalone adjustment produced by a retroactive application,
/// referencing the payroll period it should be paid in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentRecord {
    /// Unique identifier.
    pub id: String,
    /// The retro application that produced this adjustment.
    pub retro_application_id: String,
    /// The employee being adjusted.
    pub employee_id: String,
    /// Signed net amount (positive pays, negative deducts).
    pub amount: Decimal,
    /// The payroll period the adjustment applies to.
    pub payroll_period: Period,
    /// Explanation for audit.
    pub description: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_money_rounds_to_cents() {
        assert_eq!(to_money(10.005), Decimal::new(1000, 2));
        assert_eq!(to_money(49.999), Decimal::new(5000, 2));
        assert_eq!(to_money(f64::NAN), Decimal::ZERO);
    }

    #[test]
    fn test_new_record_is_unstamped() {
        let record = ExecutionRecord::new("pol_1", "emp_1", "PAYROLL_RUN");
        assert!(record.payroll_period.is_none());
        assert!(!record.success);
        assert_eq!(record.amount, Decimal::ZERO);
    }

    #[test]
    fn test_payroll_line_serialization() {
        let line = PayrollLine {
            component_id: "policy_deduction".to_string(),
            component_name: "Late arrival penalty".to_string(),
            amount: Decimal::new(5000, 2),
            sign: LineSign::Deduction,
            description: "Tier 2 penalty".to_string(),
            source: LineSource {
                policy_id: "pol_1".to_string(),
                rule_id: Some("tier_2".to_string()),
            },
        };
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["sign"], "DEDUCTION");
        assert_eq!(json["source"]["policyId"], "pol_1");
    }
}
