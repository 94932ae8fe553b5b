//! Policy definition model.
//!
//! A [`Policy`] is an administrator-authored rule: a list of conditions,
//! a combination logic, payroll-affecting actions, and optionally a tiered
//! (escalating) configuration backed by occurrence counters. Policies are
//! produced upstream as already-structured data; the engine only consumes
//! them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::eval::FieldValue;

/// How a policy's conditions combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionLogic {
    /// Every condition must hold (AND).
    #[serde(rename = "ALL", alias = "AND")]
    All,
    /// At least one condition must hold (OR).
    #[serde(rename = "ANY", alias = "OR")]
    Any,
}

impl Default for ConditionLogic {
    fn default() -> Self {
        ConditionLogic::All
    }
}

/// Comparison operator in a policy condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    /// Strictly greater than.
    #[serde(rename = ">", alias = "GREATER_THAN")]
    GreaterThan,
    /// Greater than or equal.
    #[serde(rename = ">=", alias = "GREATER_THAN_OR_EQUAL")]
    GreaterOrEqual,
    /// Strictly less than.
    #[serde(rename = "<", alias = "LESS_THAN")]
    LessThan,
    /// Less than or equal.
    #[serde(rename = "<=", alias = "LESS_THAN_OR_EQUAL")]
    LessOrEqual,
    /// Equality (numeric when both sides are numeric, else text).
    #[serde(rename = "==", alias = "=", alias = "EQUALS")]
    Equals,
    /// Inequality.
    #[serde(rename = "!=", alias = "NOT_EQUALS")]
    NotEquals,
    /// Substring containment on the text form of the value.
    #[serde(rename = "CONTAINS")]
    Contains,
    /// The field must be boolean true.
    #[serde(rename = "IS_TRUE")]
    IsTrue,
    /// The field must be boolean false.
    #[serde(rename = "IS_FALSE")]
    IsFalse,
    /// Inclusive range check; expected value is a 2-element list.
    #[serde(rename = "BETWEEN")]
    Between,
    /// Membership check; expected value is a list.
    #[serde(rename = "IN")]
    In,
}

/// One condition of a policy: a dotted field path, an operator, and the
/// expected value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Dotted context field path, or a supported shorthand (`lateDays`).
    pub field: String,
    /// The comparison operator.
    pub operator: ComparisonOp,
    /// The expected value. Absent for `IS_TRUE`/`IS_FALSE`.
    #[serde(default)]
    pub value: Option<FieldValue>,
    /// Optional conditions are skipped when the field cannot be resolved.
    #[serde(default)]
    pub optional: bool,
}

/// What a policy action does when conditions are met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    /// Adds to the employee's payroll.
    #[serde(rename = "ADD", alias = "ADD_TO_PAYROLL")]
    Add,
    /// A bonus payment (earning).
    #[serde(rename = "BONUS")]
    Bonus,
    /// An allowance payment (earning).
    #[serde(rename = "ALLOWANCE")]
    Allowance,
    /// Deducts from the employee's payroll.
    #[serde(rename = "DEDUCT", alias = "DEDUCT_FROM_PAYROLL", alias = "DEDUCTION")]
    Deduct,
    /// Sends a notification; no payroll effect.
    #[serde(rename = "NOTIFY")]
    Notify,
    /// Raises an alert; no payroll effect.
    #[serde(rename = "ALERT")]
    Alert,
}

impl ActionType {
    /// True for action types that add to payroll.
    pub fn is_earning(&self) -> bool {
        matches!(self, ActionType::Add | ActionType::Bonus | ActionType::Allowance)
    }

    /// True for action types that deduct from payroll.
    pub fn is_deduction(&self) -> bool {
        matches!(self, ActionType::Deduct)
    }

    /// True when the action contributes a payroll amount at all.
    pub fn affects_payroll(&self) -> bool {
        self.is_earning() || self.is_deduction()
    }
}

/// How an action's value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
    /// A literal amount.
    #[serde(rename = "FIXED")]
    Fixed,
    /// A percentage of the configured salary base.
    #[serde(rename = "PERCENTAGE")]
    Percentage,
    /// A restricted formula evaluated against the context.
    #[serde(rename = "FORMULA")]
    Formula,
}

/// Which salary figure percentage actions are based on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalaryBase {
    /// The contract's basic salary.
    #[serde(rename = "BASIC")]
    Basic,
    /// The contract's total salary including allowances.
    #[serde(rename = "TOTAL")]
    Total,
}

impl Default for SalaryBase {
    fn default() -> Self {
        SalaryBase::Basic
    }
}

/// One action of a policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// What the action does.
    #[serde(rename = "type")]
    pub action_type: ActionType,
    /// How `value`/`formula` is interpreted.
    pub value_type: ValueType,
    /// Literal or percentage value. Unused for `FORMULA`.
    #[serde(default)]
    pub value: Option<f64>,
    /// Restricted formula text. Only used for `FORMULA`.
    #[serde(default)]
    pub formula: Option<String>,
    /// Salary base for `PERCENTAGE` actions.
    #[serde(default)]
    pub base: SalaryBase,
    /// Optional human-readable description for payroll lines.
    #[serde(default)]
    pub description: Option<String>,
}

/// What a penalty tier does once matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TierActionType {
    /// No penalty at this tier.
    #[serde(rename = "NONE")]
    None,
    /// Deduct from payroll.
    #[serde(rename = "DEDUCT")]
    Deduct,
    /// Add to payroll.
    #[serde(rename = "ADD")]
    Add,
    /// Notify only; no payroll effect.
    #[serde(rename = "NOTIFY")]
    Notify,
}

/// The action attached to a penalty tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierAction {
    /// What the tier does.
    #[serde(rename = "type")]
    pub action_type: TierActionType,
    /// Literal or percentage value, per `value_type`.
    #[serde(default)]
    pub value: Option<f64>,
    /// How `value`/`formula` is interpreted. Defaults to `FIXED`.
    #[serde(default)]
    pub value_type: Option<ValueType>,
    /// When set, a FIXED value applies once per occurrence at or above the
    /// tier's minimum.
    #[serde(default)]
    pub per_occurrence: bool,
    /// Restricted formula with `count`, `baseSalary`, `value`, `extra` bound.
    #[serde(default)]
    pub formula: Option<String>,
}

/// One tier of an escalating penalty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PenaltyTier {
    /// Tier number, for explanations.
    pub tier: u32,
    /// Minimum occurrence count for this tier to apply.
    pub min_occurrences: u32,
    /// Optional upper bound (inclusive) on the occurrence count.
    #[serde(default)]
    pub max_occurrences: Option<u32>,
    /// What the tier does.
    pub action: TierAction,
}

/// Tiered (escalating) penalty configuration for a policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TieredConfig {
    /// The occurrence type the tiers escalate on (e.g. `LATE`).
    pub occurrence_type: String,
    /// The tiers, in any order; matching prefers the largest minimum.
    pub tiers: Vec<PenaltyTier>,
}

/// A named, company-owned policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Unique identifier.
    pub id: String,
    /// Owning company.
    pub company_id: String,
    /// Display name.
    pub name: String,
    /// Conditions that gate the actions.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// How the conditions combine.
    #[serde(default)]
    pub condition_logic: ConditionLogic,
    /// Payroll-affecting actions applied when conditions hold.
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Optional escalating penalty configuration; when present it replaces
    /// condition/action evaluation entirely.
    #[serde(default)]
    pub tiered_config: Option<TieredConfig>,
    /// Execution order within a run (ascending).
    #[serde(default)]
    pub execution_order: i32,
    /// Priority within the same execution order (descending).
    #[serde(default)]
    pub priority: i32,
    /// Inactive policies are never evaluated.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Running statistics folded into the policy store after each execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyStats {
    /// How many times the policy produced a payroll line.
    pub execution_count: u64,
    /// When the policy last produced a line.
    pub last_executed_at: Option<DateTime<Utc>>,
    /// Cumulative amount paid out by the policy.
    pub total_paid: Decimal,
    /// Cumulative amount deducted by the policy.
    pub total_deducted: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_policy_definition_format() {
        // The administrator-facing format produced upstream.
        let json = r#"{
            "id": "pol_late",
            "companyId": "co_1",
            "name": "Late arrival deduction",
            "conditions": [
                {"field": "lateDays", "operator": ">", "value": 3}
            ],
            "conditionLogic": "ALL",
            "actions": [
                {"type": "DEDUCT", "valueType": "FIXED", "value": 100}
            ]
        }"#;

        let policy: Policy = serde_json::from_str(json).unwrap();
        assert_eq!(policy.id, "pol_late");
        assert_eq!(policy.condition_logic, ConditionLogic::All);
        assert_eq!(policy.conditions.len(), 1);
        assert_eq!(policy.conditions[0].operator, ComparisonOp::GreaterThan);
        assert_eq!(policy.actions[0].action_type, ActionType::Deduct);
        assert_eq!(policy.actions[0].value, Some(100.0));
        assert!(policy.is_active);
        assert!(policy.tiered_config.is_none());
    }

    #[test]
    fn test_deserialize_word_operator_aliases() {
        let condition: Condition = serde_json::from_str(
            r#"{"field": "absentDays", "operator": "GREATER_THAN_OR_EQUAL", "value": 2}"#,
        )
        .unwrap();
        assert_eq!(condition.operator, ComparisonOp::GreaterOrEqual);
    }

    #[test]
    fn test_deserialize_condition_logic_aliases() {
        assert_eq!(
            serde_json::from_str::<ConditionLogic>("\"AND\"").unwrap(),
            ConditionLogic::All
        );
        assert_eq!(
            serde_json::from_str::<ConditionLogic>("\"OR\"").unwrap(),
            ConditionLogic::Any
        );
    }

    #[test]
    fn test_deserialize_action_type_aliases() {
        let action: Action = serde_json::from_str(
            r#"{"type": "DEDUCT_FROM_PAYROLL", "valueType": "PERCENTAGE", "value": 10, "base": "TOTAL"}"#,
        )
        .unwrap();
        assert_eq!(action.action_type, ActionType::Deduct);
        assert_eq!(action.base, SalaryBase::Total);
    }

    #[test]
    fn test_tiered_config_deserialization() {
        let json = r#"{
            "occurrenceType": "LATE",
            "tiers": [
                {"tier": 1, "minOccurrences": 1, "maxOccurrences": 1, "action": {"type": "NONE"}},
                {"tier": 2, "minOccurrences": 2, "action": {"type": "DEDUCT", "valueType": "FIXED", "value": 50}}
            ]
        }"#;
        let config: TieredConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.tiers.len(), 2);
        assert_eq!(config.tiers[1].min_occurrences, 2);
        assert_eq!(config.tiers[1].action.action_type, TierActionType::Deduct);
        assert!(!config.tiers[1].action.per_occurrence);
    }

    #[test]
    fn test_action_type_classification() {
        assert!(ActionType::Add.is_earning());
        assert!(ActionType::Bonus.is_earning());
        assert!(ActionType::Allowance.is_earning());
        assert!(ActionType::Deduct.is_deduction());
        assert!(!ActionType::Notify.affects_payroll());
        assert!(!ActionType::Alert.affects_payroll());
    }

    #[test]
    fn test_policy_round_trip() {
        let policy = Policy {
            id: "p1".to_string(),
            company_id: "c1".to_string(),
            name: "Test".to_string(),
            conditions: vec![],
            condition_logic: ConditionLogic::Any,
            actions: vec![],
            tiered_config: None,
            execution_order: 5,
            priority: 10,
            is_active: false,
        };
        let json = serde_json::to_string(&policy).unwrap();
        let back: Policy = serde_json::from_str(&json).unwrap();
        assert_eq!(policy, back);
    }
}
