//! Policy condition evaluation.
//!
//! Evaluates a policy's condition list against a context view with
//! ALL/ANY combination semantics. Field resolution tries the static
//! context snapshot first, then the closed dynamic-aggregation registry.
//!
//! Unresolved fields follow one consistent rule: optional conditions are
//! skipped; an expected value of exactly zero defaults the actual value
//! to zero; otherwise the condition counts as unmet under ALL logic and
//! is skipped under ANY logic.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::context::{AggregateQuery, AggregationSource, ContextView};
use crate::error::{EngineError, EngineResult};
use crate::eval::expression;
use crate::eval::FieldValue;
use crate::models::{ComparisonOp, Condition, ConditionLogic};

/// Outcome of checking one condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Met,
    Unmet,
    Skipped,
    Unresolved,
}

/// Evaluates condition lists against a context.
pub struct ConditionEvaluator {
    aggregation: Option<Arc<dyn AggregationSource>>,
}

impl ConditionEvaluator {
    /// Creates an evaluator; pass an aggregation source to enable the
    /// dynamic resolution fallback.
    pub fn new(aggregation: Option<Arc<dyn AggregationSource>>) -> Self {
        Self { aggregation }
    }

    /// Evaluates the conditions under the given combination logic.
    ///
    /// ALL short-circuits to false on the first unmet condition; ANY
    /// short-circuits to true on the first met condition. An empty list
    /// evaluates to true.
    pub async fn evaluate(
        &self,
        conditions: &[Condition],
        logic: ConditionLogic,
        view: &ContextView,
    ) -> EngineResult<bool> {
        if conditions.is_empty() {
            return Ok(true);
        }
        for condition in conditions {
            let outcome = self.check(condition, view).await?;
            debug!(
                field = %condition.field,
                ?outcome,
                "condition checked"
            );
            match (logic, outcome) {
                (ConditionLogic::All, Outcome::Unmet | Outcome::Unresolved) => return Ok(false),
                (ConditionLogic::Any, Outcome::Met) => return Ok(true),
                _ => {}
            }
        }
        Ok(matches!(logic, ConditionLogic::All))
    }

    /// Resolves and compares one condition.
    async fn check(&self, condition: &Condition, view: &ContextView) -> EngineResult<Outcome> {
        let actual = match self.resolve(condition, view).await? {
            Some(value) => value,
            None => {
                if condition.optional {
                    return Ok(Outcome::Skipped);
                }
                if condition.value.as_ref().is_some_and(FieldValue::is_zero) {
                    FieldValue::Number(0.0)
                } else {
                    warn!(field = %condition.field, "condition field unresolved");
                    return Ok(Outcome::Unresolved);
                }
            }
        };
        let met = Self::compare(&actual, condition)?;
        Ok(if met { Outcome::Met } else { Outcome::Unmet })
    }

    /// Static snapshot lookup, then the dynamic aggregation registry.
    async fn resolve(
        &self,
        condition: &Condition,
        view: &ContextView,
    ) -> EngineResult<Option<FieldValue>> {
        if let Some(value) = view.get(&condition.field) {
            return Ok(Some(value));
        }
        let expanded = ContextView::expand_shorthand(&condition.field);
        if let (Some(source), Some(query)) = (&self.aggregation, AggregateQuery::parse(expanded)) {
            let count = source.run(view.employee_id(), view.period(), &query).await?;
            return Ok(Some(FieldValue::Number(count)));
        }
        Ok(None)
    }

    fn compare(actual: &FieldValue, condition: &Condition) -> EngineResult<bool> {
        let expected = || {
            condition
                .value
                .clone()
                .ok_or_else(|| EngineError::parse(&condition.field, "condition is missing a value"))
        };
        match condition.operator {
            ComparisonOp::IsTrue => Ok(is_truthy(actual)),
            ComparisonOp::IsFalse => Ok(!is_truthy(actual)),
            ComparisonOp::Between => {
                let bounds = expected()?;
                let FieldValue::List(items) = &bounds else {
                    return Err(EngineError::parse(
                        &condition.field,
                        "BETWEEN expects a 2-element list",
                    ));
                };
                let (Some(low), Some(high)) = (
                    items.first().and_then(FieldValue::as_number),
                    items.get(1).and_then(FieldValue::as_number),
                ) else {
                    return Err(EngineError::parse(
                        &condition.field,
                        "BETWEEN expects numeric bounds",
                    ));
                };
                let Some(value) = actual.as_number() else {
                    return Ok(false);
                };
                Ok(value >= low && value <= high)
            }
            ComparisonOp::In => expression::evaluate_comparison(actual, "IN", &expected()?),
            ComparisonOp::Contains => {
                expression::evaluate_comparison(actual, "CONTAINS", &expected()?)
            }
            ComparisonOp::GreaterThan => expression::evaluate_comparison(actual, ">", &expected()?),
            ComparisonOp::GreaterOrEqual => {
                expression::evaluate_comparison(actual, ">=", &expected()?)
            }
            ComparisonOp::LessThan => expression::evaluate_comparison(actual, "<", &expected()?),
            ComparisonOp::LessOrEqual => {
                expression::evaluate_comparison(actual, "<=", &expected()?)
            }
            ComparisonOp::Equals => expression::evaluate_comparison(actual, "==", &expected()?),
            ComparisonOp::NotEquals => expression::evaluate_comparison(actual, "!=", &expected()?),
        }
    }
}

fn is_truthy(value: &FieldValue) -> bool {
    match value {
        FieldValue::Bool(b) => *b,
        FieldValue::Number(n) => *n != 0.0,
        FieldValue::Text(s) => s.eq_ignore_ascii_case("true"),
        FieldValue::List(items) => !items.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::models::{EnrichedContext, Period, PeriodContext};

    fn view() -> ContextView {
        let mut context = EnrichedContext::default();
        context.employee.id = "emp_1".to_string();
        context.attendance.current_period.late_days = 4.0;
        context.attendance.current_period.absent_days = 0.0;
        context.contract.on_probation = true;
        context.department.name = Some("Sales".to_string());
        context.period = PeriodContext::from(Period::new(2025, 1).unwrap());
        ContextView::new(&context).unwrap()
    }

    fn condition(field: &str, operator: ComparisonOp, value: Option<FieldValue>) -> Condition {
        Condition {
            field: field.to_string(),
            operator,
            value,
            optional: false,
        }
    }

    fn evaluator() -> ConditionEvaluator {
        ConditionEvaluator::new(None)
    }

    #[tokio::test]
    async fn test_all_requires_every_condition() {
        let conditions = vec![
            condition("lateDays", ComparisonOp::GreaterThan, Some(FieldValue::Number(3.0))),
            condition("absentDays", ComparisonOp::Equals, Some(FieldValue::Number(0.0))),
        ];
        assert!(evaluator()
            .evaluate(&conditions, ConditionLogic::All, &view())
            .await
            .unwrap());

        let mut failing = conditions.clone();
        failing[1] = condition("absentDays", ComparisonOp::GreaterThan, Some(FieldValue::Number(1.0)));
        assert!(!evaluator()
            .evaluate(&failing, ConditionLogic::All, &view())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_any_needs_one_met_condition() {
        let conditions = vec![
            condition("lateDays", ComparisonOp::GreaterThan, Some(FieldValue::Number(10.0))),
            condition("contract.onProbation", ComparisonOp::IsTrue, None),
        ];
        assert!(evaluator()
            .evaluate(&conditions, ConditionLogic::Any, &view())
            .await
            .unwrap());

        let all_unmet = vec![
            condition("lateDays", ComparisonOp::GreaterThan, Some(FieldValue::Number(10.0))),
            condition("absentDays", ComparisonOp::GreaterThan, Some(FieldValue::Number(5.0))),
        ];
        assert!(!evaluator()
            .evaluate(&all_unmet, ConditionLogic::Any, &view())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_empty_conditions_hold() {
        assert!(evaluator()
            .evaluate(&[], ConditionLogic::All, &view())
            .await
            .unwrap());
        assert!(evaluator()
            .evaluate(&[], ConditionLogic::Any, &view())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_unresolved_field_fails_all_logic() {
        let conditions = vec![condition(
            "noSuch.field",
            ComparisonOp::GreaterThan,
            Some(FieldValue::Number(1.0)),
        )];
        assert!(!evaluator()
            .evaluate(&conditions, ConditionLogic::All, &view())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_unresolved_field_skipped_under_any_logic() {
        let conditions = vec![
            condition("noSuch.field", ComparisonOp::GreaterThan, Some(FieldValue::Number(1.0))),
            condition("lateDays", ComparisonOp::GreaterThan, Some(FieldValue::Number(3.0))),
        ];
        assert!(evaluator()
            .evaluate(&conditions, ConditionLogic::Any, &view())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_unresolved_optional_condition_is_skipped() {
        let mut optional = condition(
            "noSuch.field",
            ComparisonOp::GreaterThan,
            Some(FieldValue::Number(1.0)),
        );
        optional.optional = true;
        let conditions = vec![
            optional,
            condition("lateDays", ComparisonOp::GreaterThan, Some(FieldValue::Number(3.0))),
        ];
        assert!(evaluator()
            .evaluate(&conditions, ConditionLogic::All, &view())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_unresolved_with_expected_zero_defaults_actual_to_zero() {
        let conditions = vec![condition(
            "noSuch.field",
            ComparisonOp::Equals,
            Some(FieldValue::Number(0.0)),
        )];
        assert!(evaluator()
            .evaluate(&conditions, ConditionLogic::All, &view())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_between_and_in_operators() {
        let between = vec![condition(
            "lateDays",
            ComparisonOp::Between,
            Some(FieldValue::List(vec![
                FieldValue::Number(3.0),
                FieldValue::Number(5.0),
            ])),
        )];
        assert!(evaluator()
            .evaluate(&between, ConditionLogic::All, &view())
            .await
            .unwrap());

        let membership = vec![condition(
            "department.name",
            ComparisonOp::In,
            Some(FieldValue::List(vec![
                FieldValue::Text("Sales".into()),
                FieldValue::Text("Support".into()),
            ])),
        )];
        assert!(evaluator()
            .evaluate(&membership, ConditionLogic::All, &view())
            .await
            .unwrap());
    }

    struct FixedAggregation(f64);

    #[async_trait]
    impl AggregationSource for FixedAggregation {
        async fn run(
            &self,
            _employee_id: &str,
            _period: Period,
            _query: &AggregateQuery,
        ) -> EngineResult<f64> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn test_dynamic_fallback_resolves_aggregate_fields() {
        let evaluator = ConditionEvaluator::new(Some(Arc::new(FixedAggregation(3.0))));
        let conditions = vec![condition(
            "attendance.daysWorkedBetween.1.6",
            ComparisonOp::GreaterOrEqual,
            Some(FieldValue::Number(2.0)),
        )];
        assert!(evaluator
            .evaluate(&conditions, ConditionLogic::All, &view())
            .await
            .unwrap());
    }
}
