//! Policy execution orchestration.
//!
//! Runs every applicable policy for one employee and period: resolves
//! exclusions, evaluates conditions or delegates to the tiered penalty
//! path, computes action amounts, emits signed payroll lines, and
//! persists the audit trail. Per-policy failures are isolated and
//! recorded; they never abort the employee's run.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::context::{ContextBuilder, ContextView, EmployeeDirectory, EmployeeRecord};
use crate::engine::cache::PolicyCache;
use crate::engine::exceptions::ExceptionResolver;
use crate::engine::occurrence::{OccurrenceLedger, compute_penalty};
use crate::error::{EngineError, EngineResult};
use crate::eval::{ConditionEvaluator, FormulaEvaluator};
use crate::models::{
    Action, ExecutionRecord, LineSign, LineSource, PayrollLine, Period, Policy, SalaryBase,
    TierActionType, ValueType, to_money,
};
use crate::store::{ExecutionStore, PolicyStore};

/// Trigger label for payroll-run executions.
pub const TRIGGER_PAYROLL_RUN: &str = "PAYROLL_RUN";
/// Trigger label for event-driven executions.
pub const TRIGGER_EVENT: &str = "ATTENDANCE_EVENT";

/// The projected effect of one policy on one employee, before any
/// persistence. Pure output of the read-only evaluation path.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyProjection {
    /// Whether the policy's conditions (or a penalty tier) matched.
    pub conditions_met: bool,
    /// Sign of the effect; `None` when there is no payroll effect.
    pub sign: Option<LineSign>,
    /// Magnitude of the effect.
    pub amount: f64,
    /// Explanation for payslips and reports.
    pub description: String,
    /// The tier or rule within the policy that produced the effect.
    pub rule_id: Option<String>,
}

impl PolicyProjection {
    fn nothing(conditions_met: bool, description: impl Into<String>) -> Self {
        Self {
            conditions_met,
            sign: None,
            amount: 0.0,
            description: description.into(),
            rule_id: None,
        }
    }

    /// Signed amount: positive pays the employee, negative deducts.
    pub fn signed_amount(&self) -> f64 {
        match self.sign {
            Some(LineSign::Earning) => self.amount,
            Some(LineSign::Deduction) => -self.amount,
            None => 0.0,
        }
    }
}

/// Orchestrates policy evaluation per employee.
pub struct PolicyExecutor {
    cache: Arc<PolicyCache>,
    builder: Arc<ContextBuilder>,
    conditions: ConditionEvaluator,
    ledger: Arc<OccurrenceLedger>,
    exceptions: Arc<ExceptionResolver>,
    executions: Arc<dyn ExecutionStore>,
    policies: Arc<dyn PolicyStore>,
    directory: Arc<dyn EmployeeDirectory>,
}

impl PolicyExecutor {
    /// Wires an executor from its collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cache: Arc<PolicyCache>,
        builder: Arc<ContextBuilder>,
        conditions: ConditionEvaluator,
        ledger: Arc<OccurrenceLedger>,
        exceptions: Arc<ExceptionResolver>,
        executions: Arc<dyn ExecutionStore>,
        policies: Arc<dyn PolicyStore>,
        directory: Arc<dyn EmployeeDirectory>,
    ) -> Self {
        Self {
            cache,
            builder,
            conditions,
            ledger,
            exceptions,
            executions,
            policies,
            directory,
        }
    }

    /// The occurrence ledger, shared with event ingestion.
    pub fn ledger(&self) -> &Arc<OccurrenceLedger> {
        &self.ledger
    }

    /// Builds the evaluation context view for one employee and period.
    pub async fn view_for(&self, employee_id: &str, period: Period) -> EngineResult<ContextView> {
        let context = self.builder.enrich(employee_id, period).await?;
        ContextView::new(&context)
    }

    /// Runs all active policies of the employee's company for the given
    /// payroll period and returns the resulting payroll lines. Pending
    /// event-driven execution records are surfaced exactly once and
    /// stamped with the period.
    pub async fn execute_for_employee(
        &self,
        employee_id: &str,
        period: Period,
    ) -> EngineResult<Vec<PayrollLine>> {
        let employee = self
            .directory
            .find(employee_id)
            .await?
            .ok_or_else(|| EngineError::EmployeeNotFound {
                employee_id: employee_id.to_string(),
            })?;
        let view = self.view_for(employee_id, period).await?;
        let policies = self.cache.active_policies(&employee.company_id).await?;

        let mut lines = Vec::new();
        for policy in &policies {
            match self.run_policy(policy, &employee, &view, period).await {
                Ok(Some(line)) => lines.push(line),
                Ok(None) => {}
                Err(error) => {
                    warn!(
                        policy_id = %policy.id,
                        employee_id,
                        %error,
                        "policy evaluation failed, recording and continuing"
                    );
                    let mut record =
                        ExecutionRecord::new(&policy.id, employee_id, TRIGGER_PAYROLL_RUN);
                    record.error = Some(error.to_string());
                    self.executions.insert(record).await?;
                }
            }
        }

        // surface event-driven records exactly once
        for record in self.executions.pending_for(employee_id).await? {
            if self.executions.stamp(&record.id, period).await? {
                if record.amount > Decimal::ZERO {
                    lines.push(line_from_record(&record));
                }
            }
        }

        info!(
            employee_id,
            period = %period,
            line_count = lines.len(),
            "policy execution completed"
        );
        Ok(lines)
    }

    /// Evaluates one policy and persists its outcome. Returns the
    /// payroll line when the policy produced a non-zero effect.
    async fn run_policy(
        &self,
        policy: &Policy,
        employee: &EmployeeRecord,
        view: &ContextView,
        period: Period,
    ) -> EngineResult<Option<PayrollLine>> {
        let check = self
            .exceptions
            .is_employee_excluded(&policy.id, employee)
            .await?;
        if check.is_excluded {
            debug!(
                policy_id = %policy.id,
                employee_id = %employee.id,
                reason = check.reason.as_deref().unwrap_or(""),
                "employee excluded from policy"
            );
            return Ok(None);
        }

        let projection = self.project(policy, view, false).await?;
        if projection.amount == 0.0 {
            return Ok(None);
        }

        let mut record = ExecutionRecord::new(&policy.id, &employee.id, TRIGGER_PAYROLL_RUN);
        record.conditions_met = projection.conditions_met;
        record.success = true;
        record.action_type = Some(
            match projection.sign {
                Some(LineSign::Earning) => "ADD",
                _ => "DEDUCT",
            }
            .to_string(),
        );
        record.amount = to_money(projection.amount);
        record.result = serde_json::json!({
            "description": projection.description,
            "ruleId": projection.rule_id,
        });
        record.payroll_period = Some(period);
        self.executions.insert(record).await?;

        let (paid, deducted) = match projection.sign {
            Some(LineSign::Earning) => (to_money(projection.amount), Decimal::ZERO),
            _ => (Decimal::ZERO, to_money(projection.amount)),
        };
        self.policies.fold_stats(&policy.id, paid, deducted).await?;

        Ok(Some(PayrollLine {
            component_id: format!("policy:{}", policy.id),
            component_name: policy.name.clone(),
            amount: to_money(projection.amount),
            sign: projection.sign.unwrap_or(LineSign::Deduction),
            description: projection.description.clone(),
            source: LineSource {
                policy_id: policy.id.clone(),
                rule_id: projection.rule_id.clone(),
            },
        }))
    }

    /// Read-only projection of one policy against a context view. Used
    /// by simulation and retroactive paths; never writes anything, and
    /// reads occurrence counts without persisting resets.
    pub async fn project_policy(
        &self,
        policy: &Policy,
        view: &ContextView,
    ) -> EngineResult<PolicyProjection> {
        self.project(policy, view, true).await
    }

    async fn project(
        &self,
        policy: &Policy,
        view: &ContextView,
        read_only: bool,
    ) -> EngineResult<PolicyProjection> {
        if let Some(tiered) = &policy.tiered_config {
            return self.project_tiered(policy, tiered, view, read_only).await;
        }

        let met = self
            .conditions
            .evaluate(&policy.conditions, policy.condition_logic, view)
            .await?;
        if !met {
            return Ok(PolicyProjection::nothing(false, "conditions not met"));
        }

        let mut net = 0.0;
        let mut descriptions = Vec::new();
        for action in &policy.actions {
            if !action.action_type.affects_payroll() {
                continue;
            }
            let amount = match self.action_amount(action, view) {
                Ok(amount) => amount,
                Err(error) => {
                    // arithmetic failure contributes zero, never aborts
                    warn!(
                        policy_id = %policy.id,
                        %error,
                        "action amount failed, contributing zero"
                    );
                    0.0
                }
            };
            if action.action_type.is_earning() {
                net += amount;
            } else {
                net -= amount;
            }
            if let Some(description) = &action.description {
                descriptions.push(description.clone());
            }
        }

        if net == 0.0 {
            return Ok(PolicyProjection::nothing(true, "net effect is zero"));
        }
        let description = if descriptions.is_empty() {
            policy.name.clone()
        } else {
            descriptions.join("; ")
        };
        Ok(PolicyProjection {
            conditions_met: true,
            sign: Some(if net > 0.0 {
                LineSign::Earning
            } else {
                LineSign::Deduction
            }),
            amount: net.abs(),
            description,
            rule_id: None,
        })
    }

    async fn project_tiered(
        &self,
        policy: &Policy,
        tiered: &crate::models::TieredConfig,
        view: &ContextView,
        read_only: bool,
    ) -> EngineResult<PolicyProjection> {
        let employee_id = view.employee_id().to_string();
        let count = if read_only {
            self.ledger
                .peek_count(&policy.id, &employee_id, &tiered.occurrence_type)
                .await?
        } else {
            self.ledger
                .occurrence_count(&policy.id, &employee_id, &tiered.occurrence_type)
                .await?
        };
        let base_salary = view.get_number("contract.basicSalary").unwrap_or(0.0);
        let outcome = compute_penalty(&tiered.tiers, count, base_salary)?;

        let sign = outcome.action.as_ref().and_then(|action| {
            match action.action_type {
                TierActionType::Deduct => Some(LineSign::Deduction),
                TierActionType::Add => Some(LineSign::Earning),
                TierActionType::None | TierActionType::Notify => None,
            }
        });

        Ok(PolicyProjection {
            conditions_met: outcome.tier.is_some(),
            sign: if outcome.amount > 0.0 { sign } else { None },
            amount: if sign.is_some() { outcome.amount } else { 0.0 },
            description: outcome.explanation,
            rule_id: outcome.tier.map(|t| format!("tier_{}", t)),
        })
    }

    fn action_amount(&self, action: &Action, view: &ContextView) -> EngineResult<f64> {
        match action.value_type {
            ValueType::Fixed => Ok(action.value.unwrap_or(0.0)),
            ValueType::Percentage => {
                let base = match action.base {
                    SalaryBase::Basic => view.get_number("contract.basicSalary"),
                    SalaryBase::Total => view.get_number("contract.totalSalary"),
                }
                .unwrap_or(0.0);
                Ok(base * action.value.unwrap_or(0.0) / 100.0)
            }
            ValueType::Formula => {
                let formula = action.formula.as_deref().ok_or_else(|| {
                    EngineError::parse("", "FORMULA action is missing its formula")
                })?;
                FormulaEvaluator::evaluate(formula, view)
            }
        }
    }

    /// Ingests one qualifying event for a tiered policy: records the
    /// occurrence, computes the resulting penalty, and persists an
    /// unstamped execution record that the next payroll run will
    /// surface and stamp.
    pub async fn handle_occurrence_event(
        &self,
        policy_id: &str,
        employee_id: &str,
        event_data: serde_json::Value,
    ) -> EngineResult<u32> {
        let policy = self
            .policies
            .policy(policy_id)
            .await?
            .ok_or_else(|| EngineError::PolicyNotFound {
                policy_id: policy_id.to_string(),
            })?;
        let tiered = policy
            .tiered_config
            .as_ref()
            .ok_or_else(|| EngineError::PolicyNotFound {
                policy_id: format!("{} (no tiered configuration)", policy_id),
            })?;

        let count = self
            .ledger
            .record_occurrence(
                policy_id,
                employee_id,
                &tiered.occurrence_type,
                Default::default(),
                event_data,
            )
            .await?;

        let now = chrono::Utc::now();
        use chrono::Datelike;
        let period = Period::new(now.year(), now.month())?;
        let view = self.view_for(employee_id, period).await?;
        let base_salary = view.get_number("contract.basicSalary").unwrap_or(0.0);
        let outcome = compute_penalty(&tiered.tiers, count, base_salary)?;

        if outcome.amount > 0.0 {
            let mut record = ExecutionRecord::new(policy_id, employee_id, TRIGGER_EVENT);
            record.conditions_met = true;
            record.success = true;
            record.action_type = Some(
                match outcome.action.as_ref().map(|a| a.action_type) {
                    Some(TierActionType::Add) => "ADD",
                    _ => "DEDUCT",
                }
                .to_string(),
            );
            record.amount = to_money(outcome.amount);
            record.result = serde_json::json!({
                "description": outcome.explanation,
                "occurrenceCount": count,
            });
            self.executions.insert(record).await?;
        }
        Ok(count)
    }
}

fn line_from_record(record: &ExecutionRecord) -> PayrollLine {
    let sign = match record.action_type.as_deref() {
        Some(action) if action.contains("DEDUCT") => LineSign::Deduction,
        _ => LineSign::Earning,
    };
    let description = record
        .result
        .get("description")
        .and_then(|v| v.as_str())
        .unwrap_or(&record.trigger_event)
        .to_string();
    PayrollLine {
        component_id: format!("policy:{}", record.policy_id),
        component_name: description.clone(),
        amount: record.amount,
        sign,
        description,
        source: LineSource {
            policy_id: record.policy_id.clone(),
            rule_id: None,
        },
    }
}
