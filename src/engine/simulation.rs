//! Dry-run simulation of a policy across a workforce.
//!
//! Simulation reuses the executor's read-only projection path, so a run
//! never writes execution records, never increments occurrence counters,
//! and never touches policy statistics. Employees are evaluated in fixed
//! batches; one employee's failure becomes a warning, not a run failure,
//! and a wall-clock budget turns an oversized run into a partial result
//! instead of an unbounded one.

use std::sync::Arc;
use std::time::Instant;

use rust_decimal::Decimal;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::context::EmployeeDirectory;
use crate::engine::executor::PolicyExecutor;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    EmployeeProjection, LineSign, Period, Policy, SimulationRun, SimulationSummary, to_money,
};
use crate::store::{PolicyStore, SimulationStore};

/// Default number of employees evaluated concurrently per batch.
pub const DEFAULT_BATCH_SIZE: usize = 50;
/// Default wall-clock budget for a whole run.
pub const DEFAULT_BUDGET_MS: u64 = 30_000;

/// Runs what-if evaluations of a policy without side effects.
pub struct SimulationEngine {
    executor: Arc<PolicyExecutor>,
    policies: Arc<dyn PolicyStore>,
    directory: Arc<dyn EmployeeDirectory>,
    store: Arc<dyn SimulationStore>,
    batch_size: usize,
    budget_ms: u64,
}

impl SimulationEngine {
    /// Creates a simulation engine with default batching and budget.
    pub fn new(
        executor: Arc<PolicyExecutor>,
        policies: Arc<dyn PolicyStore>,
        directory: Arc<dyn EmployeeDirectory>,
        store: Arc<dyn SimulationStore>,
    ) -> Self {
        Self {
            executor,
            policies,
            directory,
            store,
            batch_size: DEFAULT_BATCH_SIZE,
            budget_ms: DEFAULT_BUDGET_MS,
        }
    }

    /// Overrides the per-batch employee count.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Overrides the wall-clock budget in milliseconds.
    pub fn with_budget_ms(mut self, budget_ms: u64) -> Self {
        self.budget_ms = budget_ms;
        self
    }

    /// Simulates the policy against every active employee of its company
    /// for the given period, persisting and returning the run snapshot.
    pub async fn simulate(
        &self,
        policy_id: &str,
        period: Period,
        actor_id: &str,
    ) -> EngineResult<SimulationRun> {
        let policy = self
            .policies
            .policy(policy_id)
            .await?
            .ok_or_else(|| EngineError::PolicyNotFound {
                policy_id: policy_id.to_string(),
            })?;
        let employees = self.directory.active_employees(&policy.company_id).await?;
        let employee_ids: Vec<(String, String)> = employees
            .into_iter()
            .map(|e| (e.id, e.name))
            .collect();
        self.simulate_for_employees(&policy, &employee_ids, period, actor_id)
            .await
    }

    /// Simulates the policy against an explicit employee list.
    pub async fn simulate_for_employees(
        &self,
        policy: &Policy,
        employees: &[(String, String)],
        period: Period,
        actor_id: &str,
    ) -> EngineResult<SimulationRun> {
        let started = Instant::now();
        let policy = Arc::new(policy.clone());
        let mut results: Vec<EmployeeProjection> = Vec::with_capacity(employees.len());
        let mut warnings: Vec<String> = Vec::new();

        for batch in employees.chunks(self.batch_size) {
            if started.elapsed().as_millis() as u64 >= self.budget_ms {
                let message = format!(
                    "time budget of {}ms exceeded after {} of {} employees; results are partial",
                    self.budget_ms,
                    results.len(),
                    employees.len()
                );
                warn!(policy_id = %policy.id, "{}", message);
                warnings.push(message);
                break;
            }

            let mut set = JoinSet::new();
            for (employee_id, employee_name) in batch {
                let executor = self.executor.clone();
                let policy = policy.clone();
                let employee_id = employee_id.clone();
                let employee_name = employee_name.clone();
                set.spawn(async move {
                    let outcome = async {
                        let view = executor.view_for(&employee_id, period).await?;
                        executor.project_policy(&policy, &view).await
                    }
                    .await;
                    (employee_id, employee_name, outcome)
                });
            }

            while let Some(joined) = set.join_next().await {
                let (employee_id, employee_name, outcome) = match joined {
                    Ok(result) => result,
                    Err(error) => {
                        warnings.push(format!("evaluation task failed: {}", error));
                        continue;
                    }
                };
                match outcome {
                    Ok(projection) => results.push(EmployeeProjection {
                        employee_id,
                        employee_name,
                        conditions_met: projection.conditions_met,
                        sign: projection.sign,
                        amount: to_money(projection.amount),
                        description: Some(projection.description),
                    }),
                    Err(error) => {
                        warnings.push(format!("employee {}: {}", employee_id, error));
                        results.push(EmployeeProjection::none(
                            &employee_id,
                            &employee_name,
                            false,
                        ));
                    }
                }
            }
        }

        results.sort_by(|a, b| a.employee_id.cmp(&b.employee_id));

        let mut summary = SimulationSummary {
            employees_evaluated: results.len() as u64,
            ..Default::default()
        };
        for projection in &results {
            match projection.sign {
                Some(LineSign::Earning) => {
                    summary.employees_affected += 1;
                    summary.total_additions += projection.amount;
                }
                Some(LineSign::Deduction) => {
                    summary.employees_affected += 1;
                    summary.total_deductions += projection.amount;
                }
                None => {}
            }
        }
        summary.net_impact = summary.total_additions - summary.total_deductions;
        summary.execution_ms = started.elapsed().as_millis() as u64;

        let run = SimulationRun::new(&policy.id, actor_id, period, summary, results, warnings);
        info!(
            policy_id = %policy.id,
            run_id = %run.id,
            affected = run.summary.employees_affected,
            net_impact = %run.summary.net_impact,
            "simulation completed"
        );
        self.store.insert(run.clone()).await?;
        Ok(run)
    }

    /// A previously persisted run.
    pub async fn get(&self, run_id: &str) -> EngineResult<SimulationRun> {
        self.store
            .get(run_id)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                entity: "SimulationRun".to_string(),
                id: run_id.to_string(),
            })
    }

    /// All persisted runs of one policy, newest first.
    pub async fn history(&self, policy_id: &str) -> EngineResult<Vec<SimulationRun>> {
        self.store.for_policy(policy_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::context::{ContextBuilder, ContextSources, OrgUnitRecord};
    use crate::engine::cache::PolicyCache;
    use crate::engine::exceptions::ExceptionResolver;
    use crate::engine::occurrence::OccurrenceLedger;
    use crate::eval::{ConditionEvaluator, FieldValue};
    use crate::models::{
        Action, ActionType, ComparisonOp, Condition, ConditionLogic, ContractContext, SalaryBase,
        ValueType,
    };
    use crate::store::fixtures::FixtureHub;
    use crate::store::{
        ExecutionStore, MemoryExceptionStore, MemoryExecutionStore, MemoryPolicyStore,
        MemorySimulationStore, MemoryTrackerStore, TrackerStore,
    };

    fn employee(id: &str, late_days: f64) -> (crate::context::EmployeeRecord, f64) {
        (
            crate::context::EmployeeRecord {
                id: id.to_string(),
                company_id: "co_1".to_string(),
                name: format!("Employee {}", id),
                job_title: None,
                department_id: Some("dep_1".to_string()),
                branch_id: None,
                hire_date: None,
                is_active: true,
            },
            late_days,
        )
    }

    struct Harness {
        engine: SimulationEngine,
        policies: Arc<MemoryPolicyStore>,
        executions: Arc<MemoryExecutionStore>,
        trackers: Arc<MemoryTrackerStore>,
    }

    fn harness() -> Harness {
        let period = Period::new(2025, 3).unwrap();
        let mut hub = FixtureHub::new().with_department(OrgUnitRecord {
            id: "dep_1".to_string(),
            name: "Sales".to_string(),
        });
        for (record, late_days) in [
            employee("emp_1", 5.0),
            employee("emp_2", 1.0),
            employee("emp_3", 6.0),
        ] {
            let id = record.id.clone();
            hub = hub
                .with_employee(record)
                .with_contract(
                    &id,
                    ContractContext {
                        basic_salary: 3000.0,
                        total_salary: 3000.0,
                        ..Default::default()
                    },
                )
                .with_attendance(
                    &id,
                    period,
                    crate::models::AttendanceWindow {
                        late_days,
                        ..Default::default()
                    },
                );
        }
        let hub = Arc::new(hub);
        let sources = ContextSources {
            directory: hub.clone(),
            contracts: hub.clone(),
            attendance: hub.clone(),
            leaves: hub.clone(),
            custody: hub.clone(),
            advances: hub.clone(),
            disciplinary: hub.clone(),
            org: hub.clone(),
        };

        let policies = Arc::new(MemoryPolicyStore::new());
        let executions = Arc::new(MemoryExecutionStore::new());
        let trackers = Arc::new(MemoryTrackerStore::new());
        let executor = Arc::new(PolicyExecutor::new(
            Arc::new(PolicyCache::new(policies.clone(), Duration::ZERO)),
            Arc::new(ContextBuilder::new(sources)),
            ConditionEvaluator::new(None),
            Arc::new(OccurrenceLedger::new(trackers.clone())),
            Arc::new(ExceptionResolver::new(
                Arc::new(MemoryExceptionStore::new()),
                hub.clone(),
                hub.clone(),
            )),
            executions.clone(),
            policies.clone(),
            hub.clone(),
        ));
        let engine = SimulationEngine::new(
            executor,
            policies.clone(),
            hub,
            Arc::new(MemorySimulationStore::new()),
        )
        .with_batch_size(2);
        Harness {
            engine,
            policies,
            executions,
            trackers,
        }
    }

    fn late_policy() -> Policy {
        Policy {
            id: "pol_late".to_string(),
            company_id: "co_1".to_string(),
            name: "Late arrival deduction".to_string(),
            conditions: vec![Condition {
                field: "lateDays".to_string(),
                operator: ComparisonOp::GreaterThan,
                value: Some(FieldValue::Number(3.0)),
                optional: false,
            }],
            condition_logic: ConditionLogic::All,
            actions: vec![Action {
                action_type: ActionType::Deduct,
                value_type: ValueType::Fixed,
                value: Some(100.0),
                formula: None,
                base: SalaryBase::Basic,
                description: None,
            }],
            tiered_config: None,
            execution_order: 0,
            priority: 0,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_simulation_projects_affected_employees() {
        let h = harness();
        h.policies.upsert(late_policy()).await.unwrap();

        let run = h
            .engine
            .simulate("pol_late", Period::new(2025, 3).unwrap(), "admin_1")
            .await
            .unwrap();
        assert_eq!(run.summary.employees_evaluated, 3);
        assert_eq!(run.summary.employees_affected, 2);
        assert_eq!(run.summary.total_deductions, to_money(200.0));
        assert_eq!(run.summary.net_impact, to_money(-200.0));
        assert!(run.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_simulation_writes_nothing_but_the_snapshot() {
        let h = harness();
        h.policies.upsert(late_policy()).await.unwrap();

        h.engine
            .simulate("pol_late", Period::new(2025, 3).unwrap(), "admin_1")
            .await
            .unwrap();

        for id in ["emp_1", "emp_2", "emp_3"] {
            assert!(h.executions.for_employee(id).await.unwrap().is_empty());
        }
        assert!(h.trackers.with_positive_count().await.unwrap().is_empty());
        let stats = h.policies.stats("pol_late").await.unwrap();
        assert!(stats.is_none_or(|s| s.execution_count == 0));
    }

    #[tokio::test]
    async fn test_two_runs_are_identical() {
        let h = harness();
        h.policies.upsert(late_policy()).await.unwrap();
        let period = Period::new(2025, 3).unwrap();

        let first = h.engine.simulate("pol_late", period, "admin_1").await.unwrap();
        let second = h.engine.simulate("pol_late", period, "admin_1").await.unwrap();
        assert_eq!(first.results, second.results);
        assert_eq!(first.summary.net_impact, second.summary.net_impact);
    }

    #[tokio::test]
    async fn test_unknown_policy_fails() {
        let h = harness();
        assert!(matches!(
            h.engine
                .simulate("pol_missing", Period::new(2025, 3).unwrap(), "admin_1")
                .await,
            Err(EngineError::PolicyNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_zero_budget_yields_partial_run_with_warning() {
        let h = harness();
        h.policies.upsert(late_policy()).await.unwrap();
        let engine = h.engine.with_budget_ms(0);

        // the budget check runs before the first batch, so a zero budget
        // always produces an empty partial run
        let run = engine
            .simulate("pol_late", Period::new(2025, 3).unwrap(), "admin_1")
            .await
            .unwrap();
        assert_eq!(run.summary.employees_evaluated, 0);
        assert_eq!(run.warnings.len(), 1);
        assert!(run.warnings[0].contains("partial"));
    }

    #[tokio::test]
    async fn test_history_returns_persisted_runs() {
        let h = harness();
        h.policies.upsert(late_policy()).await.unwrap();
        let period = Period::new(2025, 3).unwrap();
        let run = h.engine.simulate("pol_late", period, "admin_1").await.unwrap();

        let fetched = h.engine.get(&run.id).await.unwrap();
        assert_eq!(fetched.id, run.id);
        assert_eq!(h.engine.history("pol_late").await.unwrap().len(), 1);
    }
}
