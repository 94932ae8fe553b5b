//! Retroactive policy application.
//!
//! Re-evaluates a policy over a range of closed historical periods and
//! lands the net difference as adjustments in a target payroll period.
//! The lifecycle is an explicit state machine: nothing touches payroll
//! until a calculated result has been reviewed and approved, and a
//! calculation failure rolls the application back to PENDING instead of
//! wedging it.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::context::EmployeeDirectory;
use crate::engine::executor::PolicyExecutor;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AdjustmentRecord, EmployeeRetroResult, Period, RetroApplication, RetroPeriodLine, RetroStatus,
    to_money,
};
use crate::store::{AdjustmentStore, PolicyStore, RetroStore};

/// Upper bound on the historical range of one application.
pub const DEFAULT_MAX_PERIODS: usize = 12;

/// Drives the retro application lifecycle.
pub struct RetroactiveApplier {
    executor: Arc<PolicyExecutor>,
    policies: Arc<dyn PolicyStore>,
    directory: Arc<dyn EmployeeDirectory>,
    store: Arc<dyn RetroStore>,
    adjustments: Arc<dyn AdjustmentStore>,
    max_periods: usize,
}

impl RetroactiveApplier {
    /// Creates an applier with the default range limit.
    pub fn new(
        executor: Arc<PolicyExecutor>,
        policies: Arc<dyn PolicyStore>,
        directory: Arc<dyn EmployeeDirectory>,
        store: Arc<dyn RetroStore>,
        adjustments: Arc<dyn AdjustmentStore>,
    ) -> Self {
        Self {
            executor,
            policies,
            directory,
            store,
            adjustments,
            max_periods: DEFAULT_MAX_PERIODS,
        }
    }

    /// Overrides the maximum number of historical periods.
    pub fn with_max_periods(mut self, max_periods: usize) -> Self {
        self.max_periods = max_periods.max(1);
        self
    }

    /// Creates a PENDING application after validating the policy and the
    /// period range.
    pub async fn create(
        &self,
        policy_id: &str,
        company_id: &str,
        from_period: Period,
        to_period: Period,
        target_period: Period,
        requested_by: &str,
    ) -> EngineResult<RetroApplication> {
        let policy = self
            .policies
            .policy(policy_id)
            .await?
            .ok_or_else(|| EngineError::PolicyNotFound {
                policy_id: policy_id.to_string(),
            })?;
        if policy.company_id != company_id {
            return Err(EngineError::PolicyNotFound {
                policy_id: policy_id.to_string(),
            });
        }

        let range = Period::range(from_period, to_period);
        if range.is_empty() {
            return Err(EngineError::InvalidPeriod {
                message: format!(
                    "from period {} is after to period {}",
                    from_period, to_period
                ),
            });
        }
        if range.len() > self.max_periods {
            return Err(EngineError::InvalidPeriod {
                message: format!(
                    "range spans {} periods, maximum is {}",
                    range.len(),
                    self.max_periods
                ),
            });
        }
        if target_period <= to_period {
            return Err(EngineError::InvalidPeriod {
                message: format!(
                    "target period {} must be after the historical range ending {}",
                    target_period, to_period
                ),
            });
        }

        let application = RetroApplication::new(
            policy_id,
            company_id,
            from_period,
            to_period,
            target_period,
            requested_by,
        );
        info!(
            application_id = %application.id,
            policy_id,
            from = %from_period,
            to = %to_period,
            "retro application created"
        );
        self.store.save(application.clone()).await?;
        Ok(application)
    }

    /// Calculates the application's per-employee results and moves it to
    /// REVIEWED. A failure rolls the application back to PENDING.
    pub async fn calculate(&self, application_id: &str) -> EngineResult<RetroApplication> {
        let mut application = self.get(application_id).await?;
        application.transition(RetroStatus::Calculating)?;
        self.store.save(application.clone()).await?;

        match self.calculate_results(&application).await {
            Ok((results, warnings)) => {
                application.results = results;
                application.warnings = warnings;
                application.transition(RetroStatus::Reviewed)?;
                self.store.save(application.clone()).await?;
                info!(
                    application_id = %application.id,
                    employee_count = application.results.len(),
                    "retro calculation completed"
                );
                Ok(application)
            }
            Err(error) => {
                warn!(
                    application_id = %application.id,
                    %error,
                    "retro calculation failed, rolling back to pending"
                );
                application.warnings.push(format!("calculation failed: {}", error));
                application.transition(RetroStatus::Pending)?;
                self.store.save(application).await?;
                Err(error)
            }
        }
    }

    async fn calculate_results(
        &self,
        application: &RetroApplication,
    ) -> EngineResult<(Vec<EmployeeRetroResult>, Vec<String>)> {
        let policy = self
            .policies
            .policy(&application.policy_id)
            .await?
            .ok_or_else(|| EngineError::PolicyNotFound {
                policy_id: application.policy_id.clone(),
            })?;
        let employees = self
            .directory
            .active_employees(&application.company_id)
            .await?;
        let range = Period::range(application.from_period, application.to_period);

        let mut results = Vec::new();
        let mut warnings = Vec::new();
        for employee in &employees {
            let mut periods = Vec::new();
            let mut net = Decimal::ZERO;
            for period in &range {
                // employees hired after a period contribute nothing to it
                if let Some(hired) = employee.hire_date {
                    if period.end_date() < hired {
                        continue;
                    }
                }
                let projection = async {
                    let view = self.executor.view_for(&employee.id, *period).await?;
                    self.executor.project_policy(&policy, &view).await
                }
                .await;
                match projection {
                    Ok(projection) => {
                        let amount = to_money(projection.signed_amount());
                        if amount != Decimal::ZERO {
                            net += amount;
                            periods.push(RetroPeriodLine {
                                period: *period,
                                amount,
                                description: Some(projection.description),
                            });
                        }
                    }
                    Err(error) => {
                        warnings.push(format!(
                            "employee {} period {}: {}",
                            employee.id, period, error
                        ));
                    }
                }
            }
            if !periods.is_empty() {
                results.push(EmployeeRetroResult {
                    employee_id: employee.id.clone(),
                    employee_name: employee.name.clone(),
                    net_amount: net,
                    periods,
                });
            }
        }
        Ok((results, warnings))
    }

    /// Moves a REVIEWED application to APPROVED.
    pub async fn approve(&self, application_id: &str) -> EngineResult<RetroApplication> {
        let mut application = self.get(application_id).await?;
        application.transition(RetroStatus::Approved)?;
        self.store.save(application.clone()).await?;
        Ok(application)
    }

    /// Applies an APPROVED application: writes one adjustment per
    /// employee with a non-zero net, targeted at the application's
    /// target period, and moves to APPLIED.
    pub async fn apply(&self, application_id: &str) -> EngineResult<RetroApplication> {
        let mut application = self.get(application_id).await?;
        application.transition(RetroStatus::Applied)?;

        let mut adjustment_count = 0u32;
        for result in &application.results {
            if result.net_amount == Decimal::ZERO {
                continue;
            }
            self.adjustments
                .insert(AdjustmentRecord {
                    id: Uuid::new_v4().to_string(),
                    retro_application_id: application.id.clone(),
                    employee_id: result.employee_id.clone(),
                    amount: result.net_amount,
                    payroll_period: application.target_period,
                    description: format!(
                        "retroactive adjustment for {} to {}",
                        application.from_period, application.to_period
                    ),
                    created_at: Utc::now(),
                })
                .await?;
            adjustment_count += 1;
        }

        application.applied_at = Some(Utc::now());
        self.store.save(application.clone()).await?;
        info!(
            application_id = %application.id,
            adjustment_count,
            target_period = %application.target_period,
            "retro application applied"
        );
        Ok(application)
    }

    /// Cancels an application in any non-terminal state.
    pub async fn cancel(&self, application_id: &str) -> EngineResult<RetroApplication> {
        let mut application = self.get(application_id).await?;
        application.transition(RetroStatus::Cancelled)?;
        self.store.save(application.clone()).await?;
        info!(application_id = %application.id, "retro application cancelled");
        Ok(application)
    }

    /// An application by id.
    pub async fn get(&self, application_id: &str) -> EngineResult<RetroApplication> {
        self.store
            .get(application_id)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                entity: "RetroApplication".to_string(),
                id: application_id.to_string(),
            })
    }

    /// All of a company's applications, newest first.
    pub async fn for_company(&self, company_id: &str) -> EngineResult<Vec<RetroApplication>> {
        self.store.for_company(company_id).await
    }
}
