//! Policy exception management and exclusion checks.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::context::{EmployeeDirectory, EmployeeRecord, OrgCatalog};
use crate::error::{EngineError, EngineResult};
use crate::models::{ExceptionTarget, ExclusionCheck, PolicyException};
use crate::store::ExceptionStore;

/// Summary counts over a policy's exceptions.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionStats {
    /// All exception rows.
    pub total: u64,
    /// Rows currently active.
    pub active: u64,
    /// Rows targeting single employees.
    pub employee_targets: u64,
    /// Rows targeting departments.
    pub department_targets: u64,
    /// Rows targeting branches.
    pub branch_targets: u64,
    /// Rows targeting job titles.
    pub job_title_targets: u64,
}

/// Creates exceptions and answers exclusion queries.
pub struct ExceptionResolver {
    store: Arc<dyn ExceptionStore>,
    org: Arc<dyn OrgCatalog>,
    directory: Arc<dyn EmployeeDirectory>,
}

impl ExceptionResolver {
    /// Creates a resolver over the given store and lookups.
    pub fn new(
        store: Arc<dyn ExceptionStore>,
        org: Arc<dyn OrgCatalog>,
        directory: Arc<dyn EmployeeDirectory>,
    ) -> Self {
        Self {
            store,
            org,
            directory,
        }
    }

    /// Creates an exception after validating the target exists within
    /// the company and no duplicate row exists for the same
    /// (policy, target type, target id).
    pub async fn create(
        &self,
        company_id: &str,
        exception: PolicyException,
    ) -> EngineResult<PolicyException> {
        self.validate_target(company_id, exception.target_type, &exception.target_id)
            .await?;

        if self
            .store
            .find(
                &exception.policy_id,
                exception.target_type,
                &exception.target_id,
            )
            .await?
            .is_some()
        {
            return Err(EngineError::DuplicateException {
                policy_id: exception.policy_id.clone(),
                target_type: exception.target_type.label().to_string(),
                target_id: exception.target_id.clone(),
            });
        }

        info!(
            policy_id = %exception.policy_id,
            target_type = exception.target_type.label(),
            target_id = %exception.target_id,
            "policy exception created"
        );
        self.store.insert(exception.clone()).await?;
        Ok(exception)
    }

    async fn validate_target(
        &self,
        company_id: &str,
        target_type: ExceptionTarget,
        target_id: &str,
    ) -> EngineResult<()> {
        let exists = match target_type {
            ExceptionTarget::Employee => self
                .directory
                .find(target_id)
                .await?
                .is_some_and(|e| e.company_id == company_id),
            ExceptionTarget::Department => {
                self.org.department(company_id, target_id).await?.is_some()
            }
            ExceptionTarget::Branch => self.org.branch(company_id, target_id).await?.is_some(),
            ExceptionTarget::JobTitle => self.org.job_title_exists(company_id, target_id).await?,
        };
        if exists {
            Ok(())
        } else {
            Err(EngineError::TargetNotFound {
                target_type: target_type.label().to_string(),
                target_id: target_id.to_string(),
            })
        }
    }

    /// Whether the employee is excluded from the policy right now.
    ///
    /// Active, in-window exceptions are matched in the order
    /// EMPLOYEE, DEPARTMENT, BRANCH, JOB_TITLE; the first match wins.
    pub async fn is_employee_excluded(
        &self,
        policy_id: &str,
        employee: &EmployeeRecord,
    ) -> EngineResult<ExclusionCheck> {
        let now = Utc::now();
        let exceptions: Vec<PolicyException> = self
            .store
            .for_policy(policy_id)
            .await?
            .into_iter()
            .filter(|e| e.covers(now))
            .collect();

        for target_type in ExceptionTarget::match_order() {
            let employee_value = match target_type {
                ExceptionTarget::Employee => Some(employee.id.as_str()),
                ExceptionTarget::Department => employee.department_id.as_deref(),
                ExceptionTarget::Branch => employee.branch_id.as_deref(),
                ExceptionTarget::JobTitle => employee.job_title.as_deref(),
            };
            let Some(value) = employee_value else {
                continue;
            };
            if let Some(matched) = exceptions
                .iter()
                .find(|e| e.target_type == target_type && e.target_id == value)
            {
                let reason = matched.reason.clone().unwrap_or_else(|| {
                    format!("excluded by {} exception", target_type.label())
                });
                return Ok(ExclusionCheck::excluded(reason));
            }
        }
        Ok(ExclusionCheck::not_excluded())
    }

    /// All exceptions of a policy.
    pub async fn list(&self, policy_id: &str) -> EngineResult<Vec<PolicyException>> {
        self.store.for_policy(policy_id).await
    }

    /// Summary counts over a policy's exceptions.
    pub async fn stats(&self, policy_id: &str) -> EngineResult<ExceptionStats> {
        let exceptions = self.store.for_policy(policy_id).await?;
        let mut stats = ExceptionStats {
            total: exceptions.len() as u64,
            ..Default::default()
        };
        for exception in &exceptions {
            if exception.is_active {
                stats.active += 1;
            }
            match exception.target_type {
                ExceptionTarget::Employee => stats.employee_targets += 1,
                ExceptionTarget::Department => stats.department_targets += 1,
                ExceptionTarget::Branch => stats.branch_targets += 1,
                ExceptionTarget::JobTitle => stats.job_title_targets += 1,
            }
        }
        Ok(stats)
    }

    /// Deactivates an exception by id.
    pub async fn deactivate(&self, exception_id: &str) -> EngineResult<()> {
        if self.store.deactivate(exception_id).await? {
            Ok(())
        } else {
            Err(EngineError::NotFound {
                entity: "Exception".to_string(),
                id: exception_id.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::OrgUnitRecord;
    use crate::store::fixtures::FixtureHub;
    use crate::store::MemoryExceptionStore;

    fn employee(id: &str, department: Option<&str>, title: Option<&str>) -> EmployeeRecord {
        EmployeeRecord {
            id: id.to_string(),
            company_id: "co_1".to_string(),
            name: id.to_string(),
            job_title: title.map(String::from),
            department_id: department.map(String::from),
            branch_id: None,
            hire_date: None,
            is_active: true,
        }
    }

    fn resolver() -> ExceptionResolver {
        let hub = Arc::new(
            FixtureHub::new()
                .with_employee(employee("emp_1", Some("dep_1"), Some("Clerk")))
                .with_employee(employee("emp_2", Some("dep_2"), Some("Manager")))
                .with_department(OrgUnitRecord {
                    id: "dep_1".to_string(),
                    name: "Sales".to_string(),
                }),
        );
        ExceptionResolver::new(Arc::new(MemoryExceptionStore::new()), hub.clone(), hub)
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_key() {
        let resolver = resolver();
        let first = PolicyException::new("pol_1", ExceptionTarget::Employee, "emp_1");
        resolver.create("co_1", first).await.unwrap();

        let second = PolicyException::new("pol_1", ExceptionTarget::Employee, "emp_1");
        assert!(matches!(
            resolver.create("co_1", second).await,
            Err(EngineError::DuplicateException { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_target() {
        let resolver = resolver();
        let exception = PolicyException::new("pol_1", ExceptionTarget::Department, "dep_missing");
        assert!(matches!(
            resolver.create("co_1", exception).await,
            Err(EngineError::TargetNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_employee_match_wins_over_department() {
        let resolver = resolver();
        let mut department = PolicyException::new("pol_1", ExceptionTarget::Department, "dep_1");
        department.reason = Some("department excluded".to_string());
        resolver.create("co_1", department).await.unwrap();
        let mut direct = PolicyException::new("pol_1", ExceptionTarget::Employee, "emp_1");
        direct.reason = Some("direct exclusion".to_string());
        resolver.create("co_1", direct).await.unwrap();

        let check = resolver
            .is_employee_excluded("pol_1", &employee("emp_1", Some("dep_1"), Some("Clerk")))
            .await
            .unwrap();
        assert!(check.is_excluded);
        assert_eq!(check.reason.as_deref(), Some("direct exclusion"));
    }

    #[tokio::test]
    async fn test_job_title_exclusion() {
        let resolver = resolver();
        let exception = PolicyException::new("pol_1", ExceptionTarget::JobTitle, "Manager");
        resolver.create("co_1", exception).await.unwrap();

        let check = resolver
            .is_employee_excluded("pol_1", &employee("emp_2", Some("dep_2"), Some("Manager")))
            .await
            .unwrap();
        assert!(check.is_excluded);

        let other = resolver
            .is_employee_excluded("pol_1", &employee("emp_1", Some("dep_1"), Some("Clerk")))
            .await
            .unwrap();
        assert!(!other.is_excluded);
    }

    #[tokio::test]
    async fn test_expired_window_does_not_exclude() {
        let resolver = resolver();
        let mut exception = PolicyException::new("pol_1", ExceptionTarget::Employee, "emp_1");
        exception.effective_to = Some(Utc::now() - chrono::Duration::days(1));
        resolver.create("co_1", exception).await.unwrap();

        let check = resolver
            .is_employee_excluded("pol_1", &employee("emp_1", Some("dep_1"), Some("Clerk")))
            .await
            .unwrap();
        assert!(!check.is_excluded);
    }

    #[tokio::test]
    async fn test_stats_counts_by_target_type() {
        let resolver = resolver();
        resolver
            .create(
                "co_1",
                PolicyException::new("pol_1", ExceptionTarget::Employee, "emp_1"),
            )
            .await
            .unwrap();
        resolver
            .create(
                "co_1",
                PolicyException::new("pol_1", ExceptionTarget::Department, "dep_1"),
            )
            .await
            .unwrap();

        let stats = resolver.stats("pol_1").await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.active, 2);
        assert_eq!(stats.employee_targets, 1);
        assert_eq!(stats.department_targets, 1);
    }
}
