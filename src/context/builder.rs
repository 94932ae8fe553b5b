//! Context assembly for one (employee, period) evaluation.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use tracing::warn;

use crate::context::sources::{
    AdvanceSource, AttendanceSource, ContractSource, CustodySource, DisciplinarySource,
    EmployeeDirectory, LeaveSource, OrgCatalog,
};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    DisciplinaryContext, EmployeeContext, EnrichedContext, OrgUnitContext, Period, PeriodContext,
    Tenure,
};

/// The collaborator sources the builder reads from.
#[derive(Clone)]
pub struct ContextSources {
    /// Employee directory.
    pub directory: Arc<dyn EmployeeDirectory>,
    /// Contract facts.
    pub contracts: Arc<dyn ContractSource>,
    /// Attendance aggregates.
    pub attendance: Arc<dyn AttendanceSource>,
    /// Leave facts.
    pub leaves: Arc<dyn LeaveSource>,
    /// Custody facts.
    pub custody: Arc<dyn CustodySource>,
    /// Advance facts.
    pub advances: Arc<dyn AdvanceSource>,
    /// Disciplinary history.
    pub disciplinary: Arc<dyn DisciplinarySource>,
    /// Organizational lookups.
    pub org: Arc<dyn OrgCatalog>,
}

/// Assembles an [`EnrichedContext`] from collaborator sources.
///
/// The builder is total once the employee is confirmed to exist: every
/// sub-fetch failure degrades to that group's zero/false defaults with a
/// warning, so a flaky collaborator can never abort an evaluation run.
pub struct ContextBuilder {
    sources: ContextSources,
}

impl ContextBuilder {
    /// Creates a builder over the given sources.
    pub fn new(sources: ContextSources) -> Self {
        Self { sources }
    }

    /// Builds the evaluation context for one employee and period.
    ///
    /// Fails with [`EngineError::EmployeeNotFound`] only when the
    /// directory has no such employee.
    pub async fn enrich(&self, employee_id: &str, period: Period) -> EngineResult<EnrichedContext> {
        let employee = self
            .sources
            .directory
            .find(employee_id)
            .await?
            .ok_or_else(|| EngineError::EmployeeNotFound {
                employee_id: employee_id.to_string(),
            })?;

        let period_end = period.end_date();
        let mut context = EnrichedContext {
            employee: EmployeeContext {
                id: employee.id.clone(),
                name: employee.name.clone(),
                job_title: employee.job_title.clone(),
                hire_date: employee.hire_date,
                is_active: employee.is_active,
                tenure: employee
                    .hire_date
                    .map(|hired| tenure_between(hired, period_end))
                    .unwrap_or_default(),
            },
            period: PeriodContext::from(period),
            ..Default::default()
        };

        context.contract = self
            .degrade(
                employee_id,
                "contract",
                self.sources.contracts.contract(employee_id).await,
            )
            .flatten()
            .unwrap_or_default();

        context.attendance.current_period = self
            .degrade(
                employee_id,
                "attendance.currentPeriod",
                self.sources
                    .attendance
                    .period_window(employee_id, period)
                    .await,
            )
            .unwrap_or_default();
        context.attendance.last3_months = self
            .degrade(
                employee_id,
                "attendance.last3Months",
                self.sources
                    .attendance
                    .trailing_window(employee_id, period, 3)
                    .await,
            )
            .unwrap_or_default();
        context.attendance.last6_months = self
            .degrade(
                employee_id,
                "attendance.last6Months",
                self.sources
                    .attendance
                    .trailing_window(employee_id, period, 6)
                    .await,
            )
            .unwrap_or_default();
        context.attendance.patterns = self
            .degrade(
                employee_id,
                "attendance.patterns",
                self.sources.attendance.patterns(employee_id, period).await,
            )
            .unwrap_or_default();

        context.leaves = self
            .degrade(
                employee_id,
                "leaves",
                self.sources.leaves.leaves(employee_id, period).await,
            )
            .unwrap_or_default();
        context.custody = self
            .degrade(
                employee_id,
                "custody",
                self.sources.custody.custody(employee_id).await,
            )
            .unwrap_or_default();
        context.advances = self
            .degrade(
                employee_id,
                "advances",
                self.sources.advances.advances(employee_id, period).await,
            )
            .unwrap_or_default();

        context.disciplinary = self
            .degrade(
                employee_id,
                "disciplinary",
                self.sources.disciplinary.disciplinary(employee_id).await,
            )
            .map(|record| DisciplinaryContext {
                total_cases: record.total_cases as f64,
                active_cases: record.active_cases as f64,
                warnings_last12_months: record.warnings_last_12_months as f64,
                days_since_last_incident: record
                    .last_incident_date
                    .map(|date| period_end.signed_duration_since(date).num_days().max(0) as f64)
                    .unwrap_or(0.0),
            })
            .unwrap_or_default();

        context.department = match &employee.department_id {
            Some(id) => self.org_unit(
                employee_id,
                "department",
                id,
                self.sources.org.department(&employee.company_id, id).await,
            ),
            None => OrgUnitContext::default(),
        };
        context.branch = match &employee.branch_id {
            Some(id) => self.org_unit(
                employee_id,
                "branch",
                id,
                self.sources.org.branch(&employee.company_id, id).await,
            ),
            None => OrgUnitContext::default(),
        };
        context.company = self.org_unit(
            employee_id,
            "company",
            &employee.company_id,
            self.sources.org.company(&employee.company_id).await,
        );

        Ok(context)
    }

    /// Unwraps a sub-fetch result, degrading failure to `None` with a
    /// warning.
    fn degrade<T>(&self, employee_id: &str, group: &str, result: EngineResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(
                    employee_id,
                    group,
                    %error,
                    "context sub-fetch failed, using defaults"
                );
                None
            }
        }
    }

    fn org_unit(
        &self,
        employee_id: &str,
        group: &str,
        id: &str,
        result: EngineResult<Option<crate::context::sources::OrgUnitRecord>>,
    ) -> OrgUnitContext {
        match self.degrade(employee_id, group, result).flatten() {
            Some(unit) => OrgUnitContext {
                id: Some(unit.id),
                name: Some(unit.name),
            },
            None => OrgUnitContext {
                id: Some(id.to_string()),
                name: None,
            },
        }
    }
}

/// Whole years, months, and days between a hire date and a reference
/// date. Dates before the hire date yield zero tenure.
pub fn tenure_between(hired: NaiveDate, until: NaiveDate) -> Tenure {
    if until <= hired {
        return Tenure::default();
    }
    let mut years = until.year() - hired.year();
    let mut months = until.month() as i32 - hired.month() as i32;
    let mut days = until.day() as i32 - hired.day() as i32;

    if days < 0 {
        let previous_month = if until.month() == 1 {
            NaiveDate::from_ymd_opt(until.year() - 1, 12, 1)
        } else {
            NaiveDate::from_ymd_opt(until.year(), until.month() - 1, 1)
        };
        let days_in_previous = previous_month
            .and_then(|d| {
                let next = if d.month() == 12 {
                    NaiveDate::from_ymd_opt(d.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(d.year(), d.month() + 1, 1)
                };
                next.map(|n| n.signed_duration_since(d).num_days())
            })
            .unwrap_or(30);
        days += days_in_previous as i32;
        months -= 1;
    }
    if months < 0 {
        months += 12;
        years -= 1;
    }

    Tenure {
        years: years.max(0) as u32,
        months: months.max(0) as u32,
        days: days.max(0) as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_tenure_whole_years() {
        let tenure = tenure_between(date(2020, 3, 15), date(2025, 3, 15));
        assert_eq!(tenure, Tenure { years: 5, months: 0, days: 0 });
    }

    #[test]
    fn test_tenure_with_month_and_day_remainder() {
        let tenure = tenure_between(date(2022, 1, 10), date(2025, 3, 25));
        assert_eq!(tenure, Tenure { years: 3, months: 2, days: 15 });
    }

    #[test]
    fn test_tenure_borrows_days_from_previous_month() {
        // 2024-01-25 to 2024-03-05: 1 month + 9 days (Feb 2024 has 29)
        let tenure = tenure_between(date(2024, 1, 25), date(2024, 3, 5));
        assert_eq!(tenure, Tenure { years: 0, months: 1, days: 9 });
    }

    #[test]
    fn test_tenure_before_hire_is_zero() {
        let tenure = tenure_between(date(2025, 6, 1), date(2025, 1, 1));
        assert_eq!(tenure, Tenure::default());
    }
}
