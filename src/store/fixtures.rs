//! Static collaborator fixtures.
//!
//! One hub implements every context source trait over plain maps, so a
//! test (or the demo API wiring) can stand up the whole engine without a
//! platform behind it. Data is set once at construction; lookups for
//! missing employees return empty defaults, matching how a degraded
//! collaborator behaves.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::{
    AdvanceSource, AggregateQuery, AggregationSource, AttendanceSource, ContextSources,
    ContractSource, CustodySource, DisciplinaryRecord, DisciplinarySource, EmployeeDirectory,
    EmployeeRecord, LeaveSource, OrgCatalog, OrgUnitRecord,
};
use crate::error::EngineResult;
use crate::models::{
    AdvanceContext, AttendancePatterns, AttendanceWindow, ContractContext, CustodyContext,
    LeaveContext, Period,
};

/// Static data backing every collaborator source.
#[derive(Default)]
pub struct FixtureHub {
    employees: Vec<EmployeeRecord>,
    contracts: HashMap<String, ContractContext>,
    attendance: HashMap<(String, Period), AttendanceWindow>,
    patterns: HashMap<String, AttendancePatterns>,
    leaves: HashMap<String, LeaveContext>,
    custody: HashMap<String, CustodyContext>,
    advances: HashMap<String, AdvanceContext>,
    disciplinary: HashMap<String, DisciplinaryRecord>,
    departments: HashMap<String, OrgUnitRecord>,
    branches: HashMap<String, OrgUnitRecord>,
    companies: HashMap<String, OrgUnitRecord>,
    aggregates: HashMap<String, f64>,
}

impl FixtureHub {
    /// An empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an employee to the directory.
    pub fn with_employee(mut self, employee: EmployeeRecord) -> Self {
        self.employees.push(employee);
        self
    }

    /// Sets an employee's contract facts.
    pub fn with_contract(mut self, employee_id: &str, contract: ContractContext) -> Self {
        self.contracts.insert(employee_id.to_string(), contract);
        self
    }

    /// Sets an employee's attendance window for one period.
    pub fn with_attendance(
        mut self,
        employee_id: &str,
        period: Period,
        window: AttendanceWindow,
    ) -> Self {
        self.attendance
            .insert((employee_id.to_string(), period), window);
        self
    }

    /// Sets an employee's streak counters.
    pub fn with_patterns(mut self, employee_id: &str, patterns: AttendancePatterns) -> Self {
        self.patterns.insert(employee_id.to_string(), patterns);
        self
    }

    /// Sets an employee's leave facts.
    pub fn with_leaves(mut self, employee_id: &str, leaves: LeaveContext) -> Self {
        self.leaves.insert(employee_id.to_string(), leaves);
        self
    }

    /// Sets an employee's disciplinary facts.
    pub fn with_disciplinary(mut self, employee_id: &str, record: DisciplinaryRecord) -> Self {
        self.disciplinary.insert(employee_id.to_string(), record);
        self
    }

    /// Registers a department.
    pub fn with_department(mut self, unit: OrgUnitRecord) -> Self {
        self.departments.insert(unit.id.clone(), unit);
        self
    }

    /// Registers a branch.
    pub fn with_branch(mut self, unit: OrgUnitRecord) -> Self {
        self.branches.insert(unit.id.clone(), unit);
        self
    }

    /// Registers a company.
    pub fn with_company(mut self, unit: OrgUnitRecord) -> Self {
        self.companies.insert(unit.id.clone(), unit);
        self
    }

    /// Sets the result of a dynamic aggregate query for an employee.
    /// The key is the employee id; every query shape returns the value.
    pub fn with_aggregate(mut self, employee_id: &str, value: f64) -> Self {
        self.aggregates.insert(employee_id.to_string(), value);
        self
    }

    /// Bundles this hub into [`ContextSources`] for the builder.
    pub fn into_sources(self) -> ContextSources {
        let hub = Arc::new(self);
        ContextSources {
            directory: hub.clone(),
            contracts: hub.clone(),
            attendance: hub.clone(),
            leaves: hub.clone(),
            custody: hub.clone(),
            advances: hub.clone(),
            disciplinary: hub.clone(),
            org: hub,
        }
    }
}

#[async_trait]
impl EmployeeDirectory for FixtureHub {
    async fn find(&self, employee_id: &str) -> EngineResult<Option<EmployeeRecord>> {
        Ok(self.employees.iter().find(|e| e.id == employee_id).cloned())
    }

    async fn active_employees(&self, company_id: &str) -> EngineResult<Vec<EmployeeRecord>> {
        Ok(self
            .employees
            .iter()
            .filter(|e| e.company_id == company_id && e.is_active)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ContractSource for FixtureHub {
    async fn contract(&self, employee_id: &str) -> EngineResult<Option<ContractContext>> {
        Ok(self.contracts.get(employee_id).cloned())
    }
}

#[async_trait]
impl AttendanceSource for FixtureHub {
    async fn period_window(
        &self,
        employee_id: &str,
        period: Period,
    ) -> EngineResult<AttendanceWindow> {
        Ok(self
            .attendance
            .get(&(employee_id.to_string(), period))
            .copied()
            .unwrap_or_default())
    }

    async fn trailing_window(
        &self,
        employee_id: &str,
        period: Period,
        months: u32,
    ) -> EngineResult<AttendanceWindow> {
        // walk back month by month, summing whatever fixtures exist
        let mut total = AttendanceWindow::default();
        let mut current = period;
        for _ in 0..months {
            if let Some(window) = self.attendance.get(&(employee_id.to_string(), current)) {
                total.present_days += window.present_days;
                total.absent_days += window.absent_days;
                total.late_days += window.late_days;
                total.late_minutes += window.late_minutes;
                total.early_leave_days += window.early_leave_days;
                total.early_leave_minutes += window.early_leave_minutes;
                total.overtime_hours += window.overtime_hours;
                total.worked_hours += window.worked_hours;
            }
            let (year, month) = if current.month == 1 {
                (current.year - 1, 12)
            } else {
                (current.year, current.month - 1)
            };
            current = Period { year, month };
        }
        Ok(total)
    }

    async fn patterns(
        &self,
        employee_id: &str,
        _period: Period,
    ) -> EngineResult<AttendancePatterns> {
        Ok(self.patterns.get(employee_id).copied().unwrap_or_default())
    }
}

#[async_trait]
impl LeaveSource for FixtureHub {
    async fn leaves(&self, employee_id: &str, _period: Period) -> EngineResult<LeaveContext> {
        Ok(self.leaves.get(employee_id).copied().unwrap_or_default())
    }
}

#[async_trait]
impl CustodySource for FixtureHub {
    async fn custody(&self, employee_id: &str) -> EngineResult<CustodyContext> {
        Ok(self.custody.get(employee_id).copied().unwrap_or_default())
    }
}

#[async_trait]
impl AdvanceSource for FixtureHub {
    async fn advances(&self, employee_id: &str, _period: Period) -> EngineResult<AdvanceContext> {
        Ok(self.advances.get(employee_id).copied().unwrap_or_default())
    }
}

#[async_trait]
impl DisciplinarySource for FixtureHub {
    async fn disciplinary(&self, employee_id: &str) -> EngineResult<DisciplinaryRecord> {
        Ok(self
            .disciplinary
            .get(employee_id)
            .copied()
            .unwrap_or_default())
    }
}

#[async_trait]
impl AggregationSource for FixtureHub {
    async fn run(
        &self,
        employee_id: &str,
        _period: Period,
        _query: &AggregateQuery,
    ) -> EngineResult<f64> {
        Ok(self.aggregates.get(employee_id).copied().unwrap_or(0.0))
    }
}

#[async_trait]
impl OrgCatalog for FixtureHub {
    async fn department(
        &self,
        _company_id: &str,
        department_id: &str,
    ) -> EngineResult<Option<OrgUnitRecord>> {
        Ok(self.departments.get(department_id).cloned())
    }

    async fn branch(
        &self,
        _company_id: &str,
        branch_id: &str,
    ) -> EngineResult<Option<OrgUnitRecord>> {
        Ok(self.branches.get(branch_id).cloned())
    }

    async fn company(&self, company_id: &str) -> EngineResult<Option<OrgUnitRecord>> {
        Ok(self.companies.get(company_id).cloned())
    }

    async fn job_title_exists(&self, company_id: &str, job_title: &str) -> EngineResult<bool> {
        Ok(self.employees.iter().any(|e| {
            e.company_id == company_id && e.job_title.as_deref() == Some(job_title)
        }))
    }
}
