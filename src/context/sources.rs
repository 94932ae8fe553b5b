//! Collaborator data sources consumed during context assembly.
//!
//! The engine reads employee, contract, attendance, leave, custody,
//! advance, and disciplinary facts from the surrounding platform through
//! these traits. All of them are read-only; the engine never writes to
//! collaborator-owned data.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::context::AggregateQuery;
use crate::error::EngineResult;
use crate::models::{
    AdvanceContext, AttendancePatterns, AttendanceWindow, ContractContext, CustodyContext,
    LeaveContext, Period,
};

/// An employee as known to the platform directory.
#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeRecord {
    /// Employee identifier.
    pub id: String,
    /// Owning company.
    pub company_id: String,
    /// Display name.
    pub name: String,
    /// Job title, if recorded.
    pub job_title: Option<String>,
    /// Department, if assigned.
    pub department_id: Option<String>,
    /// Branch, if assigned.
    pub branch_id: Option<String>,
    /// Hire date, if recorded.
    pub hire_date: Option<NaiveDate>,
    /// Whether the employee is currently active.
    pub is_active: bool,
}

/// Aggregated disciplinary facts for one employee.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DisciplinaryRecord {
    /// All recorded cases.
    pub total_cases: u32,
    /// Cases still open.
    pub active_cases: u32,
    /// Warnings issued in the trailing 12 months.
    pub warnings_last_12_months: u32,
    /// Date of the most recent incident, when any exists.
    pub last_incident_date: Option<NaiveDate>,
}

/// An organizational unit (department, branch, company).
#[derive(Debug, Clone, PartialEq)]
pub struct OrgUnitRecord {
    /// Unit identifier.
    pub id: String,
    /// Unit display name.
    pub name: String,
}

/// The platform's employee directory.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// Looks up one employee; `None` when the id is unknown.
    async fn find(&self, employee_id: &str) -> EngineResult<Option<EmployeeRecord>>;

    /// All active employees of a company.
    async fn active_employees(&self, company_id: &str) -> EngineResult<Vec<EmployeeRecord>>;
}

/// Contract and salary facts.
#[async_trait]
pub trait ContractSource: Send + Sync {
    /// The employee's current contract facts, if any contract exists.
    async fn contract(&self, employee_id: &str) -> EngineResult<Option<ContractContext>>;
}

/// Attendance aggregates.
#[async_trait]
pub trait AttendanceSource: Send + Sync {
    /// Aggregates for one period.
    async fn period_window(
        &self,
        employee_id: &str,
        period: Period,
    ) -> EngineResult<AttendanceWindow>;

    /// Aggregates over the trailing `months` months ending at `period`.
    async fn trailing_window(
        &self,
        employee_id: &str,
        period: Period,
        months: u32,
    ) -> EngineResult<AttendanceWindow>;

    /// Streak counters for one period.
    async fn patterns(
        &self,
        employee_id: &str,
        period: Period,
    ) -> EngineResult<AttendancePatterns>;
}

/// Leave balances and usage.
#[async_trait]
pub trait LeaveSource: Send + Sync {
    /// Leave facts for one period.
    async fn leaves(&self, employee_id: &str, period: Period) -> EngineResult<LeaveContext>;
}

/// Company property held by employees.
#[async_trait]
pub trait CustodySource: Send + Sync {
    /// Custody facts for the employee.
    async fn custody(&self, employee_id: &str) -> EngineResult<CustodyContext>;
}

/// Outstanding salary advances.
#[async_trait]
pub trait AdvanceSource: Send + Sync {
    /// Advance facts for the employee at the given period.
    async fn advances(&self, employee_id: &str, period: Period) -> EngineResult<AdvanceContext>;
}

/// Disciplinary case history.
#[async_trait]
pub trait DisciplinarySource: Send + Sync {
    /// Aggregated disciplinary facts for the employee.
    async fn disciplinary(&self, employee_id: &str) -> EngineResult<DisciplinaryRecord>;
}

/// Executes closed-registry aggregation queries for dynamic field
/// resolution fallback.
#[async_trait]
pub trait AggregationSource: Send + Sync {
    /// Runs one aggregate query for an employee and period.
    async fn run(
        &self,
        employee_id: &str,
        period: Period,
        query: &AggregateQuery,
    ) -> EngineResult<f64>;
}

/// Organizational structure lookups, used for exception target
/// validation and context enrichment.
#[async_trait]
pub trait OrgCatalog: Send + Sync {
    /// A department by id, scoped to the company.
    async fn department(
        &self,
        company_id: &str,
        department_id: &str,
    ) -> EngineResult<Option<OrgUnitRecord>>;

    /// A branch by id, scoped to the company.
    async fn branch(
        &self,
        company_id: &str,
        branch_id: &str,
    ) -> EngineResult<Option<OrgUnitRecord>>;

    /// The company itself.
    async fn company(&self, company_id: &str) -> EngineResult<Option<OrgUnitRecord>>;

    /// Whether any employee of the company holds the given job title.
    async fn job_title_exists(&self, company_id: &str, job_title: &str) -> EngineResult<bool>;
}
