//! The per-employee, per-period evaluation context.
//!
//! An [`EnrichedContext`] is an ephemeral, read-only snapshot assembled
//! fresh for every (employee, period) evaluation. Every numeric leaf
//! defaults to zero and every flag to false, so condition evaluation can
//! rely on fields being present rather than absent.
//!
//! Serialization uses camelCase field names because condition field paths
//! (`attendance.currentPeriod.lateDays`) are written against the JSON form
//! of this structure.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::Period;

/// Employee identity and tenure facts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeContext {
    /// Employee identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Job title, if recorded.
    #[serde(default)]
    pub job_title: Option<String>,
    /// Hire date, if recorded.
    #[serde(default)]
    pub hire_date: Option<NaiveDate>,
    /// Whether the employee is currently active.
    #[serde(default)]
    pub is_active: bool,
    /// Tenure broken into whole years/months/days.
    #[serde(default)]
    pub tenure: Tenure,
}

/// Whole years/months/days since the hire date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenure {
    /// Full years of service.
    pub years: u32,
    /// Months beyond the last full year.
    pub months: u32,
    /// Days beyond the last full month.
    pub days: u32,
}

/// Contract and salary facts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractContext {
    /// Basic salary component.
    #[serde(default)]
    pub basic_salary: f64,
    /// Total salary including allowances.
    #[serde(default)]
    pub total_salary: f64,
    /// Sum of allowance components.
    #[serde(default)]
    pub allowances: f64,
    /// Whether the employee is still in probation.
    #[serde(default)]
    pub on_probation: bool,
    /// Contracted working hours per day.
    #[serde(default)]
    pub hours_per_day: f64,
}

/// Attendance aggregates for one window (a period or a rolling span).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceWindow {
    /// Days with a completed attendance record.
    #[serde(default)]
    pub present_days: f64,
    /// Days absent without an approved leave.
    #[serde(default)]
    pub absent_days: f64,
    /// Days with a late check-in.
    #[serde(default)]
    pub late_days: f64,
    /// Total minutes late across the window.
    #[serde(default)]
    pub late_minutes: f64,
    /// Days with an early check-out.
    #[serde(default)]
    pub early_leave_days: f64,
    /// Total minutes left early across the window.
    #[serde(default)]
    pub early_leave_minutes: f64,
    /// Overtime hours worked.
    #[serde(default)]
    pub overtime_hours: f64,
    /// Total hours actually worked.
    #[serde(default)]
    pub worked_hours: f64,
}

/// Streak counters computed over daily attendance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendancePatterns {
    /// Longest run of consecutive late days.
    #[serde(default)]
    pub consecutive_late_days: f64,
    /// Longest run of consecutive absent days.
    #[serde(default)]
    pub consecutive_absent_days: f64,
    /// Longest run of consecutive present days.
    #[serde(default)]
    pub consecutive_present_days: f64,
    /// Longest run of consecutive early-leave days.
    #[serde(default)]
    pub consecutive_early_leave_days: f64,
    /// Longest run of consecutive sick-leave days.
    #[serde(default)]
    pub consecutive_sick_days: f64,
    /// Weekend days worked.
    #[serde(default)]
    pub weekend_work_days: f64,
}

/// Attendance facts: the current period plus rolling windows and patterns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceContext {
    /// Aggregates for the period under evaluation.
    #[serde(default)]
    pub current_period: AttendanceWindow,
    /// Aggregates over the trailing 3 months.
    #[serde(default)]
    pub last3_months: AttendanceWindow,
    /// Aggregates over the trailing 6 months.
    #[serde(default)]
    pub last6_months: AttendanceWindow,
    /// Streak counters.
    #[serde(default)]
    pub patterns: AttendancePatterns,
}

/// Leave balances and usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveContext {
    /// Annual leave days remaining.
    #[serde(default)]
    pub annual_balance: f64,
    /// Sick leave days taken this year.
    #[serde(default)]
    pub sick_days_taken: f64,
    /// Unpaid leave days taken this period.
    #[serde(default)]
    pub unpaid_days: f64,
    /// Leave days taken in the period under evaluation.
    #[serde(default)]
    pub days_this_period: f64,
}

/// Company property held by the employee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustodyContext {
    /// Number of custody items held.
    #[serde(default)]
    pub item_count: f64,
    /// Total declared value of held items.
    #[serde(default)]
    pub total_value: f64,
    /// Items overdue for return.
    #[serde(default)]
    pub overdue_items: f64,
}

/// Outstanding salary advances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceContext {
    /// Number of open advances.
    #[serde(default)]
    pub active_count: f64,
    /// Total outstanding balance.
    #[serde(default)]
    pub outstanding_balance: f64,
    /// Installment due in the current period.
    #[serde(default)]
    pub monthly_installment: f64,
}

/// Disciplinary history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisciplinaryContext {
    /// All recorded cases.
    #[serde(default)]
    pub total_cases: f64,
    /// Cases still open.
    #[serde(default)]
    pub active_cases: f64,
    /// Warnings issued in the trailing 12 months.
    #[serde(default)]
    pub warnings_last12_months: f64,
    /// Days since the most recent incident; 0 when there is none.
    #[serde(default)]
    pub days_since_last_incident: f64,
}

/// Organizational unit facts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgUnitContext {
    /// Unit identifier.
    #[serde(default)]
    pub id: Option<String>,
    /// Unit display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Period facts exposed to conditions and formulas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodContext {
    /// Calendar month, 1-12.
    pub month: u32,
    /// Calendar year.
    pub year: i32,
    /// Calendar days in the period.
    pub days_in_month: f64,
    /// Approximate working days in the period.
    pub working_days: f64,
}

impl Default for PeriodContext {
    fn default() -> Self {
        Self {
            month: 1,
            year: 1970,
            days_in_month: 31.0,
            working_days: 23.0,
        }
    }
}

impl From<Period> for PeriodContext {
    fn from(period: Period) -> Self {
        Self {
            month: period.month,
            year: period.year,
            days_in_month: period.days_in_month() as f64,
            working_days: period.working_days() as f64,
        }
    }
}

/// The complete evaluation snapshot for one (employee, period).
///
/// Built by the context builder and consumed read-only by condition and
/// formula evaluation. Fields that could not be fetched degrade to their
/// zero/false defaults rather than being absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedContext {
    /// Employee identity and tenure.
    pub employee: EmployeeContext,
    /// Contract and salary facts.
    #[serde(default)]
    pub contract: ContractContext,
    /// Attendance aggregates and patterns.
    #[serde(default)]
    pub attendance: AttendanceContext,
    /// Leave balances.
    #[serde(default)]
    pub leaves: LeaveContext,
    /// Custody items held.
    #[serde(default)]
    pub custody: CustodyContext,
    /// Outstanding advances.
    #[serde(default)]
    pub advances: AdvanceContext,
    /// Disciplinary history.
    #[serde(default)]
    pub disciplinary: DisciplinaryContext,
    /// Department of the employee.
    #[serde(default)]
    pub department: OrgUnitContext,
    /// Branch of the employee.
    #[serde(default)]
    pub branch: OrgUnitContext,
    /// Owning company.
    #[serde(default)]
    pub company: OrgUnitContext,
    /// The period under evaluation.
    #[serde(default)]
    pub period: PeriodContext,
}

impl EnrichedContext {
    /// Salary figure for percentage actions on the given base.
    pub fn salary_base(&self, base: crate::models::SalaryBase) -> f64 {
        match base {
            crate::models::SalaryBase::Basic => self.contract.basic_salary,
            crate::models::SalaryBase::Total => self.contract.total_salary,
        }
    }
}
