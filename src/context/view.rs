//! Read-only field resolution over an enriched context.
//!
//! Conditions and formulas reference context facts by dotted path
//! (`attendance.currentPeriod.lateDays`) or by a supported shorthand
//! (`lateDays`). A [`ContextView`] snapshots the context as JSON once and
//! resolves paths against it. Fields that no static path covers may map
//! to an [`AggregateQuery`], a closed set of dynamic aggregation lookups
//! executed against a collaborator.

use serde_json::Value;

use crate::error::{EngineError, EngineResult};
use crate::eval::{FieldValue, value};
use crate::models::{EnrichedContext, Period};

/// Shorthand field names and the dotted paths they resolve to.
const SHORTHANDS: &[(&str, &str)] = &[
    ("lateDays", "attendance.currentPeriod.lateDays"),
    ("lateMinutes", "attendance.currentPeriod.lateMinutes"),
    ("absentDays", "attendance.currentPeriod.absentDays"),
    ("presentDays", "attendance.currentPeriod.presentDays"),
    ("earlyLeaveDays", "attendance.currentPeriod.earlyLeaveDays"),
    ("earlyLeaveMinutes", "attendance.currentPeriod.earlyLeaveMinutes"),
    ("overtimeHours", "attendance.currentPeriod.overtimeHours"),
    ("workedHours", "attendance.currentPeriod.workedHours"),
    ("consecutiveLateDays", "attendance.patterns.consecutiveLateDays"),
    ("consecutiveAbsentDays", "attendance.patterns.consecutiveAbsentDays"),
    ("basicSalary", "contract.basicSalary"),
    ("totalSalary", "contract.totalSalary"),
    ("onProbation", "contract.onProbation"),
    ("tenureYears", "employee.tenure.years"),
    ("tenureMonths", "employee.tenure.months"),
    ("jobTitle", "employee.jobTitle"),
    ("annualLeaveBalance", "leaves.annualBalance"),
    ("sickDaysTaken", "leaves.sickDaysTaken"),
    ("unpaidLeaveDays", "leaves.unpaidDays"),
    ("outstandingAdvances", "advances.outstandingBalance"),
    ("activeCases", "disciplinary.activeCases"),
    ("workingDays", "period.workingDays"),
    ("daysInMonth", "period.daysInMonth"),
];

/// A dynamic aggregation lookup for fields with no static context path.
///
/// The set is closed: unknown field shapes fail resolution loudly instead
/// of silently producing a null.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateQuery {
    /// Count days in the period whose worked hours fall in `[min, max]`.
    DaysWorkedBetween {
        /// Lower bound, hours.
        min_hours: f64,
        /// Upper bound, hours.
        max_hours: f64,
    },
    /// Count late arrivals of at least `min_minutes` in the period.
    LateArrivalsAtLeast {
        /// Minimum lateness in minutes.
        min_minutes: f64,
    },
    /// Count early departures of at least `min_minutes` in the period.
    EarlyDeparturesAtLeast {
        /// Minimum minutes left early.
        min_minutes: f64,
    },
}

impl AggregateQuery {
    /// Parses a field path into a query, when it matches a known shape.
    ///
    /// Recognized shapes:
    /// - `attendance.daysWorkedBetween.<min>.<max>`
    /// - fields containing `partialWork` or `shortShift` (1 to 6 hours)
    /// - `attendance.lateArrivals.<minutes>`
    /// - `attendance.earlyDepartures.<minutes>`
    pub fn parse(field: &str) -> Option<AggregateQuery> {
        let parts: Vec<&str> = field.split('.').collect();
        match parts.as_slice() {
            ["attendance", "daysWorkedBetween", min, max] => {
                let min_hours = min.parse::<f64>().ok()?;
                let max_hours = max.parse::<f64>().ok()?;
                Some(AggregateQuery::DaysWorkedBetween {
                    min_hours,
                    max_hours,
                })
            }
            ["attendance", "lateArrivals", minutes] => {
                Some(AggregateQuery::LateArrivalsAtLeast {
                    min_minutes: minutes.parse::<f64>().ok()?,
                })
            }
            ["attendance", "earlyDepartures", minutes] => {
                Some(AggregateQuery::EarlyDeparturesAtLeast {
                    min_minutes: minutes.parse::<f64>().ok()?,
                })
            }
            _ => {
                let lowered = field.to_lowercase();
                if lowered.contains("partialwork") || lowered.contains("shortshift") {
                    Some(AggregateQuery::DaysWorkedBetween {
                        min_hours: 1.0,
                        max_hours: 6.0,
                    })
                } else {
                    None
                }
            }
        }
    }
}

/// A one-time JSON snapshot of an enriched context with dotted-path
/// field resolution.
#[derive(Debug, Clone)]
pub struct ContextView {
    employee_id: String,
    period: Period,
    snapshot: Value,
}

impl ContextView {
    /// Snapshots the context. Fails only if the context cannot be
    /// serialized, which indicates corrupt input data.
    pub fn new(context: &EnrichedContext) -> EngineResult<Self> {
        let period =
            Period::new(context.period.year, context.period.month).unwrap_or(Period {
                year: 1970,
                month: 1,
            });
        let snapshot = serde_json::to_value(context).map_err(|e| EngineError::Store {
            message: format!("context snapshot failed: {}", e),
        })?;
        Ok(Self {
            employee_id: context.employee.id.clone(),
            period,
            snapshot,
        })
    }

    /// The employee this view describes.
    pub fn employee_id(&self) -> &str {
        &self.employee_id
    }

    /// The period this view describes.
    pub fn period(&self) -> Period {
        self.period
    }

    /// Expands a shorthand field name to its full dotted path.
    pub fn expand_shorthand(field: &str) -> &str {
        SHORTHANDS
            .iter()
            .find(|(short, _)| *short == field)
            .map(|(_, full)| *full)
            .unwrap_or(field)
    }

    /// Resolves a field by shorthand or dotted path. Returns `None` when
    /// the path does not land on a scalar or list leaf.
    pub fn get(&self, field: &str) -> Option<FieldValue> {
        let path = Self::expand_shorthand(field);
        let mut current = &self.snapshot;
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        value::from_json(current)
    }

    /// Resolves a field as a number, coercing booleans and numeric text.
    pub fn get_number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(|v| v.as_number())
    }
}
