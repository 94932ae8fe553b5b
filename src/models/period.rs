//! Payroll period value type.
//!
//! A [`Period`] identifies one calendar month of payroll (`YYYY-MM`). It is
//! the unit every context assembly, simulation, and retroactive calculation
//! is keyed by.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// A payroll period: one calendar month of one year.
///
/// # Example
///
/// ```
/// use policy_engine::models::Period;
///
/// let period = Period::parse("2025-03").unwrap();
/// assert_eq!(period.year, 2025);
/// assert_eq!(period.month, 3);
/// assert_eq!(period.to_string(), "2025-03");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    /// Calendar year.
    pub year: i32,
    /// Calendar month, 1-12.
    pub month: u32,
}

impl Period {
    /// Creates a period, validating the month range.
    pub fn new(year: i32, month: u32) -> EngineResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(EngineError::InvalidPeriod {
                message: format!("month must be 1-12, got {}", month),
            });
        }
        if !(1970..=9999).contains(&year) {
            return Err(EngineError::InvalidPeriod {
                message: format!("year out of range: {}", year),
            });
        }
        Ok(Self { year, month })
    }

    /// Parses a `YYYY-MM` period string.
    pub fn parse(value: &str) -> EngineResult<Self> {
        let mut parts = value.splitn(2, '-');
        let year = parts
            .next()
            .and_then(|p| p.parse::<i32>().ok())
            .ok_or_else(|| EngineError::InvalidPeriod {
                message: format!("expected YYYY-MM, got '{}'", value),
            })?;
        let month = parts
            .next()
            .and_then(|p| p.parse::<u32>().ok())
            .ok_or_else(|| EngineError::InvalidPeriod {
                message: format!("expected YYYY-MM, got '{}'", value),
            })?;
        Self::new(year, month)
    }

    /// The first day of the period.
    pub fn start_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
    }

    /// The last day of the period.
    pub fn end_date(&self) -> NaiveDate {
        let next = self.next();
        next.start_date().pred_opt().unwrap_or_else(|| self.start_date())
    }

    /// Number of calendar days in the period.
    pub fn days_in_month(&self) -> u32 {
        self.end_date().signed_duration_since(self.start_date()).num_days() as u32 + 1
    }

    /// Approximate working days: calendar days minus two weekend days per
    /// full 7-day block. Deliberately policy-agnostic; not a calendar-aware
    /// business-day count.
    pub fn working_days(&self) -> u32 {
        let days = self.days_in_month();
        days - (days / 7) * 2
    }

    /// The period immediately after this one.
    pub fn next(&self) -> Period {
        if self.month == 12 {
            Period {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Period {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// All periods from `start` to `end` inclusive. Empty when `start > end`.
    pub fn range(start: Period, end: Period) -> Vec<Period> {
        let mut periods = Vec::new();
        let mut current = start;
        while current <= end {
            periods.push(current);
            current = current.next();
        }
        periods
    }

    /// True when the given date falls on or after the start of this period.
    pub fn starts_on_or_after(&self, date: NaiveDate) -> bool {
        self.start_date() >= date
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl TryFrom<String> for Period {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Period::parse(&value).map_err(|e| e.to_string())
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.to_string()
    }
}
