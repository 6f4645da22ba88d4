//! Temporal helpers for billing queries
//!
//! Reporting and list queries select invoices by calendar date; this module
//! provides the validated inclusive date range those queries share.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid period: start {start} must not be after end {end}")]
    InvalidPeriod { start: NaiveDate, end: NaiveDate },
}

/// An inclusive calendar date range
///
/// Used for analytics windows and invoice list filters. Both endpoints are
/// inclusive; a single-day period has `start == end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingPeriod {
    /// First day of the period (inclusive)
    pub start: NaiveDate,
    /// Last day of the period (inclusive)
    pub end: NaiveDate,
}

impl ReportingPeriod {
    /// Creates a new period, validating the ordering of the endpoints
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, TemporalError> {
        if start > end {
            return Err(TemporalError::InvalidPeriod { start, end });
        }
        Ok(Self { start, end })
    }

    /// Returns true if the date falls within the period
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_period_validation() {
        assert!(ReportingPeriod::new(date(2025, 1, 1), date(2025, 1, 31)).is_ok());
        assert!(ReportingPeriod::new(date(2025, 1, 1), date(2025, 1, 1)).is_ok());
        assert!(matches!(
            ReportingPeriod::new(date(2025, 2, 1), date(2025, 1, 1)),
            Err(TemporalError::InvalidPeriod { .. })
        ));
    }

    #[test]
    fn test_contains_is_inclusive() {
        let period = ReportingPeriod::new(date(2025, 1, 1), date(2025, 1, 31)).unwrap();
        assert!(period.contains(date(2025, 1, 1)));
        assert!(period.contains(date(2025, 1, 31)));
        assert!(!period.contains(date(2025, 2, 1)));
        assert!(!period.contains(date(2024, 12, 31)));
    }
}
