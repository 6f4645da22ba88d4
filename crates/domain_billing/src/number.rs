//! Human-readable invoice numbers
//!
//! Invoice numbers follow the pattern `INV-YYMM-NNNN`: a fixed prefix, the
//! two-digit year and month of creation, and a four-digit sequence that
//! restarts each month. The sequence itself is allocated by the billing
//! store (an atomic per-month counter) so that concurrent invoice creation
//! cannot produce duplicates.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix carried by every invoice number
pub const INVOICE_NUMBER_PREFIX: &str = "INV";

/// A formatted invoice number
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceNumber(String);

impl InvoiceNumber {
    /// Formats an invoice number from a creation date and monthly sequence
    pub fn new(created_on: NaiveDate, sequence: u32) -> Self {
        Self(format!(
            "{}-{:02}{:02}-{:04}",
            INVOICE_NUMBER_PREFIX,
            created_on.year() % 100,
            created_on.month(),
            sequence
        ))
    }

    /// Wraps an already-formatted number loaded from the store
    pub fn from_string(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        let date = NaiveDate::from_ymd_opt(2025, 8, 15).unwrap();
        let number = InvoiceNumber::new(date, 1);
        assert_eq!(number.as_str(), "INV-2508-0001");
    }

    #[test]
    fn test_sequence_padding() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        assert_eq!(InvoiceNumber::new(date, 42).as_str(), "INV-2512-0042");
        assert_eq!(InvoiceNumber::new(date, 9999).as_str(), "INV-2512-9999");
    }

    #[test]
    fn test_year_wraps_to_two_digits() {
        let date = NaiveDate::from_ymd_opt(2107, 1, 2).unwrap();
        assert_eq!(InvoiceNumber::new(date, 7).as_str(), "INV-0701-0007");
    }
}
