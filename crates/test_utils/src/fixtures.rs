//! Pre-built Test Fixtures
//!
//! Ready-to-use test data, consistent and predictable across the suite.

use chrono::NaiveDate;
use core_kernel::{Money, PatientId, ReportingPeriod, ServiceId, StaffId};
use fake::faker::name::en::Name;
use fake::Fake;
use rust_decimal_macros::dec;

use domain_billing::{PatientRef, ServiceRef};

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    pub fn fifty() -> Money {
        Money::new(dec!(50.00))
    }

    pub fn hundred() -> Money {
        Money::new(dec!(100.00))
    }

    /// An amount with sub-cent input, for rounding tests
    pub fn uneven() -> Money {
        Money::new(dec!(33.333))
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// A fixed reporting year (2025)
    pub fn year_2025() -> ReportingPeriod {
        ReportingPeriod::new(Self::date(2025, 1, 1), Self::date(2025, 12, 31))
            .expect("valid period")
    }

    /// A due date safely in the past relative to `today_mid_2025`
    pub fn past_due_date() -> NaiveDate {
        Self::date(2025, 3, 1)
    }

    /// A stable "today" for derived-overdue tests
    pub fn today_mid_2025() -> NaiveDate {
        Self::date(2025, 6, 15)
    }

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }
}

/// Fixture for collaborator references
pub struct RefFixtures;

impl RefFixtures {
    /// A patient with a generated display name
    pub fn patient() -> PatientRef {
        PatientRef {
            id: PatientId::new(),
            name: Name().fake(),
        }
    }

    pub fn patient_named(name: &str) -> PatientRef {
        PatientRef {
            id: PatientId::new(),
            name: name.to_string(),
        }
    }

    /// A catalog service with the given price
    pub fn service(name: &str, price: Money) -> ServiceRef {
        ServiceRef {
            id: ServiceId::new(),
            name: name.to_string(),
            current_price: price,
        }
    }

    pub fn consultation() -> ServiceRef {
        Self::service("General Consultation", MoneyFixtures::fifty())
    }

    pub fn lab_panel() -> ServiceRef {
        Self::service("Full Blood Count", Money::new(dec!(30.00)))
    }

    pub fn cashier() -> StaffId {
        StaffId::new()
    }
}
