//! Core Kernel - Foundational types for the hospital billing system
//!
//! This crate provides the fundamental building blocks used across the
//! billing modules:
//! - Money with precise decimal arithmetic
//! - Strongly-typed entity identifiers
//! - Temporal types for reporting windows

pub mod error;
pub mod identifiers;
pub mod money;
pub mod temporal;

pub use error::CoreError;
pub use identifiers::{
    ChargeId, InvoiceId, PatientId, PaymentId, RefundId, ServiceId, StaffId,
};
pub use money::{Money, MoneyError, MONEY_SCALE};
pub use temporal::{ReportingPeriod, TemporalError};
