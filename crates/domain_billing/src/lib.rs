//! # Billing Domain
//!
//! The hospital billing ledger: invoices with line-item charges, payments,
//! refunds, and period analytics.
//!
//! ## Design
//!
//! - The [`invoice::Invoice`] aggregate is the consistency boundary; it owns
//!   its charges and payments, and payments own their refunds.
//! - [`service::BillingService`] orchestrates operations over trait ports
//!   ([`ports::BillingStore`], [`ports::PatientDirectory`],
//!   [`ports::ServiceCatalog`]) using optimistic concurrency with bounded
//!   retries.
//! - Amounts are exact decimals via `core_kernel::Money`; nothing financial
//!   touches floating point.

pub mod analytics;
pub mod error;
pub mod invoice;
pub mod memory;
pub mod number;
pub mod payment;
pub mod ports;
pub mod service;

pub use analytics::BillingSummary;
pub use error::BillingError;
pub use invoice::{Charge, Invoice, InvoiceStatus};
pub use memory::InMemoryBillingStore;
pub use number::InvoiceNumber;
pub use payment::{Payment, PaymentMethod, PaymentStatus, Refund, RefundStatus};
pub use ports::{
    BillingStore, InvoiceFilter, PatientDirectory, PatientRef, ServiceCatalog, ServiceRef,
};
pub use service::{BillingService, NewCharge, PaymentGate, PaymentRequest, RefundRequest};
