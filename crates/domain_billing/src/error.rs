//! Billing domain errors
//!
//! The taxonomy mirrors what the API surface needs to render: not-found,
//! invalid-argument, invalid-state, and conflict classes, plus the transient
//! version conflict that the service retries internally.

use core_kernel::{ChargeId, InvoiceId, MoneyError, PatientId, PaymentId, ServiceId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur in the billing domain
#[derive(Debug, Error)]
pub enum BillingError {
    /// Patient reference did not resolve
    #[error("Patient not found: {0}")]
    PatientNotFound(PatientId),

    /// Catalog service reference did not resolve
    #[error("Service not found: {0}")]
    ServiceNotFound(ServiceId),

    /// Invoice not found
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(InvoiceId),

    /// Charge does not exist on the invoice
    #[error("Charge {charge_id} not found on invoice {invoice_id}")]
    ChargeNotFound {
        invoice_id: InvoiceId,
        charge_id: ChargeId,
    },

    /// Payment not found
    #[error("Payment not found: {0}")]
    PaymentNotFound(PaymentId),

    /// Amount failed validation (non-positive or malformed)
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] MoneyError),

    /// Payment amount exceeds the outstanding balance
    #[error("Payment amount {requested} exceeds outstanding balance {balance}")]
    AmountExceedsBalance { requested: Decimal, balance: Decimal },

    /// Refund amount exceeds what remains refundable on the payment
    #[error("Refund amount {requested} exceeds refundable amount {refundable}")]
    AmountExceedsRefundable {
        requested: Decimal,
        refundable: Decimal,
    },

    /// Operation is illegal for the current invoice or payment status
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Operation conflicts with existing records
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Optimistic lock failure on concurrent update; retried internally
    #[error("Version conflict on invoice {0}")]
    VersionConflict(InvoiceId),

    /// Backing store failure
    #[error("Store error: {0}")]
    Store(String),
}

impl BillingError {
    pub fn invalid_state(message: impl Into<String>) -> Self {
        BillingError::InvalidState(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        BillingError::Conflict(message.into())
    }

    /// Returns true if the error is a transient concurrency conflict that
    /// may succeed on retry against fresh state
    pub fn is_transient(&self) -> bool {
        matches!(self, BillingError::VersionConflict(_))
    }
}
