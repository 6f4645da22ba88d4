//! Payment and refund records
//!
//! A payment is applied against an invoice's outstanding balance and may
//! later own one or more refunds. Refunds are synchronous in this design:
//! they are approved at creation time and never sit in a pending queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{InvoiceId, Money, PatientId, PaymentId, RefundId, StaffId};

/// Payment channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash at the cashier desk
    Cash,
    /// Credit card
    CreditCard,
    /// Debit card
    DebitCard,
    /// Bank transfer
    BankTransfer,
    /// Insurance settlement
    Insurance,
    /// Mobile money wallet
    MobileMoney,
    /// Check/cheque
    Check,
}

/// Payment status
///
/// Payments are recorded only once they have completed; a payment moves to
/// `Refunded` when refunds against it reach its full amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Payment completed successfully
    Completed,
    /// Payment was fully refunded
    Refunded,
}

/// Refund status
///
/// Refunds carry approval stamps at creation; there is no pending state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    /// Refund approved and applied
    Approved,
}

/// A payment applied against an invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier
    pub id: PaymentId,
    /// Invoice being paid
    pub invoice_id: InvoiceId,
    /// Patient the invoice belongs to (denormalized for querying)
    pub patient_id: PatientId,
    /// Payment amount
    pub amount: Money,
    /// Payment channel
    pub method: PaymentMethod,
    /// External reference (gateway ref, bank transaction id)
    pub external_reference: Option<String>,
    /// Staff member who recorded the payment
    pub processed_by: StaffId,
    /// Status
    pub status: PaymentStatus,
    /// Notes
    pub notes: Option<String>,
    /// When the payment was processed
    pub processed_at: DateTime<Utc>,
    /// Refunds issued against this payment
    pub refunds: Vec<Refund>,
}

impl Payment {
    /// Creates a completed payment record
    pub fn new(
        invoice_id: InvoiceId,
        patient_id: PatientId,
        amount: Money,
        method: PaymentMethod,
        processed_by: StaffId,
    ) -> Self {
        Self {
            id: PaymentId::new_v7(),
            invoice_id,
            patient_id,
            amount,
            method,
            external_reference: None,
            processed_by,
            status: PaymentStatus::Completed,
            notes: None,
            processed_at: Utc::now(),
            refunds: Vec::new(),
        }
    }

    /// Sets the external reference
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.external_reference = Some(reference.into());
        self
    }

    /// Sets free-text notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Total amount already refunded against this payment
    pub fn refunded_total(&self) -> Money {
        self.refunds.iter().map(|r| r.amount).sum()
    }

    /// Amount still available to refund
    pub fn refundable(&self) -> Money {
        self.amount - self.refunded_total()
    }

    /// Returns true if refunds have consumed the full payment amount
    pub fn is_fully_refunded(&self) -> bool {
        self.refunded_total() == self.amount
    }
}

/// A reversal of part or all of a completed payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    /// Unique identifier
    pub id: RefundId,
    /// Payment being reversed
    pub payment_id: PaymentId,
    /// Invoice the payment belongs to (denormalized)
    pub invoice_id: InvoiceId,
    /// Patient (denormalized)
    pub patient_id: PatientId,
    /// Refund amount
    pub amount: Money,
    /// Reason for the refund
    pub reason: String,
    /// Staff member who approved the refund
    pub approved_by: StaffId,
    /// Approval timestamp (stamped at creation)
    pub approved_at: DateTime<Utc>,
    /// Status
    pub status: RefundStatus,
    /// Notes
    pub notes: Option<String>,
}

impl Refund {
    /// Creates an approved refund against a payment
    pub fn new(payment: &Payment, amount: Money, reason: impl Into<String>, approved_by: StaffId) -> Self {
        Self {
            id: RefundId::new_v7(),
            payment_id: payment.id,
            invoice_id: payment.invoice_id,
            patient_id: payment.patient_id,
            amount,
            reason: reason.into(),
            approved_by,
            approved_at: Utc::now(),
            status: RefundStatus::Approved,
            notes: None,
        }
    }

    /// Sets free-text notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_payment(amount: Money) -> Payment {
        Payment::new(
            InvoiceId::new_v7(),
            PatientId::new(),
            amount,
            PaymentMethod::Cash,
            StaffId::new(),
        )
    }

    #[test]
    fn test_payment_starts_completed() {
        let payment = test_payment(Money::new(dec!(100)));
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert!(payment.refunds.is_empty());
        assert_eq!(payment.refundable(), payment.amount);
    }

    #[test]
    fn test_refunded_total_accumulates() {
        let mut payment = test_payment(Money::new(dec!(100)));
        let approver = StaffId::new();

        payment
            .refunds
            .push(Refund::new(&payment, Money::new(dec!(30)), "duplicate charge", approver));
        let second = Refund::new(&payment, Money::new(dec!(20)), "goodwill", approver);
        payment.refunds.push(second);

        assert_eq!(payment.refunded_total().amount(), dec!(50));
        assert_eq!(payment.refundable().amount(), dec!(50));
        assert!(!payment.is_fully_refunded());
    }

    #[test]
    fn test_refund_denormalizes_parent_references() {
        let payment = test_payment(Money::new(dec!(75)));
        let refund = Refund::new(&payment, Money::new(dec!(75)), "service cancelled", StaffId::new());

        assert_eq!(refund.payment_id, payment.id);
        assert_eq!(refund.invoice_id, payment.invoice_id);
        assert_eq!(refund.patient_id, payment.patient_id);
        assert_eq!(refund.status, RefundStatus::Approved);
    }

    #[test]
    fn test_builder_style_setters() {
        let payment = test_payment(Money::new(dec!(10)))
            .with_reference("GW-991")
            .with_notes("front desk");

        assert_eq!(payment.external_reference.as_deref(), Some("GW-991"));
        assert_eq!(payment.notes.as_deref(), Some("front desk"));
    }
}
