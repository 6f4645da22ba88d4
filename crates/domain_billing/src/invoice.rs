//! Invoice aggregate
//!
//! The invoice is the consistency boundary of the billing ledger. It owns
//! its charges and payments (and, through payments, refunds) and keeps the
//! running totals in step with every mutation.
//!
//! # Invariants
//!
//! - `balance() == total - paid` after every operation
//! - `total == sum(charge.total_price)`
//! - `paid == sum(completed payments) - sum(approved refunds)`
//! - balance and paid are never negative
//! - status is always consistent with the balance

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{ChargeId, InvoiceId, Money, PatientId, PaymentId, ServiceId};

use crate::error::BillingError;
use crate::number::InvoiceNumber;
use crate::payment::{Payment, PaymentStatus, Refund};

/// Invoice lifecycle status
///
/// `Overdue` is deliberately absent: it is a derived display state computed
/// from the due date (`Invoice::is_overdue`), never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Invoice is being drafted
    Draft,
    /// Invoice has been finalized and issued, awaiting payment
    Pending,
    /// Partial payment received
    Partial,
    /// Fully paid
    Paid,
    /// Cancelled/voided
    Cancelled,
}

impl InvoiceStatus {
    /// Returns true if charges may still be added or removed
    ///
    /// Pending invoices remain editable in this design; callers that want a
    /// hard lock after finalize must add their own guard.
    pub fn allows_charge_edits(&self) -> bool {
        matches!(self, InvoiceStatus::Draft | InvoiceStatus::Pending)
    }

    /// Returns true if payments may be applied
    pub fn accepts_payments(&self) -> bool {
        !matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }
}

/// A line item on an invoice
///
/// The unit price is captured at charge time and is independent of later
/// catalog price changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Charge {
    /// Unique identifier
    pub id: ChargeId,
    /// Catalog service this charge was derived from
    pub service_id: ServiceId,
    /// Description
    pub description: String,
    /// Quantity (always at least 1)
    pub quantity: u32,
    /// Unit price captured at charge time
    pub unit_price: Money,
    /// Line total (quantity x unit price)
    pub total_price: Money,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Charge {
    /// Creates a new charge line
    ///
    /// # Errors
    ///
    /// Fails if the quantity is zero or the line total overflows.
    pub fn new(
        service_id: ServiceId,
        description: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Result<Self, BillingError> {
        if quantity == 0 {
            return Err(BillingError::invalid_state(
                "Charge quantity must be a positive integer",
            ));
        }
        let total_price = unit_price.times(quantity)?;

        Ok(Self {
            id: ChargeId::new_v7(),
            service_id,
            description: description.into(),
            quantity,
            unit_price,
            total_price,
            created_at: Utc::now(),
        })
    }
}

/// An invoice aggregating charges for a patient, with a running balance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier
    pub id: InvoiceId,
    /// Human-readable invoice number, unique per month
    pub invoice_number: InvoiceNumber,
    /// Patient being billed
    pub patient_id: PatientId,
    /// Status
    pub status: InvoiceStatus,
    /// Sum of charge totals
    pub total: Money,
    /// Net amount paid (completed payments minus approved refunds)
    pub paid: Money,
    /// When the invoice was finalized, None while draft
    pub issued_date: Option<DateTime<Utc>>,
    /// Payment due date
    pub due_date: Option<NaiveDate>,
    /// When the balance reached zero
    pub paid_date: Option<DateTime<Utc>>,
    /// Free-text notes
    pub notes: Option<String>,
    /// Ordered line items
    pub charges: Vec<Charge>,
    /// Payments applied against this invoice
    pub payments: Vec<Payment>,
    /// Optimistic concurrency version, incremented by the store on update
    pub version: i64,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Creates a new draft invoice with no charges
    pub fn new(patient_id: PatientId, invoice_number: InvoiceNumber) -> Self {
        let now = Utc::now();
        Self {
            id: InvoiceId::new_v7(),
            invoice_number,
            patient_id,
            status: InvoiceStatus::Draft,
            total: Money::zero(),
            paid: Money::zero(),
            issued_date: None,
            due_date: None,
            paid_date: None,
            notes: None,
            charges: Vec::new(),
            payments: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the due date at creation time
    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Outstanding amount owed
    pub fn balance(&self) -> Money {
        self.total - self.paid
    }

    /// Adds a line item, recomputing the invoice total and balance
    ///
    /// # Errors
    ///
    /// Fails with `InvalidState` unless the invoice is Draft or Pending.
    pub fn add_charge(&mut self, charge: Charge) -> Result<&Charge, BillingError> {
        if !self.status.allows_charge_edits() {
            return Err(BillingError::invalid_state(format!(
                "Cannot add charges to invoice {} in status {:?}",
                self.id, self.status
            )));
        }

        self.total = self.total + charge.total_price;
        self.charges.push(charge);
        self.updated_at = Utc::now();

        Ok(self.charges.last().expect("charge was just pushed"))
    }

    /// Removes a line item, decrementing total and balance symmetrically
    ///
    /// # Errors
    ///
    /// - `ChargeNotFound` if the charge does not belong to this invoice
    /// - `InvalidState` unless the invoice is Draft or Pending
    pub fn remove_charge(&mut self, charge_id: ChargeId) -> Result<Charge, BillingError> {
        if !self.status.allows_charge_edits() {
            return Err(BillingError::invalid_state(format!(
                "Cannot remove charges from invoice {} in status {:?}",
                self.id, self.status
            )));
        }

        let position = self
            .charges
            .iter()
            .position(|c| c.id == charge_id)
            .ok_or(BillingError::ChargeNotFound {
                invoice_id: self.id,
                charge_id,
            })?;

        let charge = self.charges.remove(position);
        self.total = self.total - charge.total_price;
        self.updated_at = Utc::now();

        Ok(charge)
    }

    /// Finalizes a draft invoice, issuing it for payment
    ///
    /// # Errors
    ///
    /// Fails with `InvalidState` if the invoice is not Draft or has no charges.
    pub fn finalize(&mut self) -> Result<(), BillingError> {
        if self.status != InvoiceStatus::Draft {
            return Err(BillingError::invalid_state(format!(
                "Only draft invoices can be finalized, invoice {} is {:?}",
                self.id, self.status
            )));
        }
        if self.charges.is_empty() {
            return Err(BillingError::invalid_state(
                "Cannot finalize an invoice with no charges",
            ));
        }

        let now = Utc::now();
        self.status = InvoiceStatus::Pending;
        self.issued_date = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Cancels the invoice
    ///
    /// Already-applied payments are left untouched: cancellation does not
    /// trigger refunds, which must be issued separately against the payments.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidState` if the invoice is Paid or already Cancelled.
    pub fn cancel(&mut self, reason: Option<&str>) -> Result<(), BillingError> {
        match self.status {
            InvoiceStatus::Paid => {
                return Err(BillingError::invalid_state(format!(
                    "Cannot cancel paid invoice {}",
                    self.id
                )))
            }
            InvoiceStatus::Cancelled => {
                return Err(BillingError::invalid_state(format!(
                    "Invoice {} is already cancelled",
                    self.id
                )))
            }
            _ => {}
        }

        if let Some(reason) = reason {
            let note = format!("Cancelled: {}", reason);
            self.notes = Some(match self.notes.take() {
                Some(existing) => format!("{}\n{}", existing, note),
                None => note,
            });
        }

        self.status = InvoiceStatus::Cancelled;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Checks whether the invoice may be physically deleted
    ///
    /// Deletion is permitted only while no payment history exists and the
    /// invoice never reached Partial or Paid.
    pub fn ensure_deletable(&self) -> Result<(), BillingError> {
        if !self.payments.is_empty() {
            return Err(BillingError::conflict(format!(
                "Invoice {} has payment history and cannot be deleted",
                self.id
            )));
        }
        if matches!(self.status, InvoiceStatus::Partial | InvoiceStatus::Paid) {
            return Err(BillingError::conflict(format!(
                "Invoice {} in status {:?} cannot be deleted",
                self.id, self.status
            )));
        }
        Ok(())
    }

    /// Updates non-financial fields (due date, notes)
    ///
    /// # Errors
    ///
    /// Fails with `InvalidState` on a cancelled invoice.
    pub fn update_details(
        &mut self,
        due_date: Option<NaiveDate>,
        notes: Option<String>,
    ) -> Result<(), BillingError> {
        if self.status == InvoiceStatus::Cancelled {
            return Err(BillingError::invalid_state(format!(
                "Cannot update cancelled invoice {}",
                self.id
            )));
        }
        if let Some(due_date) = due_date {
            self.due_date = Some(due_date);
        }
        if let Some(notes) = notes {
            self.notes = Some(notes);
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Applies a payment against the outstanding balance
    ///
    /// All validation happens before any mutation. On success the payment is
    /// recorded, paid/balance are updated, and the status moves to Partial
    /// or Paid (with `paid_date` stamped at zero balance).
    ///
    /// # Errors
    ///
    /// - `InvalidState` (conflict class) if the invoice is Paid or Cancelled
    /// - `InvalidAmount` if the amount is not positive
    /// - `AmountExceedsBalance` if the amount exceeds the balance
    pub fn record_payment(&mut self, payment: Payment) -> Result<&Payment, BillingError> {
        if !self.status.accepts_payments() {
            return Err(BillingError::conflict(format!(
                "Invoice {} in status {:?} does not accept payments",
                self.id, self.status
            )));
        }
        if !payment.amount.is_positive() {
            return Err(BillingError::InvalidAmount(
                core_kernel::MoneyError::NotPositive(payment.amount.amount()),
            ));
        }
        if payment.amount > self.balance() {
            return Err(BillingError::AmountExceedsBalance {
                requested: payment.amount.amount(),
                balance: self.balance().amount(),
            });
        }

        self.paid = self.paid + payment.amount;
        let now = Utc::now();
        if self.balance().is_zero() {
            self.status = InvoiceStatus::Paid;
            self.paid_date = Some(now);
        } else {
            self.status = InvoiceStatus::Partial;
        }
        self.updated_at = now;
        self.payments.push(payment);

        Ok(self.payments.last().expect("payment was just pushed"))
    }

    /// Looks up a payment on this invoice
    pub fn payment(&self, payment_id: PaymentId) -> Option<&Payment> {
        self.payments.iter().find(|p| p.id == payment_id)
    }

    /// Reverses part or all of a completed payment
    ///
    /// The refund bound is the amount remaining on the payment after prior
    /// refunds, so cumulative refunds can never exceed the payment. A full
    /// refund flips the payment status to Refunded. The invoice moves back
    /// to Partial while any net paid amount remains, or Pending once net
    /// paid returns to zero; a cancelled invoice keeps its status.
    ///
    /// # Errors
    ///
    /// - `PaymentNotFound` if the payment does not belong to this invoice
    /// - `Conflict` if the payment is already fully refunded
    /// - `InvalidAmount` / `AmountExceedsRefundable` on bad amounts
    pub fn apply_refund(
        &mut self,
        payment_id: PaymentId,
        refund: Refund,
    ) -> Result<&Refund, BillingError> {
        let payment = self
            .payments
            .iter_mut()
            .find(|p| p.id == payment_id)
            .ok_or(BillingError::PaymentNotFound(payment_id))?;

        if payment.status != PaymentStatus::Completed {
            return Err(BillingError::conflict(format!(
                "Payment {} has already been refunded",
                payment_id
            )));
        }
        if !refund.amount.is_positive() {
            return Err(BillingError::InvalidAmount(
                core_kernel::MoneyError::NotPositive(refund.amount.amount()),
            ));
        }
        if refund.amount > payment.refundable() {
            return Err(BillingError::AmountExceedsRefundable {
                requested: refund.amount.amount(),
                refundable: payment.refundable().amount(),
            });
        }

        let amount = refund.amount;
        payment.refunds.push(refund);
        if payment.is_fully_refunded() {
            payment.status = PaymentStatus::Refunded;
        }
        let refund_ref_index = payment.refunds.len() - 1;

        self.paid = self.paid - amount;
        // A cancelled invoice stays cancelled; refunds only reopen invoices
        // that are still collecting.
        if self.status != InvoiceStatus::Cancelled {
            self.status = if self.paid.is_zero() {
                InvoiceStatus::Pending
            } else {
                InvoiceStatus::Partial
            };
        }
        self.paid_date = None;
        self.updated_at = Utc::now();

        let payment = self
            .payments
            .iter()
            .find(|p| p.id == payment_id)
            .expect("payment exists");
        Ok(&payment.refunds[refund_ref_index])
    }

    /// Returns true if the invoice is past due and still collecting
    ///
    /// Overdue is a derived display state over Pending/Partial invoices; it
    /// is never written back to the status column.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        matches!(self.status, InvoiceStatus::Pending | InvoiceStatus::Partial)
            && self.due_date.map(|due| today > due).unwrap_or(false)
    }
}
