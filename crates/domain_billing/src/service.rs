//! Billing service
//!
//! Orchestrates the ledger operations: invoice creation and lifecycle,
//! charge management, payment and refund processing, and analytics. Each
//! operation loads the invoice aggregate, validates and mutates a working
//! copy, and writes it back with a compare-and-swap on the aggregate
//! version. A failed write leaves the stored invoice untouched, and version
//! conflicts are retried a bounded number of times against fresh state.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use core_kernel::{
    ChargeId, InvoiceId, Money, PatientId, PaymentId, ReportingPeriod, ServiceId, StaffId,
};

use crate::analytics::BillingSummary;
use crate::error::BillingError;
use crate::invoice::{Charge, Invoice, InvoiceStatus};
use crate::number::InvoiceNumber;
use crate::payment::{Payment, PaymentMethod, Refund};
use crate::ports::{BillingStore, InvoiceFilter, PatientDirectory, ServiceCatalog};

/// Bounded retries for transient version conflicts (spec'd at 1-3 attempts)
const MAX_CAS_ATTEMPTS: u32 = 3;

/// A charge to add to an invoice
///
/// The unit price is not part of the request: it is captured from the
/// service catalog at charge time.
#[derive(Debug, Clone)]
pub struct NewCharge {
    pub service_id: ServiceId,
    /// Defaults to the catalog service name when absent
    pub description: Option<String>,
    pub quantity: u32,
}

/// A payment to apply against an invoice
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub processed_by: StaffId,
    pub notes: Option<String>,
}

/// A refund to issue against a payment
#[derive(Debug, Clone)]
pub struct RefundRequest {
    pub amount: Decimal,
    pub reason: String,
    pub processed_by: StaffId,
    pub notes: Option<String>,
}

/// Result of the read-only payment gate check
///
/// Downstream clinical modules use this to decide whether service delivery
/// can proceed; it is a policy read with no side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentGate {
    pub can_proceed: bool,
    pub payment_status: InvoiceStatus,
    pub balance: Money,
}

/// The billing ledger service
pub struct BillingService {
    store: Arc<dyn BillingStore>,
    patients: Arc<dyn PatientDirectory>,
    catalog: Arc<dyn ServiceCatalog>,
}

impl BillingService {
    pub fn new(
        store: Arc<dyn BillingStore>,
        patients: Arc<dyn PatientDirectory>,
        catalog: Arc<dyn ServiceCatalog>,
    ) -> Self {
        Self {
            store,
            patients,
            catalog,
        }
    }

    /// Creates a draft invoice for a patient, with optional initial charges
    ///
    /// The patient and every charge's service are resolved before anything
    /// is written; the invoice number is allocated from the store's atomic
    /// per-month sequence.
    ///
    /// # Errors
    ///
    /// - `PatientNotFound` / `ServiceNotFound` on unresolved references
    pub async fn create_invoice(
        &self,
        patient_id: PatientId,
        due_date: Option<NaiveDate>,
        initial_charges: Vec<NewCharge>,
    ) -> Result<Invoice, BillingError> {
        let patient = self.patients.resolve_patient(patient_id).await?;

        // Resolve all services before mutating anything
        let mut resolved = Vec::with_capacity(initial_charges.len());
        for new_charge in initial_charges {
            let service = self.catalog.resolve_service(new_charge.service_id).await?;
            resolved.push((new_charge, service));
        }

        let today = Utc::now().date_naive();
        let sequence = self
            .store
            .next_invoice_sequence(today.year(), today.month())
            .await?;
        let number = InvoiceNumber::new(today, sequence);

        let mut invoice = Invoice::new(patient.id, number);
        if let Some(due_date) = due_date {
            invoice = invoice.with_due_date(due_date);
        }
        for (new_charge, service) in resolved {
            let description = new_charge.description.unwrap_or_else(|| service.name.clone());
            let charge = Charge::new(
                service.id,
                description,
                new_charge.quantity,
                service.current_price,
            )?;
            invoice.add_charge(charge)?;
        }

        self.store.insert_invoice(&invoice).await?;

        info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            patient_id = %patient_id,
            total = %invoice.total,
            "Invoice created"
        );
        Ok(invoice)
    }

    /// Loads an invoice aggregate
    pub async fn get_invoice(&self, invoice_id: InvoiceId) -> Result<Invoice, BillingError> {
        self.store.get_invoice(invoice_id).await
    }

    /// Lists invoices matching a filter
    pub async fn list_invoices(
        &self,
        filter: &InvoiceFilter,
    ) -> Result<Vec<Invoice>, BillingError> {
        self.store.list_invoices(filter).await
    }

    /// Updates non-financial invoice fields (due date, notes)
    pub async fn update_invoice(
        &self,
        invoice_id: InvoiceId,
        due_date: Option<NaiveDate>,
        notes: Option<String>,
    ) -> Result<Invoice, BillingError> {
        let (invoice, _) = self
            .mutate_invoice(invoice_id, |invoice| {
                invoice.update_details(due_date, notes.clone())
            })
            .await?;
        Ok(invoice)
    }

    /// Adds a charge to an invoice while it is still mutable
    ///
    /// The service reference is resolved against the catalog first; the
    /// charge insert and the invoice total/balance update land in the same
    /// aggregate write.
    pub async fn add_charge(
        &self,
        invoice_id: InvoiceId,
        new_charge: NewCharge,
    ) -> Result<(Invoice, ChargeId), BillingError> {
        let service = self.catalog.resolve_service(new_charge.service_id).await?;
        let description = new_charge
            .description
            .unwrap_or_else(|| service.name.clone());
        let quantity = new_charge.quantity;

        let (invoice, charge_id) = self
            .mutate_invoice(invoice_id, |invoice| {
                let charge = Charge::new(
                    service.id,
                    description.clone(),
                    quantity,
                    service.current_price,
                )?;
                let charge = invoice.add_charge(charge)?;
                Ok(charge.id)
            })
            .await?;

        info!(
            invoice_id = %invoice_id,
            charge_id = %charge_id,
            service_id = %service.id,
            total = %invoice.total,
            "Charge added"
        );
        Ok((invoice, charge_id))
    }

    /// Removes a charge, restoring the invoice total and balance
    pub async fn remove_charge(
        &self,
        invoice_id: InvoiceId,
        charge_id: ChargeId,
    ) -> Result<Invoice, BillingError> {
        let (invoice, _) = self
            .mutate_invoice(invoice_id, |invoice| {
                invoice.remove_charge(charge_id).map(|_| ())
            })
            .await?;

        info!(invoice_id = %invoice_id, charge_id = %charge_id, "Charge removed");
        Ok(invoice)
    }

    /// Finalizes a draft invoice, issuing it for payment
    pub async fn finalize_invoice(&self, invoice_id: InvoiceId) -> Result<Invoice, BillingError> {
        let (invoice, _) = self
            .mutate_invoice(invoice_id, |invoice| invoice.finalize())
            .await?;

        info!(
            invoice_id = %invoice_id,
            invoice_number = %invoice.invoice_number,
            total = %invoice.total,
            "Invoice finalized"
        );
        Ok(invoice)
    }

    /// Cancels an invoice (blocked once paid); payments are not reversed
    pub async fn cancel_invoice(
        &self,
        invoice_id: InvoiceId,
        reason: Option<String>,
    ) -> Result<Invoice, BillingError> {
        let (invoice, _) = self
            .mutate_invoice(invoice_id, |invoice| invoice.cancel(reason.as_deref()))
            .await?;

        info!(invoice_id = %invoice_id, "Invoice cancelled");
        Ok(invoice)
    }

    /// Physically deletes an invoice that never accumulated payment history
    pub async fn delete_invoice(&self, invoice_id: InvoiceId) -> Result<(), BillingError> {
        let invoice = self.store.get_invoice(invoice_id).await?;
        invoice.ensure_deletable()?;
        self.store.delete_invoice(invoice_id).await?;

        info!(invoice_id = %invoice_id, "Invoice deleted");
        Ok(())
    }

    /// Applies a payment against an invoice's outstanding balance
    ///
    /// Validation (status accepts payments, 0 < amount <= balance) happens
    /// against the freshly loaded state on every attempt, so two concurrent
    /// full-balance payments cannot both pass the balance check: the loser's
    /// write fails the version CAS, and its retry re-validates against the
    /// updated balance.
    pub async fn process_payment(
        &self,
        invoice_id: InvoiceId,
        request: PaymentRequest,
    ) -> Result<(Invoice, Payment), BillingError> {
        let amount = Money::positive(request.amount)?;

        let (invoice, payment_id) = self
            .mutate_invoice(invoice_id, |invoice| {
                let mut payment = Payment::new(
                    invoice.id,
                    invoice.patient_id,
                    amount,
                    request.method,
                    request.processed_by,
                );
                if let Some(reference) = &request.reference {
                    payment = payment.with_reference(reference.clone());
                }
                if let Some(notes) = &request.notes {
                    payment = payment.with_notes(notes.clone());
                }
                let payment = invoice.record_payment(payment)?;
                Ok(payment.id)
            })
            .await?;

        let payment = invoice
            .payment(payment_id)
            .cloned()
            .ok_or(BillingError::PaymentNotFound(payment_id))?;

        info!(
            invoice_id = %invoice_id,
            payment_id = %payment_id,
            amount = %payment.amount,
            status = ?invoice.status,
            balance = %invoice.balance(),
            "Payment processed"
        );
        Ok((invoice, payment))
    }

    /// Read-only gate: may dependent services be delivered?
    pub async fn check_payment_status(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<PaymentGate, BillingError> {
        let invoice = self.store.get_invoice(invoice_id).await?;
        Ok(PaymentGate {
            can_proceed: invoice.status == InvoiceStatus::Paid,
            payment_status: invoice.status,
            balance: invoice.balance(),
        })
    }

    /// Returns the payments (with their refunds) recorded on an invoice
    pub async fn payment_history(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<Vec<Payment>, BillingError> {
        let invoice = self.store.get_invoice(invoice_id).await?;
        Ok(invoice.payments)
    }

    /// Reverses part or all of a completed payment
    ///
    /// Approval is synchronous: the refund is stamped approved immediately.
    /// The refund insert, payment status change, and invoice paid/balance
    /// restoration land in one aggregate write.
    pub async fn process_refund(
        &self,
        payment_id: PaymentId,
        request: RefundRequest,
    ) -> Result<(Invoice, Refund), BillingError> {
        let amount = Money::positive(request.amount)?;
        let owner = self.store.find_invoice_by_payment(payment_id).await?;

        let (invoice, refund_id) = self
            .mutate_invoice(owner.id, |invoice| {
                let payment = invoice
                    .payment(payment_id)
                    .ok_or(BillingError::PaymentNotFound(payment_id))?;
                let mut refund = Refund::new(
                    payment,
                    amount,
                    request.reason.clone(),
                    request.processed_by,
                );
                if let Some(notes) = &request.notes {
                    refund = refund.with_notes(notes.clone());
                }
                let refund = invoice.apply_refund(payment_id, refund)?;
                Ok(refund.id)
            })
            .await?;

        let refund = invoice
            .payment(payment_id)
            .and_then(|p| p.refunds.iter().find(|r| r.id == refund_id))
            .cloned()
            .ok_or(BillingError::PaymentNotFound(payment_id))?;

        info!(
            invoice_id = %invoice.id,
            payment_id = %payment_id,
            refund_id = %refund_id,
            amount = %refund.amount,
            status = ?invoice.status,
            "Refund processed"
        );
        Ok((invoice, refund))
    }

    /// Aggregates billing figures for a reporting period
    pub async fn analytics(
        &self,
        period: ReportingPeriod,
    ) -> Result<BillingSummary, BillingError> {
        let filter = InvoiceFilter {
            from: Some(period.start),
            to: Some(period.end),
            ..Default::default()
        };
        let invoices = self.store.list_invoices(&filter).await?;
        Ok(BillingSummary::summarize(
            period,
            &invoices,
            Utc::now().date_naive(),
        ))
    }

    /// Load-mutate-CAS loop shared by every write operation
    ///
    /// The mutation closure runs against a fresh copy of the aggregate on
    /// each attempt, so domain validation always sees current state. Only
    /// transient version conflicts are retried; validation failures
    /// propagate immediately.
    async fn mutate_invoice<R>(
        &self,
        invoice_id: InvoiceId,
        mutate: impl Fn(&mut Invoice) -> Result<R, BillingError>,
    ) -> Result<(Invoice, R), BillingError> {
        let mut attempt = 1;
        loop {
            let mut invoice = self.store.get_invoice(invoice_id).await?;
            let expected_version = invoice.version;
            let result = mutate(&mut invoice)?;

            match self.store.update_invoice(&invoice, expected_version).await {
                Ok(()) => {
                    invoice.version = expected_version + 1;
                    return Ok((invoice, result));
                }
                Err(err) if err.is_transient() && attempt < MAX_CAS_ATTEMPTS => {
                    warn!(
                        invoice_id = %invoice_id,
                        attempt,
                        "Version conflict, retrying against fresh state"
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
