//! Collaborator and persistence ports
//!
//! The ledger consumes the rest of the hospital application through narrow
//! trait seams: patient lookups, service-catalog lookups, and a transactional
//! billing store. Adapters live in `infra_db` (PostgreSQL) and in this crate
//! (`memory`, for tests and embedding).

use async_trait::async_trait;
use chrono::NaiveDate;

use core_kernel::{InvoiceId, Money, PatientId, PaymentId, ServiceId};

use crate::error::BillingError;
use crate::invoice::{Invoice, InvoiceStatus};

/// A resolved patient reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientRef {
    pub id: PatientId,
    /// Display name, used for free-text invoice search
    pub name: String,
}

/// A resolved catalog service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRef {
    pub id: ServiceId,
    pub name: String,
    /// Current catalog price, captured onto the charge at charge time
    pub current_price: Money,
}

/// Patient record lookup (owned by the patient-management module)
#[async_trait]
pub trait PatientDirectory: Send + Sync {
    /// Resolves a patient reference
    ///
    /// # Errors
    ///
    /// Returns `PatientNotFound` if the id does not resolve.
    async fn resolve_patient(&self, id: PatientId) -> Result<PatientRef, BillingError>;
}

/// Service catalog lookup (owned by the service-catalog module)
#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    /// Resolves a catalog service and its current price
    ///
    /// # Errors
    ///
    /// Returns `ServiceNotFound` if the id does not resolve.
    async fn resolve_service(&self, id: ServiceId) -> Result<ServiceRef, BillingError>;
}

/// Filter for invoice list queries
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    /// Restrict to a single patient
    pub patient_id: Option<PatientId>,
    /// Restrict to a status
    pub status: Option<InvoiceStatus>,
    /// Created on or after this date
    pub from: Option<NaiveDate>,
    /// Created on or before this date
    pub to: Option<NaiveDate>,
    /// Free-text match over invoice number and patient name
    pub search: Option<String>,
}

/// Transactional persistence for the invoice aggregate
///
/// The store persists the whole aggregate (invoice, charges, payments,
/// refunds) as one unit. `update_invoice` is a compare-and-swap on the
/// invoice version: the write succeeds only if the stored version still
/// equals `expected_version`, and the stored version is incremented as part
/// of the same write. This is what makes each ledger operation atomic under
/// concurrent access.
#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Allocates the next invoice-number sequence for a year/month bucket
    ///
    /// Must be atomic: two concurrent allocations never return the same
    /// sequence value.
    async fn next_invoice_sequence(&self, year: i32, month: u32) -> Result<u32, BillingError>;

    /// Persists a freshly created invoice
    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), BillingError>;

    /// Loads an invoice aggregate by id
    async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, BillingError>;

    /// Writes back a mutated aggregate if the version still matches
    ///
    /// # Errors
    ///
    /// Returns `VersionConflict` if another writer got there first.
    async fn update_invoice(
        &self,
        invoice: &Invoice,
        expected_version: i64,
    ) -> Result<(), BillingError>;

    /// Physically deletes an invoice and its charges (lifecycle-guarded by
    /// the caller); cascades are explicit, never implicit
    async fn delete_invoice(&self, id: InvoiceId) -> Result<(), BillingError>;

    /// Finds the invoice that owns a payment
    async fn find_invoice_by_payment(&self, payment_id: PaymentId)
        -> Result<Invoice, BillingError>;

    /// Lists invoices matching a filter, newest first
    async fn list_invoices(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, BillingError>;
}
