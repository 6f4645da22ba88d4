//! In-memory billing store
//!
//! A HashMap-backed implementation of [`BillingStore`] used by the test
//! suites and by embedders that do not need durable persistence. It applies
//! the same optimistic-concurrency contract as the PostgreSQL adapter, so
//! service-level behavior is identical across the two.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use core_kernel::{InvoiceId, PatientId, PaymentId};

use crate::error::BillingError;
use crate::invoice::Invoice;
use crate::ports::{BillingStore, InvoiceFilter};

/// In-memory invoice store
#[derive(Debug, Default)]
pub struct InMemoryBillingStore {
    invoices: RwLock<HashMap<InvoiceId, Invoice>>,
    sequences: Mutex<HashMap<(i32, u32), u32>>,
    patient_names: RwLock<HashMap<PatientId, String>>,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a patient display name for free-text search
    ///
    /// The PostgreSQL adapter joins the patients table for this; in memory
    /// the mapping is supplied explicitly.
    pub async fn register_patient_name(&self, patient_id: PatientId, name: impl Into<String>) {
        self.patient_names
            .write()
            .await
            .insert(patient_id, name.into());
    }
}

#[async_trait]
impl BillingStore for InMemoryBillingStore {
    async fn next_invoice_sequence(&self, year: i32, month: u32) -> Result<u32, BillingError> {
        let mut sequences = self.sequences.lock().await;
        let counter = sequences.entry((year, month)).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), BillingError> {
        let mut invoices = self.invoices.write().await;
        if invoices.contains_key(&invoice.id) {
            return Err(BillingError::conflict(format!(
                "Invoice {} already exists",
                invoice.id
            )));
        }
        invoices.insert(invoice.id, invoice.clone());
        Ok(())
    }

    async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, BillingError> {
        self.invoices
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(BillingError::InvoiceNotFound(id))
    }

    async fn update_invoice(
        &self,
        invoice: &Invoice,
        expected_version: i64,
    ) -> Result<(), BillingError> {
        let mut invoices = self.invoices.write().await;
        let stored = invoices
            .get_mut(&invoice.id)
            .ok_or(BillingError::InvoiceNotFound(invoice.id))?;

        if stored.version != expected_version {
            return Err(BillingError::VersionConflict(invoice.id));
        }

        let mut updated = invoice.clone();
        updated.version = expected_version + 1;
        *stored = updated;
        Ok(())
    }

    async fn delete_invoice(&self, id: InvoiceId) -> Result<(), BillingError> {
        // Charges live inside the aggregate, so removing the entry is the
        // explicit cascade.
        self.invoices
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(BillingError::InvoiceNotFound(id))
    }

    async fn find_invoice_by_payment(
        &self,
        payment_id: PaymentId,
    ) -> Result<Invoice, BillingError> {
        self.invoices
            .read()
            .await
            .values()
            .find(|invoice| invoice.payments.iter().any(|p| p.id == payment_id))
            .cloned()
            .ok_or(BillingError::PaymentNotFound(payment_id))
    }

    async fn list_invoices(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, BillingError> {
        let invoices = self.invoices.read().await;
        let patient_names = self.patient_names.read().await;
        let needle = filter.search.as_ref().map(|s| s.to_lowercase());

        let mut matches: Vec<Invoice> = invoices
            .values()
            .filter(|invoice| {
                if let Some(patient_id) = filter.patient_id {
                    if invoice.patient_id != patient_id {
                        return false;
                    }
                }
                if let Some(status) = filter.status {
                    if invoice.status != status {
                        return false;
                    }
                }
                let created = invoice.created_at.date_naive();
                if let Some(from) = filter.from {
                    if created < from {
                        return false;
                    }
                }
                if let Some(to) = filter.to {
                    if created > to {
                        return false;
                    }
                }
                if let Some(needle) = &needle {
                    let number_match = invoice
                        .invoice_number
                        .as_str()
                        .to_lowercase()
                        .contains(needle);
                    let name_match = patient_names
                        .get(&invoice.patient_id)
                        .map(|name| name.to_lowercase().contains(needle))
                        .unwrap_or(false);
                    if !number_match && !name_match {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();

        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::InvoiceStatus;
    use crate::number::InvoiceNumber;
    use chrono::Utc;

    fn invoice_for(patient_id: PatientId, seq: u32) -> Invoice {
        Invoice::new(patient_id, InvoiceNumber::new(Utc::now().date_naive(), seq))
    }

    #[tokio::test]
    async fn test_sequence_is_monotonic_per_month() {
        let store = InMemoryBillingStore::new();
        assert_eq!(store.next_invoice_sequence(2025, 8).await.unwrap(), 1);
        assert_eq!(store.next_invoice_sequence(2025, 8).await.unwrap(), 2);
        // A different month has its own counter
        assert_eq!(store.next_invoice_sequence(2025, 9).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_get_round_trip() {
        let store = InMemoryBillingStore::new();
        let invoice = invoice_for(PatientId::new(), 1);
        store.insert_invoice(&invoice).await.unwrap();

        let loaded = store.get_invoice(invoice.id).await.unwrap();
        assert_eq!(loaded.id, invoice.id);
        assert_eq!(loaded.version, 0);
    }

    #[tokio::test]
    async fn test_update_rejects_stale_version() {
        let store = InMemoryBillingStore::new();
        let mut invoice = invoice_for(PatientId::new(), 1);
        store.insert_invoice(&invoice).await.unwrap();

        store.update_invoice(&invoice, 0).await.unwrap();

        // A second writer holding the old version loses
        invoice.notes = Some("stale write".to_string());
        let result = store.update_invoice(&invoice, 0).await;
        assert!(matches!(result, Err(BillingError::VersionConflict(_))));

        let stored = store.get_invoice(invoice.id).await.unwrap();
        assert_eq!(stored.version, 1);
        assert!(stored.notes.is_none());
    }

    #[tokio::test]
    async fn test_list_filters_by_patient_and_status() {
        let store = InMemoryBillingStore::new();
        let patient_a = PatientId::new();
        let patient_b = PatientId::new();

        store.insert_invoice(&invoice_for(patient_a, 1)).await.unwrap();
        store.insert_invoice(&invoice_for(patient_a, 2)).await.unwrap();
        store.insert_invoice(&invoice_for(patient_b, 3)).await.unwrap();

        let by_patient = store
            .list_invoices(&InvoiceFilter {
                patient_id: Some(patient_a),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_patient.len(), 2);

        let drafts = store
            .list_invoices(&InvoiceFilter {
                status: Some(InvoiceStatus::Draft),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(drafts.len(), 3);
    }

    #[tokio::test]
    async fn test_search_matches_number_and_patient_name() {
        let store = InMemoryBillingStore::new();
        let patient = PatientId::new();
        store.register_patient_name(patient, "Amina Diallo").await;

        let invoice = invoice_for(patient, 17);
        store.insert_invoice(&invoice).await.unwrap();
        store.insert_invoice(&invoice_for(PatientId::new(), 18)).await.unwrap();

        let by_name = store
            .list_invoices(&InvoiceFilter {
                search: Some("diallo".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].id, invoice.id);

        let by_number = store
            .list_invoices(&InvoiceFilter {
                search: Some("0017".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_number.len(), 1);
    }
}
