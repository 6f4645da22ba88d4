//! Service-level billing tests
//!
//! Exercises the full ledger workflows through `BillingService` backed by the
//! in-memory store, including the concurrent-payment guarantees.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal_macros::dec;

use core_kernel::{Money, PatientId, ServiceId, StaffId};
use domain_billing::{
    BillingError, BillingService, InMemoryBillingStore, InvoiceFilter, InvoiceStatus, NewCharge,
    PatientDirectory, PatientRef, PaymentMethod, PaymentRequest, PaymentStatus, RefundRequest,
    ServiceCatalog, ServiceRef,
};

struct StaticPatients {
    patients: HashMap<PatientId, PatientRef>,
}

#[async_trait]
impl PatientDirectory for StaticPatients {
    async fn resolve_patient(&self, id: PatientId) -> Result<PatientRef, BillingError> {
        self.patients
            .get(&id)
            .cloned()
            .ok_or(BillingError::PatientNotFound(id))
    }
}

struct StaticCatalog {
    services: HashMap<ServiceId, ServiceRef>,
}

#[async_trait]
impl ServiceCatalog for StaticCatalog {
    async fn resolve_service(&self, id: ServiceId) -> Result<ServiceRef, BillingError> {
        self.services
            .get(&id)
            .cloned()
            .ok_or(BillingError::ServiceNotFound(id))
    }
}

struct Harness {
    service: Arc<BillingService>,
    patient_id: PatientId,
    consultation: ServiceId,
    lab_panel: ServiceId,
}

fn harness() -> Harness {
    let patient_id = PatientId::new();
    let consultation = ServiceId::new();
    let lab_panel = ServiceId::new();

    let mut patients = HashMap::new();
    patients.insert(
        patient_id,
        PatientRef {
            id: patient_id,
            name: "Amina Diallo".to_string(),
        },
    );

    let mut services = HashMap::new();
    services.insert(
        consultation,
        ServiceRef {
            id: consultation,
            name: "General Consultation".to_string(),
            current_price: Money::new(dec!(50)),
        },
    );
    services.insert(
        lab_panel,
        ServiceRef {
            id: lab_panel,
            name: "Full Blood Count".to_string(),
            current_price: Money::new(dec!(30)),
        },
    );

    let service = Arc::new(BillingService::new(
        Arc::new(InMemoryBillingStore::new()),
        Arc::new(StaticPatients { patients }),
        Arc::new(StaticCatalog { services }),
    ));

    Harness {
        service,
        patient_id,
        consultation,
        lab_panel,
    }
}

fn charge(service_id: ServiceId, quantity: u32) -> NewCharge {
    NewCharge {
        service_id,
        description: None,
        quantity,
    }
}

fn cash(amount: rust_decimal::Decimal) -> PaymentRequest {
    PaymentRequest {
        amount,
        method: PaymentMethod::Cash,
        reference: None,
        processed_by: StaffId::new(),
        notes: None,
    }
}

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn test_create_draft_then_finalize_then_pay_in_full() {
        let h = harness();
        let invoice = h
            .service
            .create_invoice(h.patient_id, None, vec![charge(h.consultation, 2)])
            .await
            .unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Draft);
        assert_eq!(invoice.total.amount(), dec!(100));

        // 2x50 consultation + 1x30 lab = 130 total
        let (invoice, _) = h
            .service
            .add_charge(invoice.id, charge(h.lab_panel, 1))
            .await
            .unwrap();
        assert_eq!(invoice.total.amount(), dec!(130));

        let invoice = h.service.finalize_invoice(invoice.id).await.unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Pending);
        assert!(invoice.issued_date.is_some());

        let (invoice, payment) = h
            .service
            .process_payment(invoice.id, cash(dec!(130)))
            .await
            .unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert_eq!(invoice.balance(), Money::zero());
        assert_eq!(payment.amount.amount(), dec!(130));
        assert_eq!(payment.status, PaymentStatus::Completed);
    }

    #[tokio::test]
    async fn test_invoice_numbers_are_sequential_within_month() {
        let h = harness();
        let first = h
            .service
            .create_invoice(h.patient_id, None, vec![])
            .await
            .unwrap();
        let second = h
            .service
            .create_invoice(h.patient_id, None, vec![])
            .await
            .unwrap();

        let suffix = |n: &str| n.rsplit('-').next().unwrap().parse::<u32>().unwrap();
        assert_eq!(
            suffix(second.invoice_number.as_str()),
            suffix(first.invoice_number.as_str()) + 1
        );
    }

    #[tokio::test]
    async fn test_unknown_patient_is_rejected_before_any_write() {
        let h = harness();
        let result = h
            .service
            .create_invoice(PatientId::new(), None, vec![charge(h.consultation, 1)])
            .await;
        assert!(matches!(result, Err(BillingError::PatientNotFound(_))));
    }

    #[tokio::test]
    async fn test_unknown_service_rejects_the_whole_create() {
        let h = harness();
        let result = h
            .service
            .create_invoice(
                h.patient_id,
                None,
                vec![charge(h.consultation, 1), charge(ServiceId::new(), 1)],
            )
            .await;
        assert!(matches!(result, Err(BillingError::ServiceNotFound(_))));

        // No partial invoice was persisted
        let all = h
            .service
            .list_invoices(&InvoiceFilter::default())
            .await
            .unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_keeps_payments_and_blocks_further_ones() {
        let h = harness();
        let invoice = h
            .service
            .create_invoice(h.patient_id, None, vec![charge(h.consultation, 2)])
            .await
            .unwrap();
        h.service.finalize_invoice(invoice.id).await.unwrap();
        h.service
            .process_payment(invoice.id, cash(dec!(40)))
            .await
            .unwrap();

        let invoice = h
            .service
            .cancel_invoice(invoice.id, Some("patient discharged".to_string()))
            .await
            .unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Cancelled);
        assert_eq!(invoice.paid.amount(), dec!(40));

        let result = h.service.process_payment(invoice.id, cash(dec!(10))).await;
        assert!(matches!(result, Err(BillingError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_delete_only_without_payment_history() {
        let h = harness();
        let draft = h
            .service
            .create_invoice(h.patient_id, None, vec![charge(h.consultation, 1)])
            .await
            .unwrap();
        h.service.delete_invoice(draft.id).await.unwrap();
        assert!(matches!(
            h.service.get_invoice(draft.id).await,
            Err(BillingError::InvoiceNotFound(_))
        ));

        let paid = h
            .service
            .create_invoice(h.patient_id, None, vec![charge(h.consultation, 1)])
            .await
            .unwrap();
        h.service.finalize_invoice(paid.id).await.unwrap();
        h.service
            .process_payment(paid.id, cash(dec!(20)))
            .await
            .unwrap();

        let result = h.service.delete_invoice(paid.id).await;
        assert!(matches!(result, Err(BillingError::Conflict(_))));
        assert!(h.service.get_invoice(paid.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_remove_charge_restores_balance() {
        let h = harness();
        let invoice = h
            .service
            .create_invoice(
                h.patient_id,
                None,
                vec![charge(h.consultation, 1), charge(h.lab_panel, 1)],
            )
            .await
            .unwrap();
        let lab_charge = invoice
            .charges
            .iter()
            .find(|c| c.service_id == h.lab_panel)
            .unwrap()
            .id;

        let invoice = h.service.remove_charge(invoice.id, lab_charge).await.unwrap();
        assert_eq!(invoice.total.amount(), dec!(50));
        assert_eq!(invoice.balance().amount(), dec!(50));
    }
}

mod payments {
    use super::*;

    #[tokio::test]
    async fn test_partial_payments_accumulate_to_paid() {
        let h = harness();
        let invoice = h
            .service
            .create_invoice(h.patient_id, None, vec![charge(h.consultation, 2)])
            .await
            .unwrap();
        h.service.finalize_invoice(invoice.id).await.unwrap();

        let (invoice, _) = h
            .service
            .process_payment(invoice.id, cash(dec!(60)))
            .await
            .unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Partial);
        assert_eq!(invoice.balance().amount(), dec!(40));

        let (invoice, _) = h
            .service
            .process_payment(invoice.id, cash(dec!(40)))
            .await
            .unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert!(invoice.paid_date.is_some());
    }

    #[tokio::test]
    async fn test_overpayment_is_rejected_and_nothing_changes() {
        let h = harness();
        let invoice = h
            .service
            .create_invoice(h.patient_id, None, vec![charge(h.consultation, 1)])
            .await
            .unwrap();
        h.service.finalize_invoice(invoice.id).await.unwrap();

        let result = h.service.process_payment(invoice.id, cash(dec!(75))).await;
        assert!(matches!(
            result,
            Err(BillingError::AmountExceedsBalance { .. })
        ));

        let stored = h.service.get_invoice(invoice.id).await.unwrap();
        assert_eq!(stored.balance().amount(), dec!(50));
        assert!(stored.payments.is_empty());
    }

    #[tokio::test]
    async fn test_non_positive_amounts_are_rejected() {
        let h = harness();
        let invoice = h
            .service
            .create_invoice(h.patient_id, None, vec![charge(h.consultation, 1)])
            .await
            .unwrap();
        h.service.finalize_invoice(invoice.id).await.unwrap();

        for amount in [dec!(0), dec!(-5)] {
            let result = h.service.process_payment(invoice.id, cash(amount)).await;
            assert!(matches!(result, Err(BillingError::InvalidAmount(_))));
        }
    }

    #[tokio::test]
    async fn test_payment_gate_is_idempotent_and_side_effect_free() {
        let h = harness();
        let invoice = h
            .service
            .create_invoice(h.patient_id, None, vec![charge(h.consultation, 1)])
            .await
            .unwrap();
        h.service.finalize_invoice(invoice.id).await.unwrap();

        let first = h.service.check_payment_status(invoice.id).await.unwrap();
        let second = h.service.check_payment_status(invoice.id).await.unwrap();
        assert_eq!(first, second);
        assert!(!first.can_proceed);
        assert_eq!(first.balance.amount(), dec!(50));

        h.service
            .process_payment(invoice.id, cash(dec!(50)))
            .await
            .unwrap();
        let gate = h.service.check_payment_status(invoice.id).await.unwrap();
        assert!(gate.can_proceed);
        assert_eq!(gate.payment_status, InvoiceStatus::Paid);
        assert_eq!(gate.balance, Money::zero());
    }

    #[tokio::test]
    async fn test_payment_history_includes_refunds() {
        let h = harness();
        let invoice = h
            .service
            .create_invoice(h.patient_id, None, vec![charge(h.consultation, 2)])
            .await
            .unwrap();
        h.service.finalize_invoice(invoice.id).await.unwrap();
        let (_, payment) = h
            .service
            .process_payment(invoice.id, cash(dec!(100)))
            .await
            .unwrap();
        h.service
            .process_refund(
                payment.id,
                RefundRequest {
                    amount: dec!(25),
                    reason: "duplicate charge".to_string(),
                    processed_by: StaffId::new(),
                    notes: None,
                },
            )
            .await
            .unwrap();

        let history = h.service.payment_history(invoice.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].refunds.len(), 1);
        assert_eq!(history[0].refunds[0].amount.amount(), dec!(25));
    }
}

mod refunds {
    use super::*;

    #[tokio::test]
    async fn test_full_refund_reopens_the_invoice() {
        let h = harness();
        let invoice = h
            .service
            .create_invoice(h.patient_id, None, vec![charge(h.consultation, 1)])
            .await
            .unwrap();
        h.service.finalize_invoice(invoice.id).await.unwrap();
        let (_, payment) = h
            .service
            .process_payment(invoice.id, cash(dec!(50)))
            .await
            .unwrap();

        let (invoice, refund) = h
            .service
            .process_refund(
                payment.id,
                RefundRequest {
                    amount: dec!(50),
                    reason: "admission cancelled".to_string(),
                    processed_by: StaffId::new(),
                    notes: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(refund.amount.amount(), dec!(50));
        assert_eq!(invoice.status, InvoiceStatus::Pending);
        assert_eq!(invoice.paid, Money::zero());
        assert_eq!(
            invoice.payment(payment.id).unwrap().status,
            PaymentStatus::Refunded
        );
    }

    #[tokio::test]
    async fn test_cumulative_refunds_never_exceed_the_payment() {
        let h = harness();
        let invoice = h
            .service
            .create_invoice(h.patient_id, None, vec![charge(h.consultation, 2)])
            .await
            .unwrap();
        h.service.finalize_invoice(invoice.id).await.unwrap();
        let (_, payment) = h
            .service
            .process_payment(invoice.id, cash(dec!(100)))
            .await
            .unwrap();

        let refund_of = |amount| RefundRequest {
            amount,
            reason: "correction".to_string(),
            processed_by: StaffId::new(),
            notes: None,
        };

        h.service
            .process_refund(payment.id, refund_of(dec!(60)))
            .await
            .unwrap();

        let result = h
            .service
            .process_refund(payment.id, refund_of(dec!(60)))
            .await;
        assert!(matches!(
            result,
            Err(BillingError::AmountExceedsRefundable { .. })
        ));

        let stored = h.service.get_invoice(invoice.id).await.unwrap();
        assert_eq!(stored.paid.amount(), dec!(40));
        assert_eq!(stored.status, InvoiceStatus::Partial);
    }

    #[tokio::test]
    async fn test_refund_against_unknown_payment() {
        let h = harness();
        let result = h
            .service
            .process_refund(
                core_kernel::PaymentId::new(),
                RefundRequest {
                    amount: dec!(10),
                    reason: "lost".to_string(),
                    processed_by: StaffId::new(),
                    notes: None,
                },
            )
            .await;
        assert!(matches!(result, Err(BillingError::PaymentNotFound(_))));
    }
}

mod concurrency {
    use super::*;

    #[tokio::test]
    async fn test_two_full_payments_cannot_both_land() {
        let h = harness();
        let invoice = h
            .service
            .create_invoice(h.patient_id, None, vec![charge(h.consultation, 2)])
            .await
            .unwrap();
        h.service.finalize_invoice(invoice.id).await.unwrap();

        // Both cashiers try to settle the full balance at once. The loser
        // retries against fresh state and must then fail the balance check.
        let a = {
            let service = h.service.clone();
            let id = invoice.id;
            tokio::spawn(async move { service.process_payment(id, cash(dec!(100))).await })
        };
        let b = {
            let service = h.service.clone();
            let id = invoice.id;
            tokio::spawn(async move { service.process_payment(id, cash(dec!(100))).await })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert_eq!(
            a.is_ok() as u8 + b.is_ok() as u8,
            1,
            "exactly one payment must succeed"
        );
        let loser = if a.is_ok() { b } else { a };
        assert!(matches!(
            loser,
            Err(BillingError::Conflict(_)) | Err(BillingError::AmountExceedsBalance { .. })
        ));

        let stored = h.service.get_invoice(invoice.id).await.unwrap();
        assert_eq!(stored.status, InvoiceStatus::Paid);
        assert_eq!(stored.paid.amount(), dec!(100));
        assert_eq!(stored.payments.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_partial_payments_both_land_via_retry() {
        let h = harness();
        let invoice = h
            .service
            .create_invoice(h.patient_id, None, vec![charge(h.consultation, 2)])
            .await
            .unwrap();
        h.service.finalize_invoice(invoice.id).await.unwrap();

        let a = {
            let service = h.service.clone();
            let id = invoice.id;
            tokio::spawn(async move { service.process_payment(id, cash(dec!(30))).await })
        };
        let b = {
            let service = h.service.clone();
            let id = invoice.id;
            tokio::spawn(async move { service.process_payment(id, cash(dec!(30))).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let stored = h.service.get_invoice(invoice.id).await.unwrap();
        assert_eq!(stored.paid.amount(), dec!(60));
        assert_eq!(stored.balance().amount(), dec!(40));
        assert_eq!(stored.status, InvoiceStatus::Partial);
        assert_eq!(stored.payments.len(), 2);
    }
}

mod analytics {
    use super::*;
    use core_kernel::ReportingPeriod;

    #[tokio::test]
    async fn test_summary_over_mixed_invoices() {
        let h = harness();

        // One paid, one pending with an overdue due date, one draft
        let paid = h
            .service
            .create_invoice(h.patient_id, None, vec![charge(h.consultation, 2)])
            .await
            .unwrap();
        h.service.finalize_invoice(paid.id).await.unwrap();
        h.service
            .process_payment(paid.id, cash(dec!(100)))
            .await
            .unwrap();

        let yesterday = (Utc::now() - Duration::days(1)).date_naive();
        let overdue = h
            .service
            .create_invoice(h.patient_id, Some(yesterday), vec![charge(h.lab_panel, 1)])
            .await
            .unwrap();
        h.service.finalize_invoice(overdue.id).await.unwrap();

        h.service
            .create_invoice(h.patient_id, None, vec![charge(h.lab_panel, 1)])
            .await
            .unwrap();

        let today = Utc::now().date_naive();
        let period = ReportingPeriod::new(today - Duration::days(7), today).unwrap();
        let summary = h.service.analytics(period).await.unwrap();

        assert_eq!(summary.invoice_count, 3);
        assert_eq!(summary.paid_count, 1);
        assert_eq!(summary.pending_count, 1);
        assert_eq!(summary.draft_count, 1);
        assert_eq!(summary.overdue_count, 1);
        assert_eq!(summary.total_amount.amount(), dec!(160));
        assert_eq!(summary.total_paid.amount(), dec!(100));
        assert_eq!(summary.total_outstanding.amount(), dec!(60));
        assert_eq!(summary.collection_rate, dec!(0.625));
    }
}
