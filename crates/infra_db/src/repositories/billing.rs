//! PostgreSQL billing store
//!
//! Implements `domain_billing::BillingStore` on PostgreSQL. The invoice
//! aggregate (invoice, charges, payments, refunds) is read and written as one
//! unit inside a transaction, and updates are guarded by a compare-and-swap
//! on the version column.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::debug;
use uuid::Uuid;

use core_kernel::{
    ChargeId, InvoiceId, Money, PatientId, PaymentId, RefundId, ServiceId, StaffId,
};
use domain_billing::{
    BillingError, BillingStore, Charge, Invoice, InvoiceFilter, InvoiceNumber, InvoiceStatus,
    Payment, PaymentMethod, PaymentStatus, Refund, RefundStatus,
};

use crate::error::DatabaseError;

/// PostgreSQL-backed implementation of the billing store port
#[derive(Debug, Clone)]
pub struct PostgresBillingStore {
    pool: PgPool,
}

impl PostgresBillingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_aggregate(&self, id: InvoiceId) -> Result<Option<Invoice>, BillingError> {
        let row = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT invoice_id, invoice_number, patient_id, status, total, paid,
                   issued_date, due_date, paid_date, notes, version,
                   created_at, updated_at
            FROM invoices
            WHERE invoice_id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut invoices = self.attach_children(vec![row]).await?;
        Ok(invoices.pop())
    }

    /// Loads charges, payments, and refunds for a batch of invoice rows and
    /// assembles the aggregates
    async fn attach_children(
        &self,
        rows: Vec<InvoiceRow>,
    ) -> Result<Vec<Invoice>, BillingError> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.invoice_id).collect();

        let charges = sqlx::query_as::<_, ChargeRow>(
            r#"
            SELECT charge_id, invoice_id, service_id, description, quantity,
                   unit_price, total_price, created_at
            FROM charges
            WHERE invoice_id = ANY($1)
            ORDER BY created_at
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        let payments = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT payment_id, invoice_id, patient_id, amount, method,
                   external_reference, processed_by, status, notes, processed_at
            FROM payments
            WHERE invoice_id = ANY($1)
            ORDER BY processed_at
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        let refunds = sqlx::query_as::<_, RefundRow>(
            r#"
            SELECT refund_id, payment_id, invoice_id, patient_id, amount,
                   reason, approved_by, approved_at, status, notes
            FROM refunds
            WHERE invoice_id = ANY($1)
            ORDER BY approved_at
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        let mut invoices = Vec::with_capacity(rows.len());
        for row in rows {
            let invoice_id = row.invoice_id;
            let mut invoice = row.into_domain()?;
            for charge in charges.iter().filter(|c| c.invoice_id == invoice_id) {
                invoice.charges.push(charge.clone().into_domain());
            }
            for payment_row in payments.iter().filter(|p| p.invoice_id == invoice_id) {
                let mut payment = payment_row.clone().into_domain()?;
                for refund in refunds
                    .iter()
                    .filter(|r| r.payment_id == payment_row.payment_id)
                {
                    payment.refunds.push(refund.clone().into_domain()?);
                }
                invoice.payments.push(payment);
            }
            invoices.push(invoice);
        }
        Ok(invoices)
    }

    /// Replaces the child rows of an invoice inside the given transaction
    ///
    /// The aggregate is small (a handful of charges and payments per
    /// invoice), so delete-and-reinsert keeps the write path simple and the
    /// stored state exactly equal to the in-memory aggregate.
    async fn write_children(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        invoice: &Invoice,
    ) -> Result<(), BillingError> {
        sqlx::query("DELETE FROM refunds WHERE invoice_id = $1")
            .bind(invoice.id.as_uuid())
            .execute(&mut **tx)
            .await
            .map_err(store_err)?;
        sqlx::query("DELETE FROM payments WHERE invoice_id = $1")
            .bind(invoice.id.as_uuid())
            .execute(&mut **tx)
            .await
            .map_err(store_err)?;
        sqlx::query("DELETE FROM charges WHERE invoice_id = $1")
            .bind(invoice.id.as_uuid())
            .execute(&mut **tx)
            .await
            .map_err(store_err)?;

        for charge in &invoice.charges {
            sqlx::query(
                r#"
                INSERT INTO charges (
                    charge_id, invoice_id, service_id, description, quantity,
                    unit_price, total_price, created_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(charge.id.as_uuid())
            .bind(invoice.id.as_uuid())
            .bind(charge.service_id.as_uuid())
            .bind(&charge.description)
            .bind(charge.quantity as i32)
            .bind(charge.unit_price.amount())
            .bind(charge.total_price.amount())
            .bind(charge.created_at)
            .execute(&mut **tx)
            .await
            .map_err(store_err)?;
        }

        for payment in &invoice.payments {
            sqlx::query(
                r#"
                INSERT INTO payments (
                    payment_id, invoice_id, patient_id, amount, method,
                    external_reference, processed_by, status, notes, processed_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(payment.id.as_uuid())
            .bind(invoice.id.as_uuid())
            .bind(payment.patient_id.as_uuid())
            .bind(payment.amount.amount())
            .bind(payment_method_str(payment.method))
            .bind(&payment.external_reference)
            .bind(payment.processed_by.as_uuid())
            .bind(payment_status_str(payment.status))
            .bind(&payment.notes)
            .bind(payment.processed_at)
            .execute(&mut **tx)
            .await
            .map_err(store_err)?;

            for refund in &payment.refunds {
                sqlx::query(
                    r#"
                    INSERT INTO refunds (
                        refund_id, payment_id, invoice_id, patient_id, amount,
                        reason, approved_by, approved_at, status, notes
                    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                    "#,
                )
                .bind(refund.id.as_uuid())
                .bind(payment.id.as_uuid())
                .bind(invoice.id.as_uuid())
                .bind(refund.patient_id.as_uuid())
                .bind(refund.amount.amount())
                .bind(&refund.reason)
                .bind(refund.approved_by.as_uuid())
                .bind(refund.approved_at)
                .bind(refund_status_str(refund.status))
                .bind(&refund.notes)
                .execute(&mut **tx)
                .await
                .map_err(store_err)?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BillingStore for PostgresBillingStore {
    async fn next_invoice_sequence(&self, year: i32, month: u32) -> Result<u32, BillingError> {
        // Atomic upsert-and-increment: concurrent callers serialize on the
        // (year, month) row and each sees a distinct value.
        let row = sqlx::query(
            r#"
            INSERT INTO invoice_sequences (year, month, last_value)
            VALUES ($1, $2, 1)
            ON CONFLICT (year, month)
            DO UPDATE SET last_value = invoice_sequences.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(year)
        .bind(month as i32)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;

        let value: i32 = row.try_get("last_value").map_err(store_err)?;
        Ok(value as u32)
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), BillingError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        sqlx::query(
            r#"
            INSERT INTO invoices (
                invoice_id, invoice_number, patient_id, status, total, paid,
                issued_date, due_date, paid_date, notes, version,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(invoice.id.as_uuid())
        .bind(invoice.invoice_number.as_str())
        .bind(invoice.patient_id.as_uuid())
        .bind(invoice_status_str(invoice.status))
        .bind(invoice.total.amount())
        .bind(invoice.paid.amount())
        .bind(invoice.issued_date)
        .bind(invoice.due_date)
        .bind(invoice.paid_date)
        .bind(&invoice.notes)
        .bind(invoice.version)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DatabaseError::from(&e) {
            DatabaseError::DuplicateEntry(msg) => BillingError::conflict(msg),
            other => BillingError::Store(other.to_string()),
        })?;

        Self::write_children(&mut tx, invoice).await?;
        tx.commit().await.map_err(store_err)?;

        debug!(invoice_id = %invoice.id, "Invoice inserted");
        Ok(())
    }

    async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, BillingError> {
        self.load_aggregate(id)
            .await?
            .ok_or(BillingError::InvoiceNotFound(id))
    }

    async fn update_invoice(
        &self,
        invoice: &Invoice,
        expected_version: i64,
    ) -> Result<(), BillingError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET status = $1, total = $2, paid = $3, issued_date = $4,
                due_date = $5, paid_date = $6, notes = $7,
                version = version + 1, updated_at = $8
            WHERE invoice_id = $9 AND version = $10
            "#,
        )
        .bind(invoice_status_str(invoice.status))
        .bind(invoice.total.amount())
        .bind(invoice.paid.amount())
        .bind(invoice.issued_date)
        .bind(invoice.due_date)
        .bind(invoice.paid_date)
        .bind(&invoice.notes)
        .bind(invoice.updated_at)
        .bind(invoice.id.as_uuid())
        .bind(expected_version)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        if result.rows_affected() == 0 {
            // Distinguish a vanished invoice from a lost race
            let exists = sqlx::query("SELECT 1 FROM invoices WHERE invoice_id = $1")
                .bind(invoice.id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(store_err)?
                .is_some();
            return Err(if exists {
                BillingError::VersionConflict(invoice.id)
            } else {
                BillingError::InvoiceNotFound(invoice.id)
            });
        }

        Self::write_children(&mut tx, invoice).await?;
        tx.commit().await.map_err(store_err)?;

        debug!(invoice_id = %invoice.id, version = expected_version + 1, "Invoice updated");
        Ok(())
    }

    async fn delete_invoice(&self, id: InvoiceId) -> Result<(), BillingError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        // Explicit cascade: the caller has already verified there is no
        // payment history, so only charges remain.
        sqlx::query("DELETE FROM charges WHERE invoice_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;

        let result = sqlx::query("DELETE FROM invoices WHERE invoice_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;

        if result.rows_affected() == 0 {
            return Err(BillingError::InvoiceNotFound(id));
        }
        tx.commit().await.map_err(store_err)?;

        debug!(invoice_id = %id, "Invoice deleted");
        Ok(())
    }

    async fn find_invoice_by_payment(
        &self,
        payment_id: PaymentId,
    ) -> Result<Invoice, BillingError> {
        let row = sqlx::query("SELECT invoice_id FROM payments WHERE payment_id = $1")
            .bind(payment_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .ok_or(BillingError::PaymentNotFound(payment_id))?;

        let invoice_id: Uuid = row.try_get("invoice_id").map_err(store_err)?;
        self.get_invoice(InvoiceId::from_uuid(invoice_id)).await
    }

    async fn list_invoices(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, BillingError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT i.invoice_id, i.invoice_number, i.patient_id, i.status,
                   i.total, i.paid, i.issued_date, i.due_date, i.paid_date,
                   i.notes, i.version, i.created_at, i.updated_at
            FROM invoices i
            LEFT JOIN patients p ON p.patient_id = i.patient_id
            WHERE 1 = 1
            "#,
        );

        if let Some(patient_id) = filter.patient_id {
            builder.push(" AND i.patient_id = ");
            builder.push_bind(Uuid::from(patient_id));
        }
        if let Some(status) = filter.status {
            builder.push(" AND i.status = ");
            builder.push_bind(invoice_status_str(status));
        }
        if let Some(from) = filter.from {
            builder.push(" AND i.created_at::date >= ");
            builder.push_bind(from);
        }
        if let Some(to) = filter.to {
            builder.push(" AND i.created_at::date <= ");
            builder.push_bind(to);
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            builder.push(" AND (i.invoice_number ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR p.full_name ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }
        builder.push(" ORDER BY i.created_at DESC");

        let rows = builder
            .build_query_as::<InvoiceRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }
        self.attach_children(rows).await
    }
}

fn store_err(error: sqlx::Error) -> BillingError {
    BillingError::Store(DatabaseError::from(&error).to_string())
}

/// Database row for invoices
#[derive(Debug, Clone, sqlx::FromRow)]
struct InvoiceRow {
    invoice_id: Uuid,
    invoice_number: String,
    patient_id: Uuid,
    status: String,
    total: Decimal,
    paid: Decimal,
    issued_date: Option<DateTime<Utc>>,
    due_date: Option<NaiveDate>,
    paid_date: Option<DateTime<Utc>>,
    notes: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InvoiceRow {
    fn into_domain(self) -> Result<Invoice, BillingError> {
        Ok(Invoice {
            id: InvoiceId::from_uuid(self.invoice_id),
            invoice_number: InvoiceNumber::from_string(self.invoice_number),
            patient_id: PatientId::from_uuid(self.patient_id),
            status: invoice_status_from_str(&self.status)?,
            total: Money::new(self.total),
            paid: Money::new(self.paid),
            issued_date: self.issued_date,
            due_date: self.due_date,
            paid_date: self.paid_date,
            notes: self.notes,
            charges: Vec::new(),
            payments: Vec::new(),
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Database row for charges
#[derive(Debug, Clone, sqlx::FromRow)]
struct ChargeRow {
    charge_id: Uuid,
    invoice_id: Uuid,
    service_id: Uuid,
    description: String,
    quantity: i32,
    unit_price: Decimal,
    total_price: Decimal,
    created_at: DateTime<Utc>,
}

impl ChargeRow {
    fn into_domain(self) -> Charge {
        Charge {
            id: ChargeId::from_uuid(self.charge_id),
            service_id: ServiceId::from_uuid(self.service_id),
            description: self.description,
            quantity: self.quantity as u32,
            unit_price: Money::new(self.unit_price),
            total_price: Money::new(self.total_price),
            created_at: self.created_at,
        }
    }
}

/// Database row for payments
#[derive(Debug, Clone, sqlx::FromRow)]
struct PaymentRow {
    payment_id: Uuid,
    invoice_id: Uuid,
    patient_id: Uuid,
    amount: Decimal,
    method: String,
    external_reference: Option<String>,
    processed_by: Uuid,
    status: String,
    notes: Option<String>,
    processed_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_domain(self) -> Result<Payment, BillingError> {
        Ok(Payment {
            id: PaymentId::from_uuid(self.payment_id),
            invoice_id: InvoiceId::from_uuid(self.invoice_id),
            patient_id: PatientId::from_uuid(self.patient_id),
            amount: Money::new(self.amount),
            method: payment_method_from_str(&self.method)?,
            external_reference: self.external_reference,
            processed_by: StaffId::from_uuid(self.processed_by),
            status: payment_status_from_str(&self.status)?,
            notes: self.notes,
            processed_at: self.processed_at,
            refunds: Vec::new(),
        })
    }
}

/// Database row for refunds
#[derive(Debug, Clone, sqlx::FromRow)]
struct RefundRow {
    refund_id: Uuid,
    payment_id: Uuid,
    invoice_id: Uuid,
    patient_id: Uuid,
    amount: Decimal,
    reason: String,
    approved_by: Uuid,
    approved_at: DateTime<Utc>,
    status: String,
    notes: Option<String>,
}

impl RefundRow {
    fn into_domain(self) -> Result<Refund, BillingError> {
        Ok(Refund {
            id: RefundId::from_uuid(self.refund_id),
            payment_id: PaymentId::from_uuid(self.payment_id),
            invoice_id: InvoiceId::from_uuid(self.invoice_id),
            patient_id: PatientId::from_uuid(self.patient_id),
            amount: Money::new(self.amount),
            reason: self.reason,
            approved_by: StaffId::from_uuid(self.approved_by),
            approved_at: self.approved_at,
            status: refund_status_from_str(&self.status)?,
            notes: self.notes,
        })
    }
}

fn invoice_status_str(status: InvoiceStatus) -> &'static str {
    match status {
        InvoiceStatus::Draft => "draft",
        InvoiceStatus::Pending => "pending",
        InvoiceStatus::Partial => "partial",
        InvoiceStatus::Paid => "paid",
        InvoiceStatus::Cancelled => "cancelled",
    }
}

fn invoice_status_from_str(value: &str) -> Result<InvoiceStatus, BillingError> {
    match value {
        "draft" => Ok(InvoiceStatus::Draft),
        "pending" => Ok(InvoiceStatus::Pending),
        "partial" => Ok(InvoiceStatus::Partial),
        "paid" => Ok(InvoiceStatus::Paid),
        "cancelled" => Ok(InvoiceStatus::Cancelled),
        other => Err(BillingError::Store(format!(
            "Unknown invoice status '{}'",
            other
        ))),
    }
}

fn payment_method_str(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Cash => "cash",
        PaymentMethod::CreditCard => "credit_card",
        PaymentMethod::DebitCard => "debit_card",
        PaymentMethod::BankTransfer => "bank_transfer",
        PaymentMethod::Insurance => "insurance",
        PaymentMethod::MobileMoney => "mobile_money",
        PaymentMethod::Check => "check",
    }
}

fn payment_method_from_str(value: &str) -> Result<PaymentMethod, BillingError> {
    match value {
        "cash" => Ok(PaymentMethod::Cash),
        "credit_card" => Ok(PaymentMethod::CreditCard),
        "debit_card" => Ok(PaymentMethod::DebitCard),
        "bank_transfer" => Ok(PaymentMethod::BankTransfer),
        "insurance" => Ok(PaymentMethod::Insurance),
        "mobile_money" => Ok(PaymentMethod::MobileMoney),
        "check" => Ok(PaymentMethod::Check),
        other => Err(BillingError::Store(format!(
            "Unknown payment method '{}'",
            other
        ))),
    }
}

fn payment_status_str(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Completed => "completed",
        PaymentStatus::Refunded => "refunded",
    }
}

fn payment_status_from_str(value: &str) -> Result<PaymentStatus, BillingError> {
    match value {
        "completed" => Ok(PaymentStatus::Completed),
        "refunded" => Ok(PaymentStatus::Refunded),
        other => Err(BillingError::Store(format!(
            "Unknown payment status '{}'",
            other
        ))),
    }
}

fn refund_status_str(status: RefundStatus) -> &'static str {
    match status {
        RefundStatus::Approved => "approved",
    }
}

fn refund_status_from_str(value: &str) -> Result<RefundStatus, BillingError> {
    match value {
        "approved" => Ok(RefundStatus::Approved),
        other => Err(BillingError::Store(format!(
            "Unknown refund status '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_round_trips() {
        for status in [
            InvoiceStatus::Draft,
            InvoiceStatus::Pending,
            InvoiceStatus::Partial,
            InvoiceStatus::Paid,
            InvoiceStatus::Cancelled,
        ] {
            assert_eq!(
                invoice_status_from_str(invoice_status_str(status)).unwrap(),
                status
            );
        }
    }

    #[test]
    fn test_unknown_status_is_a_store_error() {
        assert!(matches!(
            invoice_status_from_str("overdue"),
            Err(BillingError::Store(_))
        ));
    }

    #[test]
    fn test_payment_method_mapping_round_trips() {
        for method in [
            PaymentMethod::Cash,
            PaymentMethod::CreditCard,
            PaymentMethod::DebitCard,
            PaymentMethod::BankTransfer,
            PaymentMethod::Insurance,
            PaymentMethod::MobileMoney,
            PaymentMethod::Check,
        ] {
            assert_eq!(
                payment_method_from_str(payment_method_str(method)).unwrap(),
                method
            );
        }
    }
}
