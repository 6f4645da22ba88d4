//! Billing DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use domain_billing::{
    Charge, Invoice, InvoiceStatus, Payment, PaymentGate, PaymentMethod, PaymentStatus, Refund,
    RefundStatus,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    pub patient_id: Uuid,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    #[validate(nested)]
    pub charges: Vec<ChargeRequest>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChargeRequest {
    pub service_id: Uuid,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub quantity: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateInvoiceRequest {
    pub due_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CancelInvoiceRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecordPaymentRequest {
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub processed_by: Uuid,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct IssueRefundRequest {
    pub amount: Decimal,
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
    pub processed_by: Uuid,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Query parameters for invoice listing
#[derive(Debug, Default, Deserialize)]
pub struct ListInvoicesQuery {
    pub patient_id: Option<Uuid>,
    pub status: Option<InvoiceStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub search: Option<String>,
}

/// Query parameters for the analytics report
#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub invoice_number: String,
    pub patient_id: Uuid,
    pub status: InvoiceStatus,
    /// True when the invoice is past due and still collecting; derived, not
    /// part of the stored status
    pub overdue: bool,
    pub total: Decimal,
    pub paid: Decimal,
    pub balance: Decimal,
    pub issued_date: Option<DateTime<Utc>>,
    pub due_date: Option<NaiveDate>,
    pub paid_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub charges: Vec<ChargeResponse>,
    pub payments: Vec<PaymentResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        Self {
            id: invoice.id.into(),
            invoice_number: invoice.invoice_number.to_string(),
            patient_id: invoice.patient_id.into(),
            status: invoice.status,
            overdue: invoice.is_overdue(Utc::now().date_naive()),
            total: invoice.total.amount(),
            paid: invoice.paid.amount(),
            balance: invoice.balance().amount(),
            issued_date: invoice.issued_date,
            due_date: invoice.due_date,
            paid_date: invoice.paid_date,
            notes: invoice.notes,
            charges: invoice.charges.into_iter().map(Into::into).collect(),
            payments: invoice.payments.into_iter().map(Into::into).collect(),
            created_at: invoice.created_at,
            updated_at: invoice.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChargeResponse {
    pub id: Uuid,
    pub service_id: Uuid,
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<Charge> for ChargeResponse {
    fn from(charge: Charge) -> Self {
        Self {
            id: charge.id.into(),
            service_id: charge.service_id.into(),
            description: charge.description,
            quantity: charge.quantity,
            unit_price: charge.unit_price.amount(),
            total_price: charge.total_price.amount(),
            created_at: charge.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub external_reference: Option<String>,
    pub processed_by: Uuid,
    pub status: PaymentStatus,
    pub notes: Option<String>,
    pub processed_at: DateTime<Utc>,
    pub refunds: Vec<RefundResponse>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id.into(),
            invoice_id: payment.invoice_id.into(),
            amount: payment.amount.amount(),
            method: payment.method,
            external_reference: payment.external_reference,
            processed_by: payment.processed_by.into(),
            status: payment.status,
            notes: payment.notes,
            processed_at: payment.processed_at,
            refunds: payment.refunds.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RefundResponse {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub amount: Decimal,
    pub reason: String,
    pub approved_by: Uuid,
    pub approved_at: DateTime<Utc>,
    pub status: RefundStatus,
    pub notes: Option<String>,
}

impl From<Refund> for RefundResponse {
    fn from(refund: Refund) -> Self {
        Self {
            id: refund.id.into(),
            payment_id: refund.payment_id.into(),
            amount: refund.amount.amount(),
            reason: refund.reason,
            approved_by: refund.approved_by.into(),
            approved_at: refund.approved_at,
            status: refund.status,
            notes: refund.notes,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    pub can_proceed: bool,
    pub payment_status: InvoiceStatus,
    pub balance: Decimal,
}

impl From<PaymentGate> for PaymentStatusResponse {
    fn from(gate: PaymentGate) -> Self {
        Self {
            can_proceed: gate.can_proceed,
            payment_status: gate.payment_status,
            balance: gate.balance.amount(),
        }
    }
}
