//! Billing handlers
//!
//! Thin translation layer: DTO validation, identifier wrapping, and the call
//! into `BillingService`. All business rules live in the domain crate.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{ChargeId, InvoiceId, PatientId, PaymentId, ReportingPeriod, ServiceId, StaffId};
use domain_billing::{
    BillingSummary, InvoiceFilter, NewCharge, PaymentRequest, RefundRequest,
};

use crate::dto::billing::*;
use crate::{error::ApiError, AppState};

/// Creates a draft invoice, optionally with initial charges
pub async fn create_invoice(
    State(state): State<AppState>,
    Json(request): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>), ApiError> {
    request.validate()?;

    let charges = request
        .charges
        .into_iter()
        .map(|c| NewCharge {
            service_id: ServiceId::from_uuid(c.service_id),
            description: c.description,
            quantity: c.quantity,
        })
        .collect();

    let invoice = state
        .service
        .create_invoice(
            PatientId::from_uuid(request.patient_id),
            request.due_date,
            charges,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(invoice.into())))
}

/// Lists invoices matching the query filters
pub async fn list_invoices(
    State(state): State<AppState>,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<Json<Vec<InvoiceResponse>>, ApiError> {
    let filter = InvoiceFilter {
        patient_id: query.patient_id.map(PatientId::from_uuid),
        status: query.status,
        from: query.from,
        to: query.to,
        search: query.search,
    };
    let invoices = state.service.list_invoices(&filter).await?;
    Ok(Json(invoices.into_iter().map(Into::into).collect()))
}

/// Gets an invoice with its charges, payments, and refunds
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let invoice = state.service.get_invoice(InvoiceId::from_uuid(id)).await?;
    Ok(Json(invoice.into()))
}

/// Updates non-financial invoice fields
pub async fn update_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateInvoiceRequest>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    request.validate()?;
    let invoice = state
        .service
        .update_invoice(InvoiceId::from_uuid(id), request.due_date, request.notes)
        .await?;
    Ok(Json(invoice.into()))
}

/// Deletes an invoice without payment history
pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_invoice(InvoiceId::from_uuid(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Finalizes a draft invoice, issuing it for payment
pub async fn finalize_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let invoice = state
        .service
        .finalize_invoice(InvoiceId::from_uuid(id))
        .await?;
    Ok(Json(invoice.into()))
}

/// Cancels an invoice
pub async fn cancel_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CancelInvoiceRequest>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    request.validate()?;
    let invoice = state
        .service
        .cancel_invoice(InvoiceId::from_uuid(id), request.reason)
        .await?;
    Ok(Json(invoice.into()))
}

/// Adds a charge to an invoice
pub async fn add_charge(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChargeRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>), ApiError> {
    request.validate()?;
    let (invoice, _) = state
        .service
        .add_charge(
            InvoiceId::from_uuid(id),
            NewCharge {
                service_id: ServiceId::from_uuid(request.service_id),
                description: request.description,
                quantity: request.quantity,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(invoice.into())))
}

/// Removes a charge from an invoice
pub async fn remove_charge(
    State(state): State<AppState>,
    Path((id, charge_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let invoice = state
        .service
        .remove_charge(InvoiceId::from_uuid(id), ChargeId::from_uuid(charge_id))
        .await?;
    Ok(Json(invoice.into()))
}

/// Records a payment against an invoice
pub async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), ApiError> {
    request.validate()?;
    let (_, payment) = state
        .service
        .process_payment(
            InvoiceId::from_uuid(id),
            PaymentRequest {
                amount: request.amount,
                method: request.method,
                reference: request.reference,
                processed_by: StaffId::from_uuid(request.processed_by),
                notes: request.notes,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(payment.into())))
}

/// Lists the payments (with refunds) recorded on an invoice
pub async fn payment_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PaymentResponse>>, ApiError> {
    let payments = state
        .service
        .payment_history(InvoiceId::from_uuid(id))
        .await?;
    Ok(Json(payments.into_iter().map(Into::into).collect()))
}

/// Read-only payment gate for dependent service delivery
pub async fn check_payment_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentStatusResponse>, ApiError> {
    let gate = state
        .service
        .check_payment_status(InvoiceId::from_uuid(id))
        .await?;
    Ok(Json(gate.into()))
}

/// Issues a refund against a payment
pub async fn issue_refund(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
    Json(request): Json<IssueRefundRequest>,
) -> Result<(StatusCode, Json<RefundResponse>), ApiError> {
    request.validate()?;
    let (_, refund) = state
        .service
        .process_refund(
            PaymentId::from_uuid(payment_id),
            RefundRequest {
                amount: request.amount,
                reason: request.reason,
                processed_by: StaffId::from_uuid(request.processed_by),
                notes: request.notes,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(refund.into())))
}

/// Billing summary over a reporting period
pub async fn billing_summary(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<BillingSummary>, ApiError> {
    let period = ReportingPeriod::new(query.from, query.to)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let summary = state.service.analytics(period).await?;
    Ok(Json(summary))
}
