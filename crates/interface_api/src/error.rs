//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain_billing::BillingError;
use serde::Serialize;
use thiserror::Error;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone())
            }
            ApiError::Database(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", msg.clone())
            }
            ApiError::Validation(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg.clone())
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

/// Maps domain errors onto the HTTP taxonomy
///
/// Reference-resolution failures are 404, amount and argument problems are
/// 422, lifecycle and concurrency violations are 409. A `VersionConflict`
/// reaching this layer means the service exhausted its retries, which the
/// client may itself retry.
impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match &err {
            BillingError::PatientNotFound(_)
            | BillingError::ServiceNotFound(_)
            | BillingError::InvoiceNotFound(_)
            | BillingError::ChargeNotFound { .. }
            | BillingError::PaymentNotFound(_) => ApiError::NotFound(err.to_string()),
            BillingError::InvalidAmount(_)
            | BillingError::AmountExceedsBalance { .. }
            | BillingError::AmountExceedsRefundable { .. } => {
                ApiError::Validation(err.to_string())
            }
            BillingError::InvalidState(_)
            | BillingError::Conflict(_)
            | BillingError::VersionConflict(_) => ApiError::Conflict(err.to_string()),
            BillingError::Store(_) => ApiError::Database(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::Validation(err.to_string())
    }
}
