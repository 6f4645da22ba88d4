//! Health check handlers

use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

/// Liveness probe
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "billing-api",
    })
}

/// Readiness probe
pub async fn readiness_check() -> StatusCode {
    StatusCode::OK
}
