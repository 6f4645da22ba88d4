//! HTTP API Layer
//!
//! REST API for the hospital billing ledger using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for invoices, payments, refunds, analytics
//! - **Middleware**: Request logging and tracing
//! - **DTOs**: Request/Response data transfer objects with validation
//! - **Error Handling**: Consistent error responses mapped from the domain
//!   taxonomy (404 / 422 / 409 / 500)
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let app = create_router(service);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use domain_billing::BillingService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{billing, health};
use crate::middleware::request_log_middleware;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BillingService>,
}

/// Creates the main API router
///
/// # Arguments
///
/// * `service` - The billing service, wired to a store and collaborator ports
pub fn create_router(service: Arc<BillingService>) -> Router {
    let state = AppState { service };

    // Public routes
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    // Invoice routes
    let invoice_routes = Router::new()
        .route("/", post(billing::create_invoice))
        .route("/", get(billing::list_invoices))
        .route("/:id", get(billing::get_invoice))
        .route("/:id", put(billing::update_invoice))
        .route("/:id", delete(billing::delete_invoice))
        .route("/:id/finalize", post(billing::finalize_invoice))
        .route("/:id/cancel", post(billing::cancel_invoice))
        .route("/:id/charges", post(billing::add_charge))
        .route("/:id/charges/:charge_id", delete(billing::remove_charge))
        .route("/:id/payments", post(billing::record_payment))
        .route("/:id/payments", get(billing::payment_history))
        .route("/:id/payment-status", get(billing::check_payment_status));

    // Payment routes (refunds hang off the payment, not the invoice)
    let payment_routes = Router::new().route("/:id/refunds", post(billing::issue_refund));

    // Analytics routes
    let analytics_routes = Router::new().route("/billing", get(billing::billing_summary));

    let api_routes = Router::new()
        .nest("/invoices", invoice_routes)
        .nest("/payments", payment_routes)
        .nest("/analytics", analytics_routes)
        .layer(axum_middleware::from_fn(request_log_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
