//! Hospital Billing - API Server Binary
//!
//! Starts the HTTP API server for the billing ledger.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin billing-api
//!
//! # Run with environment variables
//! API_HOST=0.0.0.0 API_PORT=8080 DATABASE_URL=postgres://... cargo run --bin billing-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_DATABASE_URL` / `DATABASE_URL` - PostgreSQL connection string
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)

use std::net::SocketAddr;
use std::sync::Arc;

use domain_billing::BillingService;
use infra_db::repositories::{PostgresPatientDirectory, PostgresServiceCatalog};
use infra_db::{create_pool, DatabaseConfig, PostgresBillingStore};
use interface_api::{config::ApiConfig, create_router};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = load_config();
    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        "Starting Hospital Billing API Server"
    );

    let pool = create_pool(DatabaseConfig::new(&config.database_url)).await?;
    run_migrations(&pool).await?;

    let service = Arc::new(BillingService::new(
        Arc::new(PostgresBillingStore::new(pool.clone())),
        Arc::new(PostgresPatientDirectory::new(pool.clone())),
        Arc::new(PostgresServiceCatalog::new(pool)),
    ));

    let app = create_router(service);
    let addr: SocketAddr = config.server_addr().parse()?;

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Loads API configuration from environment variables, falling back to
/// individual variables and then defaults
fn load_config() -> ApiConfig {
    ApiConfig::from_env().unwrap_or_else(|_| ApiConfig {
        host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
        port: std::env::var("API_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080),
        database_url: std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("API_DATABASE_URL"))
            .unwrap_or_else(|_| "postgres://localhost/hospital".to_string()),
        log_level: std::env::var("API_LOG_LEVEL")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| "info".to_string()),
    })
}

/// Initializes the tracing subscriber for structured logging
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Applies the billing schema migrations
async fn run_migrations(pool: &sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Running database migrations...");
    sqlx::migrate!("../infra_db/migrations").run(pool).await?;
    tracing::info!("Database ready");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM) so in-flight requests can
/// complete before the process exits
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
