//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the billing ledger, implemented with SQLx.
//!
//! # Architecture
//!
//! The crate provides adapters for the `domain_billing` ports:
//!
//! - [`PostgresBillingStore`] persists the invoice aggregate transactionally
//!   with optimistic concurrency control on the version column
//! - [`repositories::PostgresPatientDirectory`] and
//!   [`repositories::PostgresServiceCatalog`] resolve collaborator references
//!
//! The schema lives under `migrations/` and is applied with `sqlx migrate`.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{DatabaseConfig, create_pool, PostgresBillingStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/hospital")).await?;
//! let store = PostgresBillingStore::new(pool);
//! ```

pub mod error;
pub mod pool;
pub mod repositories;

pub use error::DatabaseError;
pub use pool::{create_pool, create_pool_from_url, DatabaseConfig, DatabasePool};
pub use repositories::PostgresBillingStore;
