//! Store and collaborator implementations backed by PostgreSQL
//!
//! Each adapter implements a `domain_billing` port over the shared connection
//! pool. Adapters encapsulate SQL, map between database rows and domain
//! types, and translate database errors into the domain taxonomy.
//!
//! # Architecture
//!
//! - The invoice aggregate is written transactionally as one unit
//! - Optimistic concurrency control on the invoice version column
//! - Cascades are explicit deletes inside the owning transaction

pub mod billing;
pub mod directory;

pub use billing::PostgresBillingStore;
pub use directory::{PostgresPatientDirectory, PostgresServiceCatalog};
