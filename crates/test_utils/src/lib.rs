//! Test Utilities Crate
//!
//! Shared test infrastructure for the billing test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built test data for common entities
//! - `builders`: Builder patterns for invoice construction
//! - `doubles`: In-memory collaborator ports (patient directory, catalog)
//! - `assertions`: Custom assertion helpers for domain types
//! - `generators`: Property-based test data generators

pub mod assertions;
pub mod builders;
pub mod doubles;
pub mod fixtures;
pub mod generators;

pub use assertions::*;
pub use builders::*;
pub use doubles::*;
pub use fixtures::*;
pub use generators::*;
