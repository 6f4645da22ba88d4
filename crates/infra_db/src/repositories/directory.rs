//! PostgreSQL collaborator lookups
//!
//! Read-only adapters for the patient-directory and service-catalog ports.
//! The billing ledger never writes these tables; they are owned by the
//! patient-management and catalog modules.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

use core_kernel::{Money, PatientId, ServiceId};
use domain_billing::{BillingError, PatientDirectory, PatientRef, ServiceCatalog, ServiceRef};

use crate::error::DatabaseError;

/// PostgreSQL-backed patient lookup
#[derive(Debug, Clone)]
pub struct PostgresPatientDirectory {
    pool: PgPool,
}

impl PostgresPatientDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PatientDirectory for PostgresPatientDirectory {
    async fn resolve_patient(&self, id: PatientId) -> Result<PatientRef, BillingError> {
        let row = sqlx::query("SELECT full_name FROM patients WHERE patient_id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BillingError::Store(DatabaseError::from(&e).to_string()))?
            .ok_or(BillingError::PatientNotFound(id))?;

        let name: String = row
            .try_get("full_name")
            .map_err(|e| BillingError::Store(e.to_string()))?;
        Ok(PatientRef { id, name })
    }
}

/// PostgreSQL-backed service catalog lookup
///
/// Only active services resolve: a deactivated service cannot be charged,
/// though existing charges keep the price they captured.
#[derive(Debug, Clone)]
pub struct PostgresServiceCatalog {
    pool: PgPool,
}

impl PostgresServiceCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ServiceCatalog for PostgresServiceCatalog {
    async fn resolve_service(&self, id: ServiceId) -> Result<ServiceRef, BillingError> {
        let row = sqlx::query(
            "SELECT name, price FROM services WHERE service_id = $1 AND active = TRUE",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BillingError::Store(DatabaseError::from(&e).to_string()))?
        .ok_or(BillingError::ServiceNotFound(id))?;

        let name: String = row
            .try_get("name")
            .map_err(|e| BillingError::Store(e.to_string()))?;
        let price: Decimal = row
            .try_get("price")
            .map_err(|e| BillingError::Store(e.to_string()))?;

        Ok(ServiceRef {
            id,
            name,
            current_price: Money::new(price),
        })
    }
}
