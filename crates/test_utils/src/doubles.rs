//! Collaborator port doubles
//!
//! In-memory implementations of the patient-directory and service-catalog
//! ports, for wiring a `BillingService` without a database.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use core_kernel::{PatientId, ServiceId};
use domain_billing::{
    BillingError, BillingService, InMemoryBillingStore, PatientDirectory, PatientRef,
    ServiceCatalog, ServiceRef,
};

/// Fixed-map patient directory
#[derive(Debug, Default, Clone)]
pub struct StaticPatientDirectory {
    patients: HashMap<PatientId, PatientRef>,
}

impl StaticPatientDirectory {
    pub fn with(patients: impl IntoIterator<Item = PatientRef>) -> Self {
        Self {
            patients: patients.into_iter().map(|p| (p.id, p)).collect(),
        }
    }
}

#[async_trait]
impl PatientDirectory for StaticPatientDirectory {
    async fn resolve_patient(&self, id: PatientId) -> Result<PatientRef, BillingError> {
        self.patients
            .get(&id)
            .cloned()
            .ok_or(BillingError::PatientNotFound(id))
    }
}

/// Fixed-map service catalog
#[derive(Debug, Default, Clone)]
pub struct StaticServiceCatalog {
    services: HashMap<ServiceId, ServiceRef>,
}

impl StaticServiceCatalog {
    pub fn with(services: impl IntoIterator<Item = ServiceRef>) -> Self {
        Self {
            services: services.into_iter().map(|s| (s.id, s)).collect(),
        }
    }
}

#[async_trait]
impl ServiceCatalog for StaticServiceCatalog {
    async fn resolve_service(&self, id: ServiceId) -> Result<ServiceRef, BillingError> {
        self.services
            .get(&id)
            .cloned()
            .ok_or(BillingError::ServiceNotFound(id))
    }
}

/// Wires a `BillingService` over the in-memory store and the given
/// collaborator data, registering patient names for search
pub async fn in_memory_service(
    patients: Vec<PatientRef>,
    services: Vec<ServiceRef>,
) -> Arc<BillingService> {
    let store = Arc::new(InMemoryBillingStore::new());
    for patient in &patients {
        store
            .register_patient_name(patient.id, patient.name.clone())
            .await;
    }

    Arc::new(BillingService::new(
        store,
        Arc::new(StaticPatientDirectory::with(patients)),
        Arc::new(StaticServiceCatalog::with(services)),
    ))
}
