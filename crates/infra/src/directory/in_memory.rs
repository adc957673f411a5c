use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use clinicbill_billing::{BillableEvent, Patient, PrintLayout, Provider, Tenant};
use clinicbill_core::{EventId, PatientId, ProviderId, TenantId};

use super::seed::DirectorySeed;
use super::tenant_store::{InMemoryTenantStore, TenantStore};
use super::{DirectoryError, ReferenceDirectory};

/// In-memory reference directory for tests/dev.
///
/// The `upsert_*` methods stand in for the CRUD screens of the surrounding
/// application, which own these records.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    tenants: RwLock<HashMap<TenantId, Tenant>>,
    events: RwLock<HashMap<EventId, BillableEvent>>,
    patients: InMemoryTenantStore<PatientId, Patient>,
    providers: InMemoryTenantStore<ProviderId, Provider>,
    print_layouts: InMemoryTenantStore<(), PrintLayout>,
}

fn poisoned() -> DirectoryError {
    DirectoryError::Unavailable("lock poisoned".to_string())
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: DirectorySeed) -> Result<Self, DirectoryError> {
        let directory = Self::new();
        for tenant in seed.tenants {
            directory.upsert_tenant(tenant)?;
        }
        for patient in seed.patients {
            directory.upsert_patient(patient)?;
        }
        for provider in seed.providers {
            directory.upsert_provider(provider)?;
        }
        for layout in seed.print_layouts {
            directory.upsert_print_layout(layout)?;
        }
        for event in seed.events {
            directory.upsert_event(event)?;
        }
        Ok(directory)
    }

    pub fn upsert_tenant(&self, tenant: Tenant) -> Result<(), DirectoryError> {
        let mut map = self.tenants.write().map_err(|_| poisoned())?;
        map.insert(tenant.id, tenant);
        Ok(())
    }

    pub fn upsert_event(&self, event: BillableEvent) -> Result<(), DirectoryError> {
        let mut map = self.events.write().map_err(|_| poisoned())?;
        map.insert(event.id, event);
        Ok(())
    }

    pub fn upsert_patient(&self, patient: Patient) -> Result<(), DirectoryError> {
        self.patients.upsert(patient.tenant_id, patient.id, patient)
    }

    pub fn upsert_provider(&self, provider: Provider) -> Result<(), DirectoryError> {
        self.providers.upsert(provider.tenant_id, provider.id, provider)
    }

    pub fn upsert_print_layout(&self, layout: PrintLayout) -> Result<(), DirectoryError> {
        self.print_layouts.upsert(layout.tenant_id, (), layout)
    }
}

#[async_trait]
impl ReferenceDirectory for InMemoryDirectory {
    async fn get_event(&self, event_id: EventId) -> Result<Option<BillableEvent>, DirectoryError> {
        let map = self.events.read().map_err(|_| poisoned())?;
        Ok(map.get(&event_id).cloned())
    }

    async fn get_tenant(&self, tenant_id: TenantId) -> Result<Option<Tenant>, DirectoryError> {
        let map = self.tenants.read().map_err(|_| poisoned())?;
        Ok(map.get(&tenant_id).cloned())
    }

    async fn get_patient(
        &self,
        tenant_id: TenantId,
        patient_id: PatientId,
    ) -> Result<Option<Patient>, DirectoryError> {
        self.patients.get(tenant_id, &patient_id)
    }

    async fn get_provider(
        &self,
        tenant_id: TenantId,
        provider_id: ProviderId,
    ) -> Result<Option<Provider>, DirectoryError> {
        self.providers.get(tenant_id, &provider_id)
    }

    async fn get_print_layout(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<PrintLayout>, DirectoryError> {
        self.print_layouts.get(tenant_id, &())
    }
}
