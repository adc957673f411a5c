//! Read-only access to the records billing depends on.
//!
//! Clinics, patients, doctors, print settings and billable events are owned by
//! the rest of the hospital application; billing only resolves them by id.
//! `Ok(None)` means "not found", `Err` means the directory itself failed.

pub mod in_memory;
pub mod postgres;
pub mod seed;
pub mod tenant_store;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use clinicbill_billing::{BillableEvent, Patient, PrintLayout, Provider, Tenant};
use clinicbill_core::{EventId, PatientId, ProviderId, TenantId};

pub use in_memory::InMemoryDirectory;
pub use postgres::PostgresDirectory;
pub use seed::DirectorySeed;
pub use tenant_store::{InMemoryTenantStore, TenantStore};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt directory record: {0}")]
    Corrupt(String),
}

/// Lookup interface over the live reference records.
///
/// Patients, providers and print layouts are resolved within a tenant, so a
/// record belonging to another clinic is indistinguishable from a missing one.
#[async_trait]
pub trait ReferenceDirectory: Send + Sync {
    async fn get_event(&self, event_id: EventId) -> Result<Option<BillableEvent>, DirectoryError>;

    async fn get_tenant(&self, tenant_id: TenantId) -> Result<Option<Tenant>, DirectoryError>;

    async fn get_patient(
        &self,
        tenant_id: TenantId,
        patient_id: PatientId,
    ) -> Result<Option<Patient>, DirectoryError>;

    async fn get_provider(
        &self,
        tenant_id: TenantId,
        provider_id: ProviderId,
    ) -> Result<Option<Provider>, DirectoryError>;

    async fn get_print_layout(&self, tenant_id: TenantId)
    -> Result<Option<PrintLayout>, DirectoryError>;
}

#[async_trait]
impl<S> ReferenceDirectory for Arc<S>
where
    S: ReferenceDirectory + ?Sized,
{
    async fn get_event(&self, event_id: EventId) -> Result<Option<BillableEvent>, DirectoryError> {
        (**self).get_event(event_id).await
    }

    async fn get_tenant(&self, tenant_id: TenantId) -> Result<Option<Tenant>, DirectoryError> {
        (**self).get_tenant(tenant_id).await
    }

    async fn get_patient(
        &self,
        tenant_id: TenantId,
        patient_id: PatientId,
    ) -> Result<Option<Patient>, DirectoryError> {
        (**self).get_patient(tenant_id, patient_id).await
    }

    async fn get_provider(
        &self,
        tenant_id: TenantId,
        provider_id: ProviderId,
    ) -> Result<Option<Provider>, DirectoryError> {
        (**self).get_provider(tenant_id, provider_id).await
    }

    async fn get_print_layout(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<PrintLayout>, DirectoryError> {
        (**self).get_print_layout(tenant_id).await
    }
}
