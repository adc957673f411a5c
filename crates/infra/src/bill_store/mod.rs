//! Append-only bill persistence.
//!
//! There is no update or delete operation: a stored bill's
//! financial fields never change. Corrections are new bills.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use clinicbill_billing::{BillDocument, InvoiceNumber};
use clinicbill_core::{BillId, TenantId};

pub use in_memory::InMemoryBillRepository;
pub use postgres::PostgresBillRepository;

/// A persisted bill: the untouched document plus its storage identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBill {
    pub bill_id: BillId,
    pub stored_at: DateTime<Utc>,
    pub document: BillDocument,
}

impl StoredBill {
    pub fn tenant_id(&self) -> TenantId {
        self.document.tenant_id()
    }

    pub fn invoice_number(&self) -> InvoiceNumber {
        self.document.invoice_number()
    }
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("bill storage unavailable: {0}")]
    Unavailable(String),

    /// Another bill already carries this tenant's invoice number.
    #[error("invoice number {invoice_number} already used for tenant {tenant_id}")]
    DuplicateInvoiceNumber {
        tenant_id: TenantId,
        invoice_number: InvoiceNumber,
    },

    #[error("corrupt bill record: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait BillRepository: Send + Sync {
    /// Persist a new bill, assigning its storage identity.
    async fn save(&self, document: BillDocument) -> Result<StoredBill, RepositoryError>;

    async fn find_by_id(&self, bill_id: BillId) -> Result<Option<StoredBill>, RepositoryError>;

    /// All bills of a tenant, ordered by invoice number.
    async fn find_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<StoredBill>, RepositoryError>;

    async fn find_by_invoice_number(
        &self,
        tenant_id: TenantId,
        invoice_number: InvoiceNumber,
    ) -> Result<Option<StoredBill>, RepositoryError>;
}

#[async_trait]
impl<S> BillRepository for Arc<S>
where
    S: BillRepository + ?Sized,
{
    async fn save(&self, document: BillDocument) -> Result<StoredBill, RepositoryError> {
        (**self).save(document).await
    }

    async fn find_by_id(&self, bill_id: BillId) -> Result<Option<StoredBill>, RepositoryError> {
        (**self).find_by_id(bill_id).await
    }

    async fn find_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<StoredBill>, RepositoryError> {
        (**self).find_by_tenant(tenant_id).await
    }

    async fn find_by_invoice_number(
        &self,
        tenant_id: TenantId,
        invoice_number: InvoiceNumber,
    ) -> Result<Option<StoredBill>, RepositoryError> {
        (**self).find_by_invoice_number(tenant_id, invoice_number).await
    }
}
