//! Per-tenant invoice number allocation.
//!
//! The allocator is the only writer of a tenant's sequence record. Every call to
//! `allocate` consumes exactly one number; a number that is handed out is never
//! handed out again, even if the bill it was meant for is never stored.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use clinicbill_billing::InvoiceNumber;
use clinicbill_core::TenantId;

pub use in_memory::InMemoryInvoiceSequence;
pub use postgres::PostgresInvoiceSequence;

#[derive(Debug, Error)]
pub enum SequenceError {
    /// The tenant's sequence record could not be created atomically with the
    /// allocation.
    #[error("invoice sequence not initialized for tenant {0}")]
    NotInitialized(TenantId),

    #[error("sequence storage unavailable: {0}")]
    StorageUnavailable(String),
}

#[async_trait]
pub trait InvoiceSequenceAllocator: Send + Sync {
    /// Atomically hand out the tenant's next invoice number.
    ///
    /// A missing sequence record is created at `1` as part of the same atomic
    /// step. Concurrent callers never observe the same number.
    async fn allocate(&self, tenant_id: TenantId) -> Result<InvoiceNumber, SequenceError>;

    /// The number the next `allocate` would return (read-only; for audits).
    async fn peek_next(&self, tenant_id: TenantId) -> Result<InvoiceNumber, SequenceError>;
}

#[async_trait]
impl<S> InvoiceSequenceAllocator for Arc<S>
where
    S: InvoiceSequenceAllocator + ?Sized,
{
    async fn allocate(&self, tenant_id: TenantId) -> Result<InvoiceNumber, SequenceError> {
        (**self).allocate(tenant_id).await
    }

    async fn peek_next(&self, tenant_id: TenantId) -> Result<InvoiceNumber, SequenceError> {
        (**self).peek_next(tenant_id).await
    }
}
