//! Sequence gap audit.
//!
//! Gaps are the numbers a tenant's sequence handed out that never ended up on a
//! stored bill (failed builds/persists). They are reported, not repaired.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

use clinicbill_billing::InvoiceNumber;
use clinicbill_core::TenantId;

use crate::bill_store::{BillRepository, RepositoryError};
use crate::sequence::{InvoiceSequenceAllocator, SequenceError};

/// Result of comparing a tenant's sequence with its stored bills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceAudit {
    pub tenant_id: TenantId,
    /// Number the next allocation would return.
    pub next_number: InvoiceNumber,
    /// Bills stored for the tenant.
    pub issued: u64,
    /// Allocated numbers with no stored bill, ascending.
    pub gaps: Vec<InvoiceNumber>,
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Compute the gap report for one tenant.
#[instrument(skip(allocator, bills), fields(tenant_id = %tenant_id), err)]
pub async fn sequence_gaps<A, R>(
    allocator: &A,
    bills: &R,
    tenant_id: TenantId,
) -> Result<SequenceAudit, AuditError>
where
    A: InvoiceSequenceAllocator + ?Sized,
    R: BillRepository + ?Sized,
{
    // Read the bills first: a bill stored between the two reads then shows up
    // as a gap rather than a number beyond `next_number`.
    let stored = bills.find_by_tenant(tenant_id).await?;
    let next_number = allocator.peek_next(tenant_id).await?;

    let mut issued = stored.iter().map(|b| b.invoice_number().value()).peekable();
    let mut gaps = Vec::new();
    for n in InvoiceNumber::FIRST.value()..next_number.value() {
        while issued.next_if(|&v| v < n).is_some() {}
        if issued.next_if_eq(&n).is_none() {
            gaps.push(InvoiceNumber::new(n));
        }
    }

    debug!(issued = stored.len(), gaps = gaps.len(), "sequence audited");

    Ok(SequenceAudit {
        tenant_id,
        next_number,
        issued: stored.len() as u64,
        gaps,
    })
}
