use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use clinicbill_billing::InvoiceNumber;
use clinicbill_core::TenantId;

use super::{InvoiceSequenceAllocator, SequenceError};

/// In-memory invoice sequences for tests/dev.
///
/// Lookup, lazy creation and increment all happen under a single guard, so
/// there is no window between reading the current number and writing the next.
#[derive(Debug, Default)]
pub struct InMemoryInvoiceSequence {
    next: Mutex<HashMap<TenantId, u64>>,
}

impl InMemoryInvoiceSequence {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> SequenceError {
    SequenceError::StorageUnavailable("lock poisoned".to_string())
}

#[async_trait]
impl InvoiceSequenceAllocator for InMemoryInvoiceSequence {
    async fn allocate(&self, tenant_id: TenantId) -> Result<InvoiceNumber, SequenceError> {
        let mut next = self.next.lock().map_err(|_| poisoned())?;
        let slot = next.entry(tenant_id).or_insert(InvoiceNumber::FIRST.value());
        let allocated = *slot;
        *slot = allocated
            .checked_add(1)
            .ok_or_else(|| SequenceError::StorageUnavailable("invoice sequence exhausted".to_string()))?;
        Ok(InvoiceNumber::new(allocated))
    }

    async fn peek_next(&self, tenant_id: TenantId) -> Result<InvoiceNumber, SequenceError> {
        let next = self.next.lock().map_err(|_| poisoned())?;
        Ok(InvoiceNumber::new(
            next.get(&tenant_id).copied().unwrap_or(InvoiceNumber::FIRST.value()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn first_allocation_starts_at_one() {
        let seq = InMemoryInvoiceSequence::new();
        let tenant = TenantId::new();

        assert_eq!(seq.peek_next(tenant).await.unwrap(), InvoiceNumber::FIRST);
        assert_eq!(seq.allocate(tenant).await.unwrap(), InvoiceNumber::new(1));
        assert_eq!(seq.allocate(tenant).await.unwrap(), InvoiceNumber::new(2));
        assert_eq!(seq.peek_next(tenant).await.unwrap(), InvoiceNumber::new(3));
    }

    #[tokio::test]
    async fn tenants_have_independent_sequences() {
        let seq = InMemoryInvoiceSequence::new();
        let a = TenantId::new();
        let b = TenantId::new();

        seq.allocate(a).await.unwrap();
        seq.allocate(a).await.unwrap();

        assert_eq!(seq.allocate(b).await.unwrap(), InvoiceNumber::FIRST);
        assert_eq!(seq.allocate(a).await.unwrap(), InvoiceNumber::new(3));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_allocations_are_unique_and_dense() {
        const CALLS: u64 = 500;

        let seq = Arc::new(InMemoryInvoiceSequence::new());
        let tenant = TenantId::new();

        let handles: Vec<_> = (0..CALLS)
            .map(|_| {
                let seq = seq.clone();
                tokio::spawn(async move { seq.allocate(tenant).await.unwrap() })
            })
            .collect();

        let mut seen = HashSet::new();
        for h in handles {
            assert!(seen.insert(h.await.unwrap().value()), "duplicate invoice number");
        }

        assert_eq!(seen.len() as u64, CALLS);
        assert_eq!(seen, (1..=CALLS).collect::<HashSet<_>>());
    }
}
