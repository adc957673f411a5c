use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use clinicbill_billing::{BillDocument, InvoiceNumber};
use clinicbill_core::{BillId, TenantId};

use super::{BillRepository, RepositoryError, StoredBill};

#[derive(Debug, Default)]
struct Bills {
    by_id: HashMap<BillId, StoredBill>,
    by_number: BTreeMap<(TenantId, InvoiceNumber), BillId>,
}

/// In-memory append-only bill repository.
///
/// Intended for tests/dev. Both indexes are updated under one write guard.
#[derive(Debug, Default)]
pub struct InMemoryBillRepository {
    bills: RwLock<Bills>,
}

impl InMemoryBillRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> RepositoryError {
    RepositoryError::Unavailable("lock poisoned".to_string())
}

#[async_trait]
impl BillRepository for InMemoryBillRepository {
    async fn save(&self, document: BillDocument) -> Result<StoredBill, RepositoryError> {
        let key = (document.tenant_id(), document.invoice_number());
        let mut bills = self.bills.write().map_err(|_| poisoned())?;

        if bills.by_number.contains_key(&key) {
            return Err(RepositoryError::DuplicateInvoiceNumber {
                tenant_id: key.0,
                invoice_number: key.1,
            });
        }

        let stored = StoredBill {
            bill_id: BillId::new(),
            stored_at: Utc::now(),
            document,
        };
        bills.by_number.insert(key, stored.bill_id);
        bills.by_id.insert(stored.bill_id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, bill_id: BillId) -> Result<Option<StoredBill>, RepositoryError> {
        let bills = self.bills.read().map_err(|_| poisoned())?;
        Ok(bills.by_id.get(&bill_id).cloned())
    }

    async fn find_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<StoredBill>, RepositoryError> {
        let bills = self.bills.read().map_err(|_| poisoned())?;
        Ok(bills
            .by_number
            .range((tenant_id, InvoiceNumber::new(0))..=(tenant_id, InvoiceNumber::new(u64::MAX)))
            .filter_map(|(_, id)| bills.by_id.get(id).cloned())
            .collect())
    }

    async fn find_by_invoice_number(
        &self,
        tenant_id: TenantId,
        invoice_number: InvoiceNumber,
    ) -> Result<Option<StoredBill>, RepositoryError> {
        let bills = self.bills.read().map_err(|_| poisoned())?;
        Ok(bills
            .by_number
            .get(&(tenant_id, invoice_number))
            .and_then(|id| bills.by_id.get(id).cloned()))
    }
}
