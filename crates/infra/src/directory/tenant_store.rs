use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

use clinicbill_core::TenantId;

use super::DirectoryError;

/// Tenant-isolated key/value store abstraction.
///
/// Every lookup is scoped by tenant: a key that exists under another tenant is
/// simply not found.
pub trait TenantStore<K, V>: Send + Sync {
    fn get(&self, tenant_id: TenantId, key: &K) -> Result<Option<V>, DirectoryError>;
    fn upsert(&self, tenant_id: TenantId, key: K, value: V) -> Result<(), DirectoryError>;
}

/// In-memory tenant-isolated store for tests/dev.
#[derive(Debug)]
pub struct InMemoryTenantStore<K, V> {
    inner: RwLock<HashMap<(TenantId, K), V>>,
}

impl<K, V> InMemoryTenantStore<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryTenantStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> DirectoryError {
    DirectoryError::Unavailable("lock poisoned".to_string())
}

impl<K, V> TenantStore<K, V> for InMemoryTenantStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, tenant_id: TenantId, key: &K) -> Result<Option<V>, DirectoryError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(&(tenant_id, key.clone())).cloned())
    }

    fn upsert(&self, tenant_id: TenantId, key: K, value: V) -> Result<(), DirectoryError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.insert((tenant_id, key), value);
        Ok(())
    }
}
