use std::sync::Arc;

use clinicbill_billing::InvoiceNumber;
use clinicbill_core::{BillId, TenantId};
use clinicbill_infra::{
    audit::{AuditError, SequenceAudit},
    bill_store::{BillRepository, InMemoryBillRepository, RepositoryError, StoredBill},
    directory::{DirectorySeed, InMemoryDirectory},
    sequence::InMemoryInvoiceSequence,
    BillingHandler, GenerateBill, GenerateBillError, GeneratedBill,
};

#[cfg(feature = "postgres")]
use clinicbill_infra::{
    bill_store::PostgresBillRepository, db, directory::PostgresDirectory,
    sequence::PostgresInvoiceSequence,
};

use crate::config::ApiConfig;

type InMemoryHandler = BillingHandler<
    Arc<InMemoryDirectory>,
    Arc<InMemoryInvoiceSequence>,
    Arc<InMemoryBillRepository>,
>;

#[cfg(feature = "postgres")]
type PersistentHandler = BillingHandler<
    Arc<PostgresDirectory>,
    Arc<PostgresInvoiceSequence>,
    Arc<PostgresBillRepository>,
>;

#[derive(Clone)]
pub enum AppServices {
    InMemory {
        handler: Arc<InMemoryHandler>,
        directory: Arc<InMemoryDirectory>,
    },
    #[cfg(feature = "postgres")]
    Persistent { handler: Arc<PersistentHandler> },
}

pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    if config.use_persistent_stores {
        #[cfg(feature = "postgres")]
        {
            return build_persistent_services(config).await;
        }
        #[cfg(not(feature = "postgres"))]
        {
            tracing::warn!(
                "USE_PERSISTENT_STORES=true but postgres feature not enabled, falling back to in-memory"
            );
        }
    }

    let seed = match &config.seed_file {
        Some(path) => {
            let seed = DirectorySeed::from_file(path)?;
            tracing::info!(
                path = %path.display(),
                tenants = seed.tenants.len(),
                events = seed.events.len(),
                "directory seeded"
            );
            seed
        }
        None => DirectorySeed::default(),
    };

    Ok(build_in_memory_services(seed)?)
}

/// In-memory wiring (dev/test): directory seeded from fixtures, in-memory
/// sequence and bill store.
pub fn build_in_memory_services(
    seed: DirectorySeed,
) -> Result<AppServices, clinicbill_infra::directory::DirectoryError> {
    let directory = Arc::new(InMemoryDirectory::from_seed(seed)?);
    let handler = BillingHandler::new(
        directory.clone(),
        Arc::new(InMemoryInvoiceSequence::new()),
        Arc::new(InMemoryBillRepository::new()),
    );

    Ok(AppServices::InMemory {
        handler: Arc::new(handler),
        directory,
    })
}

#[cfg(feature = "postgres")]
async fn build_persistent_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    let database_url = config
        .database_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set when USE_PERSISTENT_STORES=true"))?;

    let pool = db::connect(database_url, config.db_max_connections).await?;
    db::ensure_schema(&pool).await?;
    tracing::info!("connected to postgres, schema ensured");

    let handler = BillingHandler::new(
        Arc::new(PostgresDirectory::new(pool.clone())),
        Arc::new(PostgresInvoiceSequence::new(pool.clone())),
        Arc::new(PostgresBillRepository::new(pool)),
    );

    Ok(AppServices::Persistent {
        handler: Arc::new(handler),
    })
}

impl AppServices {
    /// Directory handle for the in-memory wiring (`None` when persistent).
    pub fn in_memory_directory(&self) -> Option<&Arc<InMemoryDirectory>> {
        match self {
            AppServices::InMemory { directory, .. } => Some(directory),
            #[cfg(feature = "postgres")]
            AppServices::Persistent { .. } => None,
        }
    }

    pub async fn generate_bill(&self, request: GenerateBill) -> Result<GeneratedBill, GenerateBillError> {
        match self {
            AppServices::InMemory { handler, .. } => handler.generate_bill(request).await,
            #[cfg(feature = "postgres")]
            AppServices::Persistent { handler } => handler.generate_bill(request).await,
        }
    }

    pub async fn list_bills(&self, tenant_id: TenantId) -> Result<Vec<StoredBill>, RepositoryError> {
        match self {
            AppServices::InMemory { handler, .. } => handler.bills().find_by_tenant(tenant_id).await,
            #[cfg(feature = "postgres")]
            AppServices::Persistent { handler } => handler.bills().find_by_tenant(tenant_id).await,
        }
    }

    /// Bill by id, only if it belongs to `tenant_id`.
    pub async fn get_bill(
        &self,
        tenant_id: TenantId,
        bill_id: BillId,
    ) -> Result<Option<StoredBill>, RepositoryError> {
        let bill = match self {
            AppServices::InMemory { handler, .. } => handler.bills().find_by_id(bill_id).await?,
            #[cfg(feature = "postgres")]
            AppServices::Persistent { handler } => handler.bills().find_by_id(bill_id).await?,
        };
        Ok(bill.filter(|b| b.tenant_id() == tenant_id))
    }

    pub async fn get_bill_by_number(
        &self,
        tenant_id: TenantId,
        invoice_number: InvoiceNumber,
    ) -> Result<Option<StoredBill>, RepositoryError> {
        match self {
            AppServices::InMemory { handler, .. } => {
                handler.bills().find_by_invoice_number(tenant_id, invoice_number).await
            }
            #[cfg(feature = "postgres")]
            AppServices::Persistent { handler } => {
                handler.bills().find_by_invoice_number(tenant_id, invoice_number).await
            }
        }
    }

    pub async fn sequence_audit(&self, tenant_id: TenantId) -> Result<SequenceAudit, AuditError> {
        match self {
            AppServices::InMemory { handler, .. } => handler.sequence_audit(tenant_id).await,
            #[cfg(feature = "postgres")]
            AppServices::Persistent { handler } => handler.sequence_audit(tenant_id).await,
        }
    }
}
