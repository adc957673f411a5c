//! Postgres-backed invoice sequences.
//!
//! Allocation is one statement: an upsert that either creates the tenant's row
//! (handing out `1`) or increments it in place, returning the number it just
//! consumed. Postgres serializes concurrent upserts on the same primary key, so
//! there is no read-then-write race and no separate initialization step.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;

use clinicbill_billing::InvoiceNumber;
use clinicbill_core::TenantId;

use super::{InvoiceSequenceAllocator, SequenceError};

#[derive(Debug, Clone)]
pub struct PostgresInvoiceSequence {
    pool: Arc<PgPool>,
}

impl PostgresInvoiceSequence {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

// Any failure of the counter statement leaves the sequence untouched; callers
// only need to know no number was allocated.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> SequenceError {
    SequenceError::StorageUnavailable(format!("{operation}: {err}"))
}

fn to_invoice_number(raw: i64, tenant_id: TenantId) -> Result<InvoiceNumber, SequenceError> {
    u64::try_from(raw)
        .ok()
        .filter(|n| *n >= 1)
        .map(InvoiceNumber::new)
        .ok_or(SequenceError::NotInitialized(tenant_id))
}

#[async_trait]
impl InvoiceSequenceAllocator for PostgresInvoiceSequence {
    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    async fn allocate(&self, tenant_id: TenantId) -> Result<InvoiceNumber, SequenceError> {
        let row = sqlx::query(
            r#"
            INSERT INTO invoice_sequences (tenant_id, next_number)
            VALUES ($1, 2)
            ON CONFLICT (tenant_id)
            DO UPDATE SET
                next_number = invoice_sequences.next_number + 1,
                updated_at = NOW()
            RETURNING next_number - 1 AS allocated
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("allocate", e))?;

        let row = row.ok_or(SequenceError::NotInitialized(tenant_id))?;
        let allocated: i64 = row
            .try_get("allocated")
            .map_err(|_| SequenceError::NotInitialized(tenant_id))?;

        to_invoice_number(allocated, tenant_id)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    async fn peek_next(&self, tenant_id: TenantId) -> Result<InvoiceNumber, SequenceError> {
        let next: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT next_number FROM invoice_sequences WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("peek_next", e))?;

        match next {
            Some(raw) => to_invoice_number(raw, tenant_id),
            None => Ok(InvoiceNumber::FIRST),
        }
    }
}
