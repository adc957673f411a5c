//! Postgres-backed bill repository.
//!
//! The full document is stored as JSONB next to a few denormalized columns
//! (tenant, number, amounts) used for lookups and reporting. A trigger in the
//! schema rejects UPDATE and DELETE on `bills`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use clinicbill_billing::{BillDocument, InvoiceNumber};
use clinicbill_core::{BillId, TenantId};

use super::{BillRepository, RepositoryError, StoredBill};
use crate::db::{is_unavailable, is_unique_violation};

#[derive(Debug, Clone)]
pub struct PostgresBillRepository {
    pool: Arc<PgPool>,
}

impl PostgresBillRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    if is_unavailable(&err) {
        RepositoryError::Unavailable(format!("{operation}: {err}"))
    } else {
        RepositoryError::Corrupt(format!("{operation}: {err}"))
    }
}

fn invoice_number_to_db(n: InvoiceNumber) -> Result<i64, RepositoryError> {
    i64::try_from(n.value())
        .map_err(|_| RepositoryError::Corrupt(format!("invoice number {n} out of range")))
}

fn stored_bill_from_row(row: &PgRow) -> Result<StoredBill, RepositoryError> {
    let corrupt = |e: sqlx::Error| RepositoryError::Corrupt(format!("bills row: {e}"));
    let bill_id: Uuid = row.try_get("bill_id").map_err(corrupt)?;
    let stored_at: DateTime<Utc> = row.try_get("stored_at").map_err(corrupt)?;
    let document: JsonValue = row.try_get("document").map_err(corrupt)?;
    let document: BillDocument = serde_json::from_value(document)
        .map_err(|e| RepositoryError::Corrupt(format!("bill {bill_id} document: {e}")))?;

    Ok(StoredBill {
        bill_id: BillId::from_uuid(bill_id),
        stored_at,
        document,
    })
}

#[async_trait]
impl BillRepository for PostgresBillRepository {
    #[instrument(
        skip(self, document),
        fields(
            tenant_id = %document.tenant_id(),
            invoice_number = %document.invoice_number()
        ),
        err
    )]
    async fn save(&self, document: BillDocument) -> Result<StoredBill, RepositoryError> {
        let bill_id = BillId::new();
        let tenant_id = document.tenant_id();
        let invoice_number = document.invoice_number();
        let amounts = *document.amounts();
        let payload = serde_json::to_value(&document)
            .map_err(|e| RepositoryError::Corrupt(format!("document serialization failed: {e}")))?;

        let stored_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO bills (
                bill_id,
                tenant_id,
                invoice_number,
                source_event_id,
                issued_at,
                base,
                discount,
                tax,
                payable,
                document
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING stored_at
            "#,
        )
        .bind(bill_id.as_uuid())
        .bind(tenant_id.as_uuid())
        .bind(invoice_number_to_db(invoice_number)?)
        .bind(document.source_event_id().as_uuid())
        .bind(document.issued_at())
        .bind(Decimal::from(amounts.base))
        .bind(Decimal::from(amounts.discount))
        .bind(Decimal::from(amounts.tax))
        .bind(Decimal::from(amounts.payable))
        .bind(&payload)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepositoryError::DuplicateInvoiceNumber {
                    tenant_id,
                    invoice_number,
                }
            } else {
                map_sqlx_error("save", e)
            }
        })?;

        Ok(StoredBill {
            bill_id,
            stored_at,
            document,
        })
    }

    #[instrument(skip(self), fields(bill_id = %bill_id), err)]
    async fn find_by_id(&self, bill_id: BillId) -> Result<Option<StoredBill>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT bill_id, stored_at, document
            FROM bills
            WHERE bill_id = $1
            "#,
        )
        .bind(bill_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_id", e))?;

        row.as_ref().map(stored_bill_from_row).transpose()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    async fn find_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<StoredBill>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT bill_id, stored_at, document
            FROM bills
            WHERE tenant_id = $1
            ORDER BY invoice_number ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_tenant", e))?;

        rows.iter().map(stored_bill_from_row).collect()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, invoice_number = %invoice_number), err)]
    async fn find_by_invoice_number(
        &self,
        tenant_id: TenantId,
        invoice_number: InvoiceNumber,
    ) -> Result<Option<StoredBill>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT bill_id, stored_at, document
            FROM bills
            WHERE tenant_id = $1 AND invoice_number = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(invoice_number_to_db(invoice_number)?)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_invoice_number", e))?;

        row.as_ref().map(stored_bill_from_row).transpose()
    }
}
