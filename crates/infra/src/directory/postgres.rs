//! Postgres-backed reference directory.
//!
//! Reads the application's own tables. Every patient/provider/layout query is
//! keyed by `tenant_id`, so cross-tenant reads are impossible by construction.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use clinicbill_billing::{BillableEvent, EventKind, Patient, PrintLayout, Provider, Tenant};
use clinicbill_core::{EventId, Money, PatientId, ProviderId, TenantId};

use super::{DirectoryError, ReferenceDirectory};
use crate::db::is_unavailable;

#[derive(Debug, Clone)]
pub struct PostgresDirectory {
    pool: Arc<PgPool>,
}

impl PostgresDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> DirectoryError {
    if is_unavailable(&err) {
        DirectoryError::Unavailable(format!("{operation}: {err}"))
    } else {
        DirectoryError::Corrupt(format!("{operation}: {err}"))
    }
}

fn corrupt(operation: &str) -> impl Fn(sqlx::Error) -> DirectoryError + '_ {
    move |e| DirectoryError::Corrupt(format!("{operation}: {e}"))
}

fn parse_event_kind(s: &str) -> Result<EventKind, DirectoryError> {
    match s {
        "appointment" => Ok(EventKind::Appointment),
        "admission" => Ok(EventKind::Admission),
        "prescription" => Ok(EventKind::Prescription),
        other => Err(DirectoryError::Corrupt(format!("unknown event kind '{other}'"))),
    }
}

fn event_from_row(row: &PgRow) -> Result<BillableEvent, DirectoryError> {
    let map = corrupt("billable_events row");
    let kind: String = row.try_get("kind").map_err(&map)?;
    Ok(BillableEvent {
        id: EventId::from_uuid(row.try_get::<Uuid, _>("event_id").map_err(&map)?),
        tenant_id: TenantId::from_uuid(row.try_get::<Uuid, _>("tenant_id").map_err(&map)?),
        patient_id: PatientId::from_uuid(row.try_get::<Uuid, _>("patient_id").map_err(&map)?),
        provider_id: ProviderId::from_uuid(row.try_get::<Uuid, _>("provider_id").map_err(&map)?),
        kind: parse_event_kind(&kind)?,
        occurred_at: row.try_get::<DateTime<Utc>, _>("occurred_at").map_err(&map)?,
        fee: row
            .try_get::<Option<Decimal>, _>("fee")
            .map_err(&map)?
            .map(Money::new),
    })
}

#[async_trait]
impl ReferenceDirectory for PostgresDirectory {
    #[instrument(skip(self), fields(event_id = %event_id), err)]
    async fn get_event(&self, event_id: EventId) -> Result<Option<BillableEvent>, DirectoryError> {
        let row = sqlx::query(
            r#"
            SELECT event_id, tenant_id, patient_id, provider_id, kind, occurred_at, fee
            FROM billable_events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_event", e))?;

        row.as_ref().map(event_from_row).transpose()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    async fn get_tenant(&self, tenant_id: TenantId) -> Result<Option<Tenant>, DirectoryError> {
        let row = sqlx::query(
            r#"
            SELECT tenant_id, name, address, phone, email, registration_no
            FROM tenants
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_tenant", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let map = corrupt("tenants row");
        Ok(Some(Tenant {
            id: tenant_id,
            name: row.try_get("name").map_err(&map)?,
            address: row.try_get("address").map_err(&map)?,
            phone: row.try_get("phone").map_err(&map)?,
            email: row.try_get("email").map_err(&map)?,
            registration_no: row.try_get("registration_no").map_err(&map)?,
        }))
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, patient_id = %patient_id), err)]
    async fn get_patient(
        &self,
        tenant_id: TenantId,
        patient_id: PatientId,
    ) -> Result<Option<Patient>, DirectoryError> {
        let row = sqlx::query(
            r#"
            SELECT name, address, phone, date_of_birth, gender
            FROM patients
            WHERE tenant_id = $1 AND patient_id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(patient_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_patient", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let map = corrupt("patients row");
        Ok(Some(Patient {
            id: patient_id,
            tenant_id,
            name: row.try_get("name").map_err(&map)?,
            address: row.try_get("address").map_err(&map)?,
            phone: row.try_get("phone").map_err(&map)?,
            date_of_birth: row.try_get::<Option<NaiveDate>, _>("date_of_birth").map_err(&map)?,
            gender: row.try_get("gender").map_err(&map)?,
        }))
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, provider_id = %provider_id), err)]
    async fn get_provider(
        &self,
        tenant_id: TenantId,
        provider_id: ProviderId,
    ) -> Result<Option<Provider>, DirectoryError> {
        let row = sqlx::query(
            r#"
            SELECT name, specialization, phone, registration_no, consultation_fee
            FROM providers
            WHERE tenant_id = $1 AND provider_id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(provider_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_provider", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let map = corrupt("providers row");
        Ok(Some(Provider {
            id: provider_id,
            tenant_id,
            name: row.try_get("name").map_err(&map)?,
            specialization: row.try_get("specialization").map_err(&map)?,
            phone: row.try_get("phone").map_err(&map)?,
            registration_no: row.try_get("registration_no").map_err(&map)?,
            consultation_fee: Money::new(
                row.try_get::<Decimal, _>("consultation_fee").map_err(&map)?,
            ),
        }))
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    async fn get_print_layout(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<PrintLayout>, DirectoryError> {
        let row = sqlx::query(
            r#"
            SELECT paper_size, header, footer, margin_mm, show_tax_breakdown, show_provider_signature
            FROM print_layouts
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_print_layout", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let map = corrupt("print_layouts row");
        let margin_mm: i32 = row.try_get("margin_mm").map_err(&map)?;
        Ok(Some(PrintLayout {
            tenant_id,
            paper_size: row.try_get("paper_size").map_err(&map)?,
            header: row.try_get("header").map_err(&map)?,
            footer: row.try_get("footer").map_err(&map)?,
            margin_mm: u32::try_from(margin_mm)
                .map_err(|_| DirectoryError::Corrupt(format!("negative margin_mm {margin_mm}")))?,
            show_tax_breakdown: row.try_get("show_tax_breakdown").map_err(&map)?,
            show_provider_signature: row.try_get("show_provider_signature").map_err(&map)?,
        }))
    }
}
