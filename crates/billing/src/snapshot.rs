//! Bill snapshot builder.
//!
//! Resolves every upstream record exactly once and copies the printable fields
//! into a `BillDocument`. Either a complete document comes out, or a
//! `MissingReference` error; partial bills are never produced.

use chrono::{DateTime, Utc};

use clinicbill_core::{DomainError, DomainResult};

use crate::bill::{
    BillDocument, InvoiceNumber, PatientSnapshot, PrintLayoutSnapshot, ProviderSnapshot,
    TenantSnapshot,
};
use crate::calculator::Amounts;
use crate::records::{BillableEvent, Patient, PrintLayout, Provider, Tenant};

/// Upstream records as resolved from the directories (`None` = not found).
#[derive(Debug, Clone, Copy, Default)]
pub struct BillSources<'a> {
    pub event: Option<&'a BillableEvent>,
    pub tenant: Option<&'a Tenant>,
    pub patient: Option<&'a Patient>,
    pub provider: Option<&'a Provider>,
    pub print_layout: Option<&'a PrintLayout>,
}

fn require<'a, T>(value: Option<&'a T>, what: &str) -> DomainResult<&'a T> {
    value.ok_or_else(|| DomainError::missing_reference(format!("{what} could not be resolved")))
}

fn require_text(value: &str, field: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::missing_reference(format!("{field} is empty")));
    }
    Ok(())
}

/// Build the immutable bill document.
pub fn build(
    sources: BillSources<'_>,
    amounts: Amounts,
    invoice_number: InvoiceNumber,
    issued_at: DateTime<Utc>,
) -> DomainResult<BillDocument> {
    let event = require(sources.event, "billable event")?;
    let tenant = require(sources.tenant, "tenant")?;
    let patient = require(sources.patient, "patient")?;
    let provider = require(sources.provider, "provider")?;
    let layout = require(sources.print_layout, "print layout")?;

    if tenant.id != event.tenant_id {
        return Err(DomainError::missing_reference(format!(
            "tenant {} does not own event {}",
            tenant.id, event.id
        )));
    }
    if patient.id != event.patient_id || patient.tenant_id != event.tenant_id {
        return Err(DomainError::missing_reference(format!(
            "patient {} is not the patient of event {}",
            patient.id, event.id
        )));
    }
    if provider.id != event.provider_id || provider.tenant_id != event.tenant_id {
        return Err(DomainError::missing_reference(format!(
            "provider {} is not the provider of event {}",
            provider.id, event.id
        )));
    }
    if layout.tenant_id != event.tenant_id {
        return Err(DomainError::missing_reference(format!(
            "print layout does not belong to tenant {}",
            event.tenant_id
        )));
    }

    require_text(&tenant.name, "tenant.name")?;
    require_text(&patient.name, "patient.name")?;
    require_text(&provider.name, "provider.name")?;
    require_text(&layout.paper_size, "print_layout.paper_size")?;

    Ok(BillDocument::assemble(
        invoice_number,
        issued_at,
        event.id,
        event.kind,
        TenantSnapshot::from(tenant),
        PatientSnapshot::from(patient),
        ProviderSnapshot::from(provider),
        PrintLayoutSnapshot::from(layout),
        amounts,
    ))
}
