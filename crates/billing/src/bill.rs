//! Bill document: the immutable snapshot a clinic prints and archives.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use clinicbill_core::{EventId, Money, PatientId, ProviderId, TenantId};

use crate::calculator::Amounts;
use crate::records::{EventKind, Patient, PrintLayout, Provider, Tenant};

/// Invoice number allocated from a tenant's sequence (starts at 1).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceNumber(u64);

impl InvoiceNumber {
    pub const FIRST: InvoiceNumber = InvoiceNumber(1);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Clinic fields as printed on the bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantSnapshot {
    pub tenant_id: TenantId,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: Option<String>,
    pub registration_no: Option<String>,
}

impl From<&Tenant> for TenantSnapshot {
    fn from(t: &Tenant) -> Self {
        Self {
            tenant_id: t.id,
            name: t.name.clone(),
            address: t.address.clone(),
            phone: t.phone.clone(),
            email: t.email.clone(),
            registration_no: t.registration_no.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientSnapshot {
    pub patient_id: PatientId,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
}

impl From<&Patient> for PatientSnapshot {
    fn from(p: &Patient) -> Self {
        Self {
            patient_id: p.id,
            name: p.name.clone(),
            address: p.address.clone(),
            phone: p.phone.clone(),
            date_of_birth: p.date_of_birth,
            gender: p.gender.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSnapshot {
    pub provider_id: ProviderId,
    pub name: String,
    pub specialization: String,
    pub phone: String,
    pub registration_no: Option<String>,
    /// Provider fee at billing time (the billed base may come from the event).
    pub consultation_fee: Money,
}

impl From<&Provider> for ProviderSnapshot {
    fn from(p: &Provider) -> Self {
        Self {
            provider_id: p.id,
            name: p.name.clone(),
            specialization: p.specialization.clone(),
            phone: p.phone.clone(),
            registration_no: p.registration_no.clone(),
            consultation_fee: p.consultation_fee,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintLayoutSnapshot {
    pub paper_size: String,
    pub header: Option<String>,
    pub footer: Option<String>,
    pub margin_mm: u32,
    pub show_tax_breakdown: bool,
    pub show_provider_signature: bool,
}

impl From<&PrintLayout> for PrintLayoutSnapshot {
    fn from(l: &PrintLayout) -> Self {
        Self {
            paper_size: l.paper_size.clone(),
            header: l.header.clone(),
            footer: l.footer.clone(),
            margin_mm: l.margin_mm,
            show_tax_breakdown: l.show_tax_breakdown,
            show_provider_signature: l.show_provider_signature,
        }
    }
}

/// Immutable bill document.
///
/// Owns deep copies of every referenced record; nothing here points back at a
/// live entity except the ids kept for traceability. Fields are private and
/// there are no setters: a bill is never edited after it is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillDocument {
    invoice_number: InvoiceNumber,
    issued_at: DateTime<Utc>,
    source_event_id: EventId,
    event_kind: EventKind,
    tenant: TenantSnapshot,
    patient: PatientSnapshot,
    provider: ProviderSnapshot,
    print_layout: PrintLayoutSnapshot,
    amounts: Amounts,
}

impl BillDocument {
    // Only the snapshot builder assembles documents.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        invoice_number: InvoiceNumber,
        issued_at: DateTime<Utc>,
        source_event_id: EventId,
        event_kind: EventKind,
        tenant: TenantSnapshot,
        patient: PatientSnapshot,
        provider: ProviderSnapshot,
        print_layout: PrintLayoutSnapshot,
        amounts: Amounts,
    ) -> Self {
        Self {
            invoice_number,
            issued_at,
            source_event_id,
            event_kind,
            tenant,
            patient,
            provider,
            print_layout,
            amounts,
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant.tenant_id
    }

    pub fn invoice_number(&self) -> InvoiceNumber {
        self.invoice_number
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn source_event_id(&self) -> EventId {
        self.source_event_id
    }

    pub fn event_kind(&self) -> EventKind {
        self.event_kind
    }

    pub fn tenant(&self) -> &TenantSnapshot {
        &self.tenant
    }

    pub fn patient(&self) -> &PatientSnapshot {
        &self.patient
    }

    pub fn provider(&self) -> &ProviderSnapshot {
        &self.provider
    }

    pub fn print_layout(&self) -> &PrintLayoutSnapshot {
        &self.print_layout
    }

    pub fn amounts(&self) -> &Amounts {
        &self.amounts
    }
}
