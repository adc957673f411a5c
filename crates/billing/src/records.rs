//! Live reference records owned by the surrounding hospital application.
//!
//! Billing only reads these (through the directory interfaces in the infra
//! crate). Every bill copies what it needs out of them at billing time.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use clinicbill_core::{EventId, Money, PatientId, ProviderId, TenantId};

/// Clinic / organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub address: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Tax / registration number printed on bills.
    #[serde(default)]
    pub registration_no: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub tenant_id: TenantId,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
}

/// Doctor (or other clinician) whose fee is billed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    pub tenant_id: TenantId,
    pub name: String,
    #[serde(default)]
    pub specialization: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub registration_no: Option<String>,
    pub consultation_fee: Money,
}

/// Per-clinic print settings used to render a bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintLayout {
    pub tenant_id: TenantId,
    pub paper_size: String,
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default)]
    pub footer: Option<String>,
    #[serde(default)]
    pub margin_mm: u32,
    #[serde(default = "default_true")]
    pub show_tax_breakdown: bool,
    #[serde(default)]
    pub show_provider_signature: bool,
}

fn default_true() -> bool {
    true
}

/// Kind of clinical occurrence that triggers a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Appointment,
    Admission,
    Prescription,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Appointment => "appointment",
            EventKind::Admission => "admission",
            EventKind::Prescription => "prescription",
        }
    }
}

/// A billable clinical event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillableEvent {
    pub id: EventId,
    pub tenant_id: TenantId,
    pub patient_id: PatientId,
    pub provider_id: ProviderId,
    pub kind: EventKind,
    pub occurred_at: DateTime<Utc>,
    /// Fee captured on the event itself; falls back to the provider's fee.
    #[serde(default)]
    pub fee: Option<Money>,
}

impl BillableEvent {
    /// Base fee used for billing this event.
    pub fn base_fee(&self, provider: &Provider) -> Money {
        self.fee.unwrap_or(provider.consultation_fee)
    }
}
