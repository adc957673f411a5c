//! Billing domain module.
//!
//! Business rules for turning a billable clinical event into an immutable bill:
//! the monetary calculator, the bill document and its snapshots, and the
//! snapshot builder. Deterministic domain logic only (no IO, no HTTP, no
//! storage); sequencing and persistence live in `clinicbill-infra`.

pub mod bill;
pub mod calculator;
pub mod records;
pub mod snapshot;

pub use bill::{
    BillDocument, InvoiceNumber, PatientSnapshot, PrintLayoutSnapshot, ProviderSnapshot,
    TenantSnapshot,
};
pub use calculator::{compute, Amounts};
pub use records::{BillableEvent, EventKind, Patient, PrintLayout, Provider, Tenant};
pub use snapshot::{build, BillSources};
