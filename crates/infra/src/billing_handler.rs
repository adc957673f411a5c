//! Bill generation pipeline (application-level orchestration).
//!
//! ```text
//! GenerateBill
//!   ↓
//! Validating  resolve event, clinic, patient, doctor, print layout
//!   ↓
//! Computing   base fee / discount / tax → amounts
//!   ↓
//! Allocating  next invoice number for the clinic   (number consumed from here on)
//!   ↓
//! Building    immutable snapshot document
//!   ↓
//! Persisting  append to the bill repository
//!   ↓
//! Done        stored bill + print layout
//! ```
//!
//! Any stage can fail. Failures before `Allocating` have no side effects.
//! Failures after it leave the allocated number unused: that gap is permanent
//! and is reported on the error (and in the logs) for reconciliation, never
//! refilled.
//!
//! Generating twice for the same event is not deduplicated: each call produces
//! a new bill with a new number.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use clinicbill_billing::{self as billing, BillSources, InvoiceNumber, PrintLayout};
use clinicbill_core::{DomainError, EventId, TenantId};

use crate::audit::{self, AuditError, SequenceAudit};
use crate::bill_store::{BillRepository, RepositoryError, StoredBill};
use crate::directory::{DirectoryError, ReferenceDirectory};
use crate::sequence::{InvoiceSequenceAllocator, SequenceError};

/// Request to bill one clinical event.
///
/// Discount and tax rate are supplied per request; nothing here assumes a
/// clinic-wide policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateBill {
    /// Tenant the caller acts for; events of other tenants are not found.
    pub tenant_id: TenantId,
    pub event_id: EventId,
    pub discount: Decimal,
    /// Fraction, e.g. `0.18`.
    pub tax_rate: Decimal,
}

/// Successful outcome: the stored bill and the layout needed to print it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedBill {
    pub bill: StoredBill,
    pub print_layout: PrintLayout,
}

/// Pipeline stage, reported with every failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingStage {
    Validating,
    Computing,
    Allocating,
    Building,
    Persisting,
    Done,
}

impl BillingStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingStage::Validating => "validating",
            BillingStage::Computing => "computing",
            BillingStage::Allocating => "allocating",
            BillingStage::Building => "building",
            BillingStage::Persisting => "persisting",
            BillingStage::Done => "done",
        }
    }
}

impl std::fmt::Display for BillingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a billing request failed.
#[derive(Debug, Error)]
pub enum BillingFailure {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error(transparent)]
    Sequence(SequenceError),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("persist error: {0}")]
    Persist(RepositoryError),
}

impl BillingFailure {
    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            BillingFailure::NotFound { .. } => "not_found",
            BillingFailure::InvalidAmount(_) => "invalid_amount",
            BillingFailure::Sequence(SequenceError::NotInitialized(_)) => "sequence_not_initialized",
            BillingFailure::Sequence(SequenceError::StorageUnavailable(_)) => "storage_unavailable",
            BillingFailure::StorageUnavailable(_) => "storage_unavailable",
            BillingFailure::Snapshot(_) => "snapshot_error",
            BillingFailure::Persist(_) => "persist_error",
        }
    }
}

/// Terminal `Failed` state of the pipeline.
#[derive(Debug, Error)]
#[error("bill generation failed while {stage}: {reason}")]
pub struct GenerateBillError {
    pub stage: BillingStage,
    /// Invoice number consumed by this request but never attached to a bill.
    pub orphaned_invoice_number: Option<InvoiceNumber>,
    pub reason: BillingFailure,
}

impl GenerateBillError {
    fn new(stage: BillingStage, reason: BillingFailure) -> Self {
        Self {
            stage,
            orphaned_invoice_number: None,
            reason,
        }
    }

    fn orphaning(mut self, number: InvoiceNumber) -> Self {
        self.orphaned_invoice_number = Some(number);
        self
    }

    pub fn kind(&self) -> &'static str {
        self.reason.kind()
    }
}

fn not_found(entity: &'static str, id: impl ToString) -> GenerateBillError {
    GenerateBillError::new(
        BillingStage::Validating,
        BillingFailure::NotFound {
            entity,
            id: id.to_string(),
        },
    )
}

fn directory_failure(err: DirectoryError) -> GenerateBillError {
    GenerateBillError::new(
        BillingStage::Validating,
        BillingFailure::StorageUnavailable(err.to_string()),
    )
}

fn domain_failure(stage: BillingStage, err: DomainError) -> GenerateBillError {
    let reason = match (stage, err) {
        (BillingStage::Computing, DomainError::InvalidAmount(msg)) => BillingFailure::InvalidAmount(msg),
        (_, other) => BillingFailure::Snapshot(other.to_string()),
    };
    GenerateBillError::new(stage, reason)
}

/// Reusable bill generation engine.
///
/// Composes the directory, the sequence allocator and the bill repository; it
/// holds no state of its own, so one instance serves all tenants concurrently.
#[derive(Debug)]
pub struct BillingHandler<D, A, R> {
    directory: D,
    allocator: A,
    bills: R,
}

impl<D, A, R> BillingHandler<D, A, R>
where
    D: ReferenceDirectory,
    A: InvoiceSequenceAllocator,
    R: BillRepository,
{
    pub fn new(directory: D, allocator: A, bills: R) -> Self {
        Self {
            directory,
            allocator,
            bills,
        }
    }

    pub fn bills(&self) -> &R {
        &self.bills
    }

    /// Run the full pipeline for one request.
    #[instrument(
        skip(self, request),
        fields(tenant_id = %request.tenant_id, event_id = %request.event_id),
        err
    )]
    pub async fn generate_bill(&self, request: GenerateBill) -> Result<GeneratedBill, GenerateBillError> {
        // Validating
        let event = self
            .directory
            .get_event(request.event_id)
            .await
            .map_err(directory_failure)?
            .filter(|e| e.tenant_id == request.tenant_id)
            .ok_or_else(|| not_found("billable event", request.event_id))?;
        let tenant_id = event.tenant_id;

        let tenant = self
            .directory
            .get_tenant(tenant_id)
            .await
            .map_err(directory_failure)?
            .ok_or_else(|| not_found("tenant", tenant_id))?;
        let patient = self
            .directory
            .get_patient(tenant_id, event.patient_id)
            .await
            .map_err(directory_failure)?
            .ok_or_else(|| not_found("patient", event.patient_id))?;
        let provider = self
            .directory
            .get_provider(tenant_id, event.provider_id)
            .await
            .map_err(directory_failure)?
            .ok_or_else(|| not_found("provider", event.provider_id))?;
        let print_layout = self
            .directory
            .get_print_layout(tenant_id)
            .await
            .map_err(directory_failure)?
            .ok_or_else(|| not_found("print layout", tenant_id))?;

        // Computing
        let amounts = billing::compute(
            event.base_fee(&provider).amount(),
            request.discount,
            request.tax_rate,
        )
        .map_err(|e| domain_failure(BillingStage::Computing, e))?;

        // Allocating
        let invoice_number = self
            .allocator
            .allocate(tenant_id)
            .await
            .map_err(|e| GenerateBillError::new(BillingStage::Allocating, BillingFailure::Sequence(e)))?;

        // Building
        let sources = BillSources {
            event: Some(&event),
            tenant: Some(&tenant),
            patient: Some(&patient),
            provider: Some(&provider),
            print_layout: Some(&print_layout),
        };
        let document = billing::build(sources, amounts, invoice_number, Utc::now()).map_err(|e| {
            let err = domain_failure(BillingStage::Building, e).orphaning(invoice_number);
            warn!(%tenant_id, %invoice_number, error = %err, "invoice number orphaned");
            err
        })?;

        // Persisting
        let bill = self.bills.save(document).await.map_err(|e| {
            let err = GenerateBillError::new(BillingStage::Persisting, BillingFailure::Persist(e))
                .orphaning(invoice_number);
            warn!(%tenant_id, %invoice_number, error = %err, "invoice number orphaned");
            err
        })?;

        info!(
            %tenant_id,
            %invoice_number,
            bill_id = %bill.bill_id,
            payable = %amounts.payable,
            "bill issued"
        );

        Ok(GeneratedBill { bill, print_layout })
    }

    /// Numbers consumed by the tenant's sequence that have no stored bill.
    pub async fn sequence_audit(&self, tenant_id: TenantId) -> Result<SequenceAudit, AuditError> {
        audit::sequence_gaps(&self.allocator, &self.bills, tenant_id).await
    }
}
