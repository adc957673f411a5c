use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use clinicbill_billing::{InvoiceNumber, PrintLayout};
use clinicbill_core::EventId;
use clinicbill_infra::audit::SequenceAudit;
use clinicbill_infra::bill_store::StoredBill;
use clinicbill_infra::{GenerateBill, GeneratedBill};

use crate::context::TenantContext;

// -------------------------
// Request DTOs
// -------------------------

/// Body of `POST /bills/generate`.
///
/// Amounts are decimal strings or numbers (`"100.00"`, `0.18`); missing values
/// mean zero.
#[derive(Debug, Deserialize)]
pub struct GenerateBillRequest {
    pub event_id: EventId,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub tax_rate: Decimal,
}

impl GenerateBillRequest {
    pub fn into_command(self, tenant: TenantContext) -> GenerateBill {
        GenerateBill {
            tenant_id: tenant.tenant_id(),
            event_id: self.event_id,
            discount: self.discount,
            tax_rate: self.tax_rate,
        }
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct GeneratedBillResponse {
    pub bill: StoredBill,
    pub print_layout: PrintLayout,
}

impl From<GeneratedBill> for GeneratedBillResponse {
    fn from(g: GeneratedBill) -> Self {
        Self {
            bill: g.bill,
            print_layout: g.print_layout,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BillListResponse {
    pub count: usize,
    pub bills: Vec<StoredBill>,
}

#[derive(Debug, Serialize)]
pub struct SequenceGapsResponse {
    pub next_number: InvoiceNumber,
    pub issued: u64,
    pub gaps: Vec<InvoiceNumber>,
}

impl From<SequenceAudit> for SequenceGapsResponse {
    fn from(a: SequenceAudit) -> Self {
        Self {
            next_number: a.next_number,
            issued: a.issued,
            gaps: a.gaps,
        }
    }
}
