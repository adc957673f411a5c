//! Shared fixtures for infra tests: one clinic with a patient, a doctor, a
//! print layout and an appointment.

use std::sync::Arc;

use chrono::Utc;

use clinicbill_billing::{BillableEvent, EventKind, Patient, PrintLayout, Provider, Tenant};
use clinicbill_core::{EventId, Money, PatientId, ProviderId, TenantId};

use crate::bill_store::InMemoryBillRepository;
use crate::billing_handler::BillingHandler;
use crate::directory::InMemoryDirectory;
use crate::sequence::InMemoryInvoiceSequence;

pub(crate) type InMemoryHandler = BillingHandler<
    Arc<InMemoryDirectory>,
    Arc<InMemoryInvoiceSequence>,
    Arc<InMemoryBillRepository>,
>;

pub(crate) struct Clinic {
    pub tenant: Tenant,
    pub patient: Patient,
    pub provider: Provider,
    pub layout: PrintLayout,
    pub event: BillableEvent,
}

impl Clinic {
    pub fn new(name: &str) -> Self {
        let tenant_id = TenantId::new();
        let patient = Patient {
            id: PatientId::new(),
            tenant_id,
            name: "Meera Pillai".to_string(),
            address: "22 Temple Street".to_string(),
            phone: "555-0142".to_string(),
            date_of_birth: None,
            gender: Some("F".to_string()),
        };
        let provider = Provider {
            id: ProviderId::new(),
            tenant_id,
            name: "Dr. Kapoor".to_string(),
            specialization: "Cardiology".to_string(),
            phone: "555-0177".to_string(),
            registration_no: Some("MCI-2231".to_string()),
            consultation_fee: Money::from_cents(100_000),
        };
        let event = BillableEvent {
            id: EventId::new(),
            tenant_id,
            patient_id: patient.id,
            provider_id: provider.id,
            kind: EventKind::Appointment,
            occurred_at: Utc::now(),
            fee: None,
        };
        Self {
            tenant: Tenant {
                id: tenant_id,
                name: name.to_string(),
                address: "1 Main Road".to_string(),
                phone: "555-0100".to_string(),
                email: None,
                registration_no: None,
            },
            patient,
            provider,
            layout: PrintLayout {
                tenant_id,
                paper_size: "A5".to_string(),
                header: Some(name.to_string()),
                footer: Some("Get well soon".to_string()),
                margin_mm: 8,
                show_tax_breakdown: true,
                show_provider_signature: true,
            },
            event,
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant.id
    }

    /// Another appointment for the same patient and doctor.
    pub fn another_event(&self) -> BillableEvent {
        BillableEvent {
            id: EventId::new(),
            ..self.event.clone()
        }
    }

    pub fn register(&self, directory: &InMemoryDirectory) {
        directory.upsert_tenant(self.tenant.clone()).unwrap();
        directory.upsert_patient(self.patient.clone()).unwrap();
        directory.upsert_provider(self.provider.clone()).unwrap();
        directory.upsert_print_layout(self.layout.clone()).unwrap();
        directory.upsert_event(self.event.clone()).unwrap();
    }
}

pub(crate) struct Harness {
    pub directory: Arc<InMemoryDirectory>,
    pub sequence: Arc<InMemoryInvoiceSequence>,
    pub bills: Arc<InMemoryBillRepository>,
    pub handler: InMemoryHandler,
}

impl Harness {
    pub fn new() -> Self {
        let directory = Arc::new(InMemoryDirectory::new());
        let sequence = Arc::new(InMemoryInvoiceSequence::new());
        let bills = Arc::new(InMemoryBillRepository::new());
        let handler = BillingHandler::new(directory.clone(), sequence.clone(), bills.clone());
        Self {
            directory,
            sequence,
            bills,
            handler,
        }
    }

    pub fn with_clinic(name: &str) -> (Self, Clinic) {
        let harness = Self::new();
        let clinic = Clinic::new(name);
        clinic.register(&harness.directory);
        (harness, clinic)
    }
}
