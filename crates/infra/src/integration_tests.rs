//! Integration tests for the bill generation pipeline.
//!
//! Tests: GenerateBill → Directory → Calculator → Allocator → Snapshot → Repository
//!
//! Verifies:
//! - Invoice numbers are unique and dense per tenant, also under concurrency
//! - Failures before allocation consume nothing; failures after it leave a gap
//! - Stored bills do not drift when the reference records change
//! - Tenant isolation is preserved

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use clinicbill_billing::{BillDocument, BillableEvent, InvoiceNumber, Patient, PrintLayout, Provider, Tenant};
    use clinicbill_core::{BillId, EventId, Money, PatientId, ProviderId, TenantId};

    use crate::bill_store::{BillRepository, InMemoryBillRepository, RepositoryError, StoredBill};
    use crate::billing_handler::{BillingHandler, BillingStage, GenerateBill};
    use crate::directory::{DirectoryError, InMemoryDirectory, ReferenceDirectory};
    use crate::sequence::{InMemoryInvoiceSequence, InvoiceSequenceAllocator, SequenceError};
    use crate::test_support::{Clinic, Harness};

    fn request(clinic: &Clinic) -> GenerateBill {
        GenerateBill {
            tenant_id: clinic.tenant_id(),
            event_id: clinic.event.id,
            discount: Decimal::new(10_000, 2),
            tax_rate: Decimal::new(18, 2),
        }
    }

    /// Repository whose writes fail while reads still work.
    struct WriteOutage {
        inner: InMemoryBillRepository,
    }

    #[async_trait]
    impl BillRepository for WriteOutage {
        async fn save(&self, _document: BillDocument) -> Result<StoredBill, RepositoryError> {
            Err(RepositoryError::Unavailable("connection reset".to_string()))
        }

        async fn find_by_id(&self, bill_id: BillId) -> Result<Option<StoredBill>, RepositoryError> {
            self.inner.find_by_id(bill_id).await
        }

        async fn find_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<StoredBill>, RepositoryError> {
            self.inner.find_by_tenant(tenant_id).await
        }

        async fn find_by_invoice_number(
            &self,
            tenant_id: TenantId,
            invoice_number: InvoiceNumber,
        ) -> Result<Option<StoredBill>, RepositoryError> {
            self.inner.find_by_invoice_number(tenant_id, invoice_number).await
        }
    }

    /// Allocator that always fails the same way.
    struct BrokenAllocator(fn(TenantId) -> SequenceError);

    #[async_trait]
    impl InvoiceSequenceAllocator for BrokenAllocator {
        async fn allocate(&self, tenant_id: TenantId) -> Result<InvoiceNumber, SequenceError> {
            Err((self.0)(tenant_id))
        }

        async fn peek_next(&self, tenant_id: TenantId) -> Result<InvoiceNumber, SequenceError> {
            Err((self.0)(tenant_id))
        }
    }

    /// Directory whose backing store cannot be reached.
    struct UnreachableDirectory;

    fn unreachable() -> DirectoryError {
        DirectoryError::Unavailable("connection refused".to_string())
    }

    #[async_trait]
    impl ReferenceDirectory for UnreachableDirectory {
        async fn get_event(&self, _event_id: EventId) -> Result<Option<BillableEvent>, DirectoryError> {
            Err(unreachable())
        }

        async fn get_tenant(&self, _tenant_id: TenantId) -> Result<Option<Tenant>, DirectoryError> {
            Err(unreachable())
        }

        async fn get_patient(
            &self,
            _tenant_id: TenantId,
            _patient_id: PatientId,
        ) -> Result<Option<Patient>, DirectoryError> {
            Err(unreachable())
        }

        async fn get_provider(
            &self,
            _tenant_id: TenantId,
            _provider_id: ProviderId,
        ) -> Result<Option<Provider>, DirectoryError> {
            Err(unreachable())
        }

        async fn get_print_layout(
            &self,
            _tenant_id: TenantId,
        ) -> Result<Option<PrintLayout>, DirectoryError> {
            Err(unreachable())
        }
    }

    #[tokio::test]
    async fn generates_bill_with_amounts_number_and_layout() {
        let (h, clinic) = Harness::with_clinic("Sunrise Clinic");

        let generated = h.handler.generate_bill(request(&clinic)).await.unwrap();
        let doc = &generated.bill.document;

        assert_eq!(doc.invoice_number(), InvoiceNumber::FIRST);
        assert_eq!(doc.tenant_id(), clinic.tenant_id());
        assert_eq!(doc.source_event_id(), clinic.event.id);
        assert_eq!(doc.amounts().base, Money::from_cents(100_000));
        assert_eq!(doc.amounts().discount, Money::from_cents(10_000));
        assert_eq!(doc.amounts().tax, Money::from_cents(18_000));
        assert_eq!(doc.amounts().payable, Money::from_cents(108_000));
        assert_eq!(generated.print_layout, clinic.layout);

        let by_number = h
            .bills
            .find_by_invoice_number(clinic.tenant_id(), InvoiceNumber::FIRST)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_number, generated.bill);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_on_empty_sequence_get_one_and_two() {
        let (h, clinic) = Harness::with_clinic("Sunrise Clinic");
        let handler = Arc::new(h.handler);

        let first = {
            let handler = handler.clone();
            let req = request(&clinic);
            tokio::spawn(async move { handler.generate_bill(req).await })
        };
        let second = {
            let handler = handler.clone();
            let req = request(&clinic);
            tokio::spawn(async move { handler.generate_bill(req).await })
        };

        let numbers: HashSet<u64> = [first.await.unwrap(), second.await.unwrap()]
            .into_iter()
            .map(|r| r.unwrap().bill.invoice_number().value())
            .collect();

        assert_eq!(numbers, HashSet::from([1, 2]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn many_concurrent_requests_issue_dense_numbers() {
        const CALLS: u64 = 100;
        let (h, clinic) = Harness::with_clinic("Sunrise Clinic");
        let handler = Arc::new(h.handler);

        let tasks: Vec<_> = (0..CALLS)
            .map(|_| {
                let handler = handler.clone();
                let req = request(&clinic);
                tokio::spawn(async move { handler.generate_bill(req).await })
            })
            .collect();
        for t in tasks {
            t.await.unwrap().unwrap();
        }

        let stored = h.bills.find_by_tenant(clinic.tenant_id()).await.unwrap();
        let numbers: Vec<u64> = stored.iter().map(|b| b.invoice_number().value()).collect();
        assert_eq!(numbers, (1..=CALLS).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn missing_provider_fails_without_consuming_a_number() {
        let h = Harness::new();
        let clinic = Clinic::new("Sunrise Clinic");
        h.directory.upsert_tenant(clinic.tenant.clone()).unwrap();
        h.directory.upsert_patient(clinic.patient.clone()).unwrap();
        h.directory.upsert_print_layout(clinic.layout.clone()).unwrap();
        h.directory.upsert_event(clinic.event.clone()).unwrap();

        let err = h.handler.generate_bill(request(&clinic)).await.unwrap_err();

        assert_eq!(err.kind(), "not_found");
        assert_eq!(err.stage, BillingStage::Validating);
        assert_eq!(err.orphaned_invoice_number, None);
        assert_eq!(h.sequence.peek_next(clinic.tenant_id()).await.unwrap(), InvoiceNumber::FIRST);
    }

    #[tokio::test]
    async fn directory_outage_fails_validation_without_consuming_a_number() {
        let clinic = Clinic::new("Sunrise Clinic");
        let sequence = Arc::new(InMemoryInvoiceSequence::new());
        let handler = BillingHandler::new(
            UnreachableDirectory,
            sequence.clone(),
            InMemoryBillRepository::new(),
        );

        let err = handler.generate_bill(request(&clinic)).await.unwrap_err();

        assert_eq!(err.kind(), "storage_unavailable");
        assert_eq!(err.stage, BillingStage::Validating);
        assert_eq!(err.orphaned_invoice_number, None);
        assert_eq!(sequence.peek_next(clinic.tenant_id()).await.unwrap(), InvoiceNumber::FIRST);
    }

    #[tokio::test]
    async fn blank_patient_name_fails_building_and_orphans_the_number() {
        let h = Harness::new();
        let mut clinic = Clinic::new("Sunrise Clinic");
        clinic.patient.name = "   ".to_string();
        clinic.register(&h.directory);

        let err = h.handler.generate_bill(request(&clinic)).await.unwrap_err();

        assert_eq!(err.kind(), "snapshot_error");
        assert_eq!(err.stage, BillingStage::Building);
        assert_eq!(err.orphaned_invoice_number, Some(InvoiceNumber::FIRST));
        assert_eq!(h.sequence.peek_next(clinic.tenant_id()).await.unwrap(), InvoiceNumber::new(2));
        assert!(h.bills.find_by_tenant(clinic.tenant_id()).await.unwrap().is_empty());

        let audit = h.handler.sequence_audit(clinic.tenant_id()).await.unwrap();
        assert_eq!(audit.gaps, vec![InvoiceNumber::FIRST]);
    }

    #[tokio::test]
    async fn persist_failure_consumes_the_number_and_stores_nothing() {
        let directory = Arc::new(InMemoryDirectory::new());
        let sequence = Arc::new(InMemoryInvoiceSequence::new());
        let bills = Arc::new(WriteOutage {
            inner: InMemoryBillRepository::new(),
        });
        let clinic = Clinic::new("Sunrise Clinic");
        clinic.register(&directory);
        let handler = BillingHandler::new(directory, sequence.clone(), bills.clone());

        let err = handler.generate_bill(request(&clinic)).await.unwrap_err();

        assert_eq!(err.kind(), "persist_error");
        assert_eq!(err.stage, BillingStage::Persisting);
        assert_eq!(err.orphaned_invoice_number, Some(InvoiceNumber::FIRST));
        assert!(
            bills
                .find_by_invoice_number(clinic.tenant_id(), InvoiceNumber::FIRST)
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(sequence.peek_next(clinic.tenant_id()).await.unwrap(), InvoiceNumber::new(2));

        let audit = handler.sequence_audit(clinic.tenant_id()).await.unwrap();
        assert_eq!(audit.gaps, vec![InvoiceNumber::FIRST]);
        assert_eq!(audit.issued, 0);
    }

    #[tokio::test]
    async fn gap_is_never_refilled() {
        let (h, clinic) = Harness::with_clinic("Sunrise Clinic");
        h.sequence.allocate(clinic.tenant_id()).await.unwrap();

        let generated = h.handler.generate_bill(request(&clinic)).await.unwrap();

        assert_eq!(generated.bill.invoice_number(), InvoiceNumber::new(2));
        let audit = h.handler.sequence_audit(clinic.tenant_id()).await.unwrap();
        assert_eq!(audit.gaps, vec![InvoiceNumber::FIRST]);
        assert_eq!(audit.issued, 1);
        assert_eq!(audit.next_number, InvoiceNumber::new(3));
    }

    #[tokio::test]
    async fn allocator_outage_is_storage_unavailable() {
        let directory = Arc::new(InMemoryDirectory::new());
        let clinic = Clinic::new("Sunrise Clinic");
        clinic.register(&directory);
        let handler = BillingHandler::new(
            directory,
            BrokenAllocator(|_| SequenceError::StorageUnavailable("timeout".to_string())),
            InMemoryBillRepository::new(),
        );

        let err = handler.generate_bill(request(&clinic)).await.unwrap_err();

        assert_eq!(err.kind(), "storage_unavailable");
        assert_eq!(err.stage, BillingStage::Allocating);
        assert_eq!(err.orphaned_invoice_number, None);
    }

    #[tokio::test]
    async fn uninitialized_sequence_is_reported() {
        let directory = Arc::new(InMemoryDirectory::new());
        let clinic = Clinic::new("Sunrise Clinic");
        clinic.register(&directory);
        let handler = BillingHandler::new(
            directory,
            BrokenAllocator(SequenceError::NotInitialized),
            InMemoryBillRepository::new(),
        );

        let err = handler.generate_bill(request(&clinic)).await.unwrap_err();

        assert_eq!(err.kind(), "sequence_not_initialized");
    }

    #[tokio::test]
    async fn invalid_discount_fails_before_allocation() {
        let (h, clinic) = Harness::with_clinic("Sunrise Clinic");
        let req = GenerateBill {
            discount: Decimal::new(200_000, 2),
            ..request(&clinic)
        };

        let err = h.handler.generate_bill(req).await.unwrap_err();

        assert_eq!(err.kind(), "invalid_amount");
        assert_eq!(err.stage, BillingStage::Computing);
        assert_eq!(h.sequence.peek_next(clinic.tenant_id()).await.unwrap(), InvoiceNumber::FIRST);
    }

    #[tokio::test]
    async fn same_event_billed_twice_gets_two_numbers() {
        let (h, clinic) = Harness::with_clinic("Sunrise Clinic");

        let a = h.handler.generate_bill(request(&clinic)).await.unwrap();
        let b = h.handler.generate_bill(request(&clinic)).await.unwrap();

        assert_ne!(a.bill.bill_id, b.bill.bill_id);
        assert_eq!(a.bill.invoice_number(), InvoiceNumber::new(1));
        assert_eq!(b.bill.invoice_number(), InvoiceNumber::new(2));
        assert_eq!(a.bill.document.source_event_id(), b.bill.document.source_event_id());
    }

    #[tokio::test]
    async fn stored_bill_does_not_follow_record_edits() {
        let (h, mut clinic) = Harness::with_clinic("Sunrise Clinic");
        let generated = h.handler.generate_bill(request(&clinic)).await.unwrap();

        clinic.patient.name = "Meera Nair".to_string();
        clinic.provider.consultation_fee = Money::from_cents(250_000);
        clinic.tenant.address = "9 New Avenue".to_string();
        h.directory.upsert_patient(clinic.patient.clone()).unwrap();
        h.directory.upsert_provider(clinic.provider.clone()).unwrap();
        h.directory.upsert_tenant(clinic.tenant.clone()).unwrap();

        let stored = h.bills.find_by_id(generated.bill.bill_id).await.unwrap().unwrap();
        assert_eq!(stored.document.patient().name, "Meera Pillai");
        assert_eq!(stored.document.provider().consultation_fee, Money::from_cents(100_000));
        assert_eq!(stored.document.tenant().address, "1 Main Road");
        assert_eq!(stored.document.amounts().payable, Money::from_cents(108_000));

        let next = h.handler.generate_bill(request(&clinic)).await.unwrap();
        assert_eq!(next.bill.document.patient().name, "Meera Nair");
        assert_eq!(next.bill.document.amounts().base, Money::from_cents(250_000));
    }

    #[tokio::test]
    async fn event_fee_overrides_provider_fee() {
        let (h, clinic) = Harness::with_clinic("Sunrise Clinic");
        let mut admission = clinic.another_event();
        admission.fee = Some(Money::from_cents(500_000));
        h.directory.upsert_event(admission.clone()).unwrap();

        let req = GenerateBill {
            event_id: admission.id,
            discount: Decimal::ZERO,
            tax_rate: Decimal::ZERO,
            ..request(&clinic)
        };
        let generated = h.handler.generate_bill(req).await.unwrap();

        assert_eq!(generated.bill.document.amounts().payable, Money::from_cents(500_000));
    }

    #[tokio::test]
    async fn event_of_another_clinic_is_not_found() {
        let (h, clinic_a) = Harness::with_clinic("Sunrise Clinic");
        let clinic_b = Clinic::new("Lakeside Hospital");
        clinic_b.register(&h.directory);

        let req = GenerateBill {
            tenant_id: clinic_b.tenant_id(),
            ..request(&clinic_a)
        };
        let err = h.handler.generate_bill(req).await.unwrap_err();

        assert_eq!(err.kind(), "not_found");
        assert_eq!(h.sequence.peek_next(clinic_a.tenant_id()).await.unwrap(), InvoiceNumber::FIRST);
        assert_eq!(h.sequence.peek_next(clinic_b.tenant_id()).await.unwrap(), InvoiceNumber::FIRST);
    }

    #[tokio::test]
    async fn tenants_number_independently() {
        let (h, clinic_a) = Harness::with_clinic("Sunrise Clinic");
        let clinic_b = Clinic::new("Lakeside Hospital");
        clinic_b.register(&h.directory);

        h.handler.generate_bill(request(&clinic_a)).await.unwrap();
        h.handler.generate_bill(request(&clinic_a)).await.unwrap();
        let b = h.handler.generate_bill(request(&clinic_b)).await.unwrap();

        assert_eq!(b.bill.invoice_number(), InvoiceNumber::FIRST);
        assert_eq!(h.bills.find_by_tenant(clinic_a.tenant_id()).await.unwrap().len(), 2);
        assert_eq!(h.bills.find_by_tenant(clinic_b.tenant_id()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn repository_rejects_a_reused_invoice_number() {
        let (h, clinic) = Harness::with_clinic("Sunrise Clinic");
        let generated = h.handler.generate_bill(request(&clinic)).await.unwrap();

        let err = h.bills.save(generated.bill.document.clone()).await.unwrap_err();

        assert!(matches!(
            err,
            RepositoryError::DuplicateInvoiceNumber { invoice_number, .. }
                if invoice_number == InvoiceNumber::FIRST
        ));
        assert_eq!(h.bills.find_by_tenant(clinic.tenant_id()).await.unwrap().len(), 1);
    }
}
