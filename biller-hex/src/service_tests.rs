//! BillerService unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{DateTime, NaiveDate, Utc};
    use serde_json::{Value, json};

    use biller_types::security::{inquiry_checksum, payment_checksum};
    use biller_types::{
        AuditSink, Bill, BillRepository, BillerResponse, CreateBillRequest, GatewayConfig,
        GatewayError, PaymentStatus, RepoError, ResponseCode, SettleOutcome,
        SettlementFailurePolicy,
    };

    use crate::BillerService;

    const SECRET: &str = "SECRET";

    /// How `MockRepo::settle` behaves once the lookups have succeeded.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum SettleMode {
        /// Compare-and-set against the stored bill.
        Normal,
        /// The write itself fails.
        Fail,
        /// Another payment committed between lookup and write.
        LoseRace,
        /// The row was deleted between lookup and write.
        Vanish,
    }

    /// Simple in-memory repository for testing the service layer.
    pub struct MockRepo {
        bills: Mutex<HashMap<String, Bill>>,
        settle_mode: SettleMode,
    }

    impl MockRepo {
        pub fn new() -> Self {
            Self::with_settle_mode(SettleMode::Normal)
        }

        pub fn with_settle_mode(settle_mode: SettleMode) -> Self {
            Self {
                bills: Mutex::new(HashMap::new()),
                settle_mode,
            }
        }

        fn latest(&self, payer_reference: &str, outstanding_only: bool) -> Option<Bill> {
            self.bills
                .lock()
                .unwrap()
                .values()
                .filter(|b| b.payer_reference == payer_reference)
                .filter(|b| !outstanding_only || b.is_outstanding())
                .max_by(|a, b| {
                    (a.invoice_date, &a.invoice_id).cmp(&(b.invoice_date, &b.invoice_id))
                })
                .cloned()
        }
    }

    #[async_trait]
    impl BillRepository for MockRepo {
        async fn find_latest_by_payer(
            &self,
            payer_reference: &str,
        ) -> Result<Option<Bill>, RepoError> {
            Ok(self.latest(payer_reference, false))
        }

        async fn find_latest_outstanding_by_payer(
            &self,
            payer_reference: &str,
        ) -> Result<Option<Bill>, RepoError> {
            Ok(self.latest(payer_reference, true))
        }

        async fn get_bill(&self, invoice_id: &str) -> Result<Option<Bill>, RepoError> {
            Ok(self.bills.lock().unwrap().get(invoice_id).cloned())
        }

        async fn settle(
            &self,
            invoice_id: &str,
            channel: &str,
            journal_ref: &str,
            now: DateTime<Utc>,
        ) -> Result<SettleOutcome, RepoError> {
            match self.settle_mode {
                SettleMode::Normal => {}
                SettleMode::Fail => {
                    return Err(RepoError::Database("database is locked".into()));
                }
                SettleMode::LoseRace => return Ok(SettleOutcome::AlreadySettled),
                SettleMode::Vanish => return Ok(SettleOutcome::NotFound),
            }

            let mut bills = self.bills.lock().unwrap();
            let Some(bill) = bills.get_mut(invoice_id) else {
                return Ok(SettleOutcome::NotFound);
            };
            if !bill.is_outstanding() {
                return Ok(SettleOutcome::AlreadySettled);
            }

            bill.payment_status = Some(PaymentStatus::Settled);
            bill.settled_at = Some(now);
            bill.settlement_channel = Some(channel.to_string());
            bill.settlement_journal_ref = Some(journal_ref.to_string());
            Ok(SettleOutcome::Settled(bill.clone()))
        }

        async fn create_bill(&self, req: CreateBillRequest) -> Result<Bill, RepoError> {
            let bill = Bill::new(
                req.invoice_id,
                req.payer_reference,
                req.payer_name,
                req.invoice_date,
                req.amount_due,
                req.description,
            )
            .map_err(RepoError::Domain)?;
            let mut bills = self.bills.lock().unwrap();
            if bills.contains_key(&bill.invoice_id) {
                return Err(RepoError::Conflict(bill.invoice_id));
            }
            bills.insert(bill.invoice_id.clone(), bill.clone());
            Ok(bill)
        }
    }

    /// Audit sink that keeps every record for inspection.
    #[derive(Default)]
    pub struct RecordingAudit {
        records: Mutex<Vec<(Value, BillerResponse)>>,
    }

    impl RecordingAudit {
        fn codes(&self) -> Vec<ResponseCode> {
            self.records
                .lock()
                .unwrap()
                .iter()
                .map(|(_, response)| response.rc)
                .collect()
        }
    }

    impl AuditSink for RecordingAudit {
        fn record(&self, bank_request: &Value, response: &BillerResponse) {
            self.records
                .lock()
                .unwrap()
                .push((bank_request.clone(), response.clone()));
        }
    }

    fn config() -> GatewayConfig {
        GatewayConfig::new("SMA Harapan", SECRET)
            .unwrap()
            .with_item_description("TAGIHAN SPP")
    }

    fn service_with(
        repo: MockRepo,
        config: GatewayConfig,
    ) -> (BillerService<MockRepo>, Arc<RecordingAudit>) {
        let audit = Arc::new(RecordingAudit::default());
        let service = BillerService::new(repo, config).with_audit_sink(audit.clone());
        (service, audit)
    }

    fn service() -> (BillerService<MockRepo>, Arc<RecordingAudit>) {
        service_with(MockRepo::new(), config())
    }

    async fn seed(
        service: &BillerService<MockRepo>,
        invoice_id: &str,
        payer: &str,
        date: (i32, u32, u32),
        amount: u64,
    ) {
        service
            .repo()
            .create_bill(CreateBillRequest {
                invoice_id: invoice_id.to_string(),
                payer_reference: payer.to_string(),
                payer_name: "Siti Aminah".to_string(),
                invoice_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
                amount_due: amount,
                description: format!("SPP {}", invoice_id),
            })
            .await
            .unwrap();
    }

    fn inquiry_body(payer: &str) -> Value {
        json!({
            "kodeBank": "BSM",
            "kodeChannel": "TELLER",
            "kodeBiller": "SPP01",
            "kodeTerminal": "T001",
            "nomorPembayaran": payer,
            "tanggalTransaksi": "2024-01-10",
            "idTransaksi": "TX0001",
            "checksum": inquiry_checksum(payer, SECRET, "2024-01-10"),
        })
    }

    fn payment_body(payer: &str, invoice_id: &str, amount: &str, journal: &str) -> Value {
        json!({
            "kodeBank": "BSM",
            "kodeChannel": "TELLER",
            "kodeBiller": "SPP01",
            "kodeTerminal": "T001",
            "nomorPembayaran": payer,
            "tanggalTransaksi": "2024-01-10",
            "idTransaksi": "TX0002",
            "idTagihan": invoice_id,
            "totalNominal": amount,
            "nomorJurnalPembukuan": journal,
            "checksum": payment_checksum(payer, SECRET, "2024-01-10", amount, journal),
        })
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Inquiry
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_inquiry_success() {
        let (service, audit) = service();
        seed(&service, "INV0001", "12345", (2024, 1, 5), 500_000).await;

        let response = service.inquiry(&inquiry_body("12345")).await.unwrap();

        assert_eq!(response.rc, ResponseCode::Ok);
        assert_eq!(response.message, "Inquiry Success");
        assert_eq!(response.id_tagihan.as_deref(), Some("INV0001"));
        assert_eq!(response.nomor_pembayaran.as_deref(), Some("12345"));
        assert_eq!(response.id_pelanggan.as_deref(), Some("12345"));
        assert_eq!(response.nama.as_deref(), Some("Siti Aminah"));
        assert_eq!(response.total_nominal, Some(500_000));
        assert_eq!(response.informasi.unwrap().info1, "SPP INV0001");
        assert!(response.rincian.is_none());
        assert!(audit.codes().is_empty());
    }

    #[tokio::test]
    async fn test_inquiry_picks_newest_outstanding_bill() {
        let (service, _) = service();
        seed(&service, "INV0001", "12345", (2024, 1, 5), 500_000).await;
        seed(&service, "INV0002", "12345", (2024, 2, 5), 550_000).await;
        seed(&service, "INV0003", "12345", (2024, 3, 5), 600_000).await;
        service
            .repo()
            .settle("INV0003", "ATM", "JRN000", Utc::now())
            .await
            .unwrap();

        let response = service.inquiry(&inquiry_body("12345")).await.unwrap();

        assert_eq!(response.id_tagihan.as_deref(), Some("INV0002"));
        assert_eq!(response.total_nominal, Some(550_000));
    }

    #[tokio::test]
    async fn test_inquiry_does_not_write() {
        let (service, _) = service();
        seed(&service, "INV0001", "12345", (2024, 1, 5), 500_000).await;

        service.inquiry(&inquiry_body("12345")).await.unwrap();
        service.inquiry(&inquiry_body("12345")).await.unwrap();

        let bill = service.repo().get_bill("INV0001").await.unwrap().unwrap();
        assert!(bill.is_outstanding());
    }

    #[tokio::test]
    async fn test_inquiry_unknown_payer() {
        let (service, audit) = service();

        let result = service.inquiry(&inquiry_body("99999")).await;

        assert_eq!(result, Err(GatewayError::NotFound));
        assert_eq!(audit.codes(), vec![ResponseCode::NotFound]);
    }

    #[tokio::test]
    async fn test_inquiry_all_bills_settled() {
        let (service, audit) = service();
        seed(&service, "INV0001", "12345", (2024, 1, 5), 500_000).await;
        service
            .repo()
            .settle("INV0001", "ATM", "JRN000", Utc::now())
            .await
            .unwrap();

        let result = service.inquiry(&inquiry_body("12345")).await;

        assert_eq!(result, Err(GatewayError::AlreadyPaid));
        assert_eq!(audit.codes(), vec![ResponseCode::AlreadyPaid]);
    }

    #[tokio::test]
    async fn test_parsing_errors_are_not_audited() {
        let (service, audit) = service();
        let mut body = inquiry_body("12345");
        body["kodeTerminal"] = json!("");

        let result = service.inquiry(&body).await;

        assert_eq!(result, Err(GatewayError::ParsingMessage));
        assert!(audit.codes().is_empty());
    }

    #[tokio::test]
    async fn test_rejections_are_audited_with_raw_request() {
        let (service, audit) = service();
        let mut body = inquiry_body("12345");
        body["kodeBank"] = json!("BNI");

        let result = service.inquiry(&body).await;

        assert_eq!(
            result.unwrap_err().to_string(),
            "Collecting agent is not allowed by SMA Harapan"
        );
        let records = audit.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, body);
        assert_eq!(records[0].1.rc, ResponseCode::BankUnknown);
    }

    #[tokio::test]
    async fn test_checksum_failure_does_not_reveal_bill() {
        let (service, _) = service();
        seed(&service, "INV0001", "12345", (2024, 1, 5), 500_000).await;
        let mut body = inquiry_body("12345");
        body["checksum"] = json!(inquiry_checksum("12345", "WRONG", "2024-01-10"));

        let result = service.inquiry(&body).await;

        assert_eq!(result, Err(GatewayError::SecureHash));
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Payment
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_payment_success() {
        let (service, audit) = service();
        seed(&service, "INV0001", "12345", (2024, 1, 5), 500_000).await;

        let response = service
            .payment(&payment_body("12345", "INV0001", "500000", "JRN001"))
            .await
            .unwrap();

        assert_eq!(response.rc, ResponseCode::Ok);
        assert_eq!(response.message, "Payment Success");
        assert_eq!(response.id_tagihan.as_deref(), Some("INV0001"));
        assert_eq!(response.total_nominal, Some(500_000));
        let rincian = response.rincian.unwrap();
        assert_eq!(rincian.len(), 1);
        assert_eq!(rincian[0].kode_rincian, "TAGIHAN");
        assert_eq!(rincian[0].deskripsi, "TAGIHAN SPP");
        assert_eq!(rincian[0].nominal, 500_000);

        let bill = service.repo().get_bill("INV0001").await.unwrap().unwrap();
        assert_eq!(bill.payment_status, Some(PaymentStatus::Settled));
        assert_eq!(bill.settlement_channel.as_deref(), Some("TELLER"));
        assert_eq!(bill.settlement_journal_ref.as_deref(), Some("JRN001"));
        assert!(bill.settled_at.is_some());
        assert!(audit.codes().is_empty());
    }

    #[tokio::test]
    async fn test_payment_retry_reports_already_paid() {
        let (service, audit) = service();
        seed(&service, "INV0001", "12345", (2024, 1, 5), 500_000).await;
        let body = payment_body("12345", "INV0001", "500000", "JRN001");

        service.payment(&body).await.unwrap();
        let retry = service.payment(&body).await;

        assert_eq!(retry, Err(GatewayError::AlreadyPaid));
        assert_eq!(audit.codes(), vec![ResponseCode::AlreadyPaid]);
        let bill = service.repo().get_bill("INV0001").await.unwrap().unwrap();
        assert_eq!(bill.settlement_journal_ref.as_deref(), Some("JRN001"));
    }

    #[tokio::test]
    async fn test_payment_wrong_amount() {
        let (service, audit) = service();
        seed(&service, "INV0001", "12345", (2024, 1, 5), 500_000).await;

        let result = service
            .payment(&payment_body("12345", "INV0001", "400000", "JRN001"))
            .await;

        let err = result.unwrap_err();
        assert_eq!(
            err,
            GatewayError::WrongPaymentAmount {
                paid: 400_000,
                due: 500_000
            }
        );
        assert_eq!(
            err.to_string(),
            "Total paid amount (400000) is not equal to bill amount (500000)"
        );
        assert_eq!(audit.codes(), vec![ResponseCode::WrongPaymentAmount]);
        let bill = service.repo().get_bill("INV0001").await.unwrap().unwrap();
        assert!(bill.is_outstanding());
    }

    #[tokio::test]
    async fn test_payment_unknown_payer() {
        let (service, _) = service();

        let result = service
            .payment(&payment_body("99999", "INV0001", "500000", "JRN001"))
            .await;

        assert_eq!(result, Err(GatewayError::NotFound));
    }

    #[tokio::test]
    async fn test_payment_settles_outstanding_bill_when_invoice_id_differs() {
        let (service, _) = service();
        seed(&service, "INV0001", "12345", (2024, 1, 5), 500_000).await;

        let response = service
            .payment(&payment_body("12345", "INV9999", "500000", "JRN001"))
            .await
            .unwrap();

        assert_eq!(response.id_tagihan.as_deref(), Some("INV0001"));
        let bill = service.repo().get_bill("INV0001").await.unwrap().unwrap();
        assert!(!bill.is_outstanding());
    }

    #[tokio::test]
    async fn test_payment_settles_bills_newest_first() {
        let (service, _) = service();
        seed(&service, "INV0001", "12345", (2024, 1, 5), 500_000).await;
        seed(&service, "INV0002", "12345", (2024, 2, 5), 500_000).await;

        let first = service
            .payment(&payment_body("12345", "INV0002", "500000", "JRN001"))
            .await
            .unwrap();
        let second = service
            .payment(&payment_body("12345", "INV0001", "500000", "JRN002"))
            .await
            .unwrap();
        let third = service
            .payment(&payment_body("12345", "INV0001", "500000", "JRN003"))
            .await;

        assert_eq!(first.id_tagihan.as_deref(), Some("INV0002"));
        assert_eq!(second.id_tagihan.as_deref(), Some("INV0001"));
        assert_eq!(third, Err(GatewayError::AlreadyPaid));
    }

    #[tokio::test]
    async fn test_payment_tampered_amount_fails_checksum() {
        let (service, _) = service();
        seed(&service, "INV0001", "12345", (2024, 1, 5), 1).await;
        let mut body = payment_body("12345", "INV0001", "500000", "JRN001");
        body["totalNominal"] = json!("1");

        let result = service.payment(&body).await;

        assert_eq!(result, Err(GatewayError::SecureHash));
        let bill = service.repo().get_bill("INV0001").await.unwrap().unwrap();
        assert!(bill.is_outstanding());
    }

    #[tokio::test]
    async fn test_settlement_failure_surfaces_database_error() {
        let repo = MockRepo::with_settle_mode(SettleMode::Fail);
        let (service, audit) = service_with(repo, config());
        seed(&service, "INV0001", "12345", (2024, 1, 5), 500_000).await;

        let result = service
            .payment(&payment_body("12345", "INV0001", "500000", "JRN001"))
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, GatewayError::Database(_)));
        assert_eq!(err.to_string(), "Error encountered while updating transaction");
        assert_eq!(err.http_status(), 500);
        assert_eq!(audit.codes(), vec![ResponseCode::Database]);
    }

    #[tokio::test]
    async fn test_settlement_failure_masked_when_configured() {
        let config = config().with_failure_policy(SettlementFailurePolicy::Mask);
        let repo = MockRepo::with_settle_mode(SettleMode::Fail);
        let (service, audit) = service_with(repo, config);
        seed(&service, "INV0001", "12345", (2024, 1, 5), 500_000).await;

        let response = service
            .payment(&payment_body("12345", "INV0001", "500000", "JRN001"))
            .await
            .unwrap();

        assert_eq!(response.rc, ResponseCode::Ok);
        assert_eq!(response.message, "Payment Success");
        assert_eq!(audit.codes(), vec![ResponseCode::Database]);
        let bill = service.repo().get_bill("INV0001").await.unwrap().unwrap();
        assert!(bill.is_outstanding());
    }

    #[tokio::test]
    async fn test_concurrent_payments_settle_once() {
        let (service, _) = service();
        seed(&service, "INV0001", "12345", (2024, 1, 5), 500_000).await;
        let service = Arc::new(service);

        let attempts: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    let journal = format!("JRN{:03}", i);
                    service
                        .payment(&payment_body("12345", "INV0001", "500000", &journal))
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        for handle in attempts {
            match handle.await.unwrap() {
                Ok(response) => {
                    assert!(response.is_ok());
                    successes += 1;
                }
                Err(err) => assert_eq!(err, GatewayError::AlreadyPaid),
            }
        }

        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn test_lost_settlement_race_reports_already_paid() {
        let repo = MockRepo::with_settle_mode(SettleMode::LoseRace);
        let (service, audit) = service_with(repo, config());
        seed(&service, "INV0001", "12345", (2024, 1, 5), 500_000).await;
        let body = payment_body("12345", "INV0001", "500000", "JRN001");

        let err = service.payment(&body).await.unwrap_err();

        assert_eq!(err, GatewayError::AlreadyPaid);
        assert_eq!(err.to_string(), "Bill already paid");
        assert_eq!(err.http_status(), 200);
        assert_eq!(audit.codes(), vec![ResponseCode::AlreadyPaid]);
        assert_eq!(audit.records.lock().unwrap()[0].0, body);
    }

    #[tokio::test]
    async fn test_bill_vanished_before_settlement_reports_not_found() {
        let repo = MockRepo::with_settle_mode(SettleMode::Vanish);
        let (service, audit) = service_with(repo, config());
        seed(&service, "INV0001", "12345", (2024, 1, 5), 500_000).await;
        let body = payment_body("12345", "INV0001", "500000", "JRN001");

        let err = service.payment(&body).await.unwrap_err();

        assert_eq!(err, GatewayError::NotFound);
        assert_eq!(err.to_string(), "Billing number not found");
        assert_eq!(err.http_status(), 404);
        assert_eq!(audit.codes(), vec![ResponseCode::NotFound]);
        assert_eq!(audit.records.lock().unwrap()[0].0, body);
    }
}
