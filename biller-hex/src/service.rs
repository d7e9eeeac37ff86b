//! Biller Application Service
//!
//! Orchestrates validation, bill lookup and settlement through the
//! repository port. Contains NO infrastructure logic.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use biller_types::{
    AuditSink, Bill, BillRepository, BillerResponse, GatewayConfig, GatewayError, RepoError,
    SettleOutcome, SettlementFailurePolicy,
};

use crate::audit::TracingAuditSink;
use crate::validator::RequestValidator;

/// Application service for the Inquiry and Payment operations.
///
/// Generic over `R: BillRepository` - the adapter is injected at compile time.
pub struct BillerService<R: BillRepository> {
    repo: R,
    validator: RequestValidator,
    audit: Arc<dyn AuditSink>,
}

impl<R: BillRepository> BillerService<R> {
    /// Creates a service that audits through `tracing`.
    pub fn new(repo: R, config: GatewayConfig) -> Self {
        Self {
            repo,
            validator: RequestValidator::new(Arc::new(config)),
            audit: Arc::new(TracingAuditSink),
        }
    }

    /// Replaces the audit sink.
    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn config(&self) -> &GatewayConfig {
        self.validator.config()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Inquiry
    // ─────────────────────────────────────────────────────────────────────────────

    /// Reports the newest outstanding bill for the payer in the request.
    ///
    /// Read-only: nothing is written regardless of outcome.
    pub async fn inquiry(&self, raw: &Value) -> Result<BillerResponse, GatewayError> {
        let result = self.run_inquiry(raw).await;
        self.audit_failure(raw, &result);
        result
    }

    async fn run_inquiry(&self, raw: &Value) -> Result<BillerResponse, GatewayError> {
        let req = self.validator.validate_inquiry(raw)?;
        let bill = self.locate_outstanding(&req.payer_reference).await?;

        tracing::debug!(
            invoice_id = %bill.invoice_id,
            transaction_id = %req.transaction_id,
            "Inquiry resolved"
        );

        Ok(BillerResponse::inquiry(&bill))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Payment
    // ─────────────────────────────────────────────────────────────────────────────

    /// Settles the newest outstanding bill for the payer in the request.
    ///
    /// A bill transitions to settled at most once; a retry of a committed
    /// payment reports `ERR-ALREADY-PAID` and leaves the first settlement intact.
    pub async fn payment(&self, raw: &Value) -> Result<BillerResponse, GatewayError> {
        let result = self.run_payment(raw).await;
        self.audit_failure(raw, &result);
        result
    }

    async fn run_payment(&self, raw: &Value) -> Result<BillerResponse, GatewayError> {
        let req = self.validator.validate_payment(raw)?;
        let bill = self.locate_outstanding(&req.inquiry.payer_reference).await?;

        if req.invoice_id != bill.invoice_id {
            tracing::warn!(
                requested = %req.invoice_id,
                outstanding = %bill.invoice_id,
                "idTagihan does not match the outstanding bill, settling the outstanding bill"
            );
        }

        if req.amount != bill.amount_due {
            return Err(GatewayError::WrongPaymentAmount {
                paid: req.amount,
                due: bill.amount_due,
            });
        }

        let outcome = self
            .repo
            .settle(
                &bill.invoice_id,
                &req.inquiry.channel_code,
                &req.journal_ref,
                Utc::now(),
            )
            .await;

        match outcome {
            Ok(SettleOutcome::Settled(settled)) => {
                tracing::info!(
                    invoice_id = %settled.invoice_id,
                    payer_reference = %settled.payer_reference,
                    channel = %req.inquiry.channel_code,
                    journal_ref = %req.journal_ref,
                    amount = settled.amount_due,
                    "Bill settled"
                );
                Ok(BillerResponse::payment(
                    &settled,
                    self.config().item_description(),
                ))
            }
            // Lost a race against a concurrent payment for the same bill.
            Ok(SettleOutcome::AlreadySettled) => Err(GatewayError::AlreadyPaid),
            Ok(SettleOutcome::NotFound) => Err(GatewayError::NotFound),
            Err(e) => self.settlement_failed(raw, &bill, e),
        }
    }

    fn settlement_failed(
        &self,
        raw: &Value,
        bill: &Bill,
        err: RepoError,
    ) -> Result<BillerResponse, GatewayError> {
        let failure = GatewayError::Database(err.to_string());

        match self.config().failure_policy() {
            SettlementFailurePolicy::Surface => Err(failure),
            SettlementFailurePolicy::Mask => {
                tracing::error!(
                    invoice_id = %bill.invoice_id,
                    reason = %err,
                    "Settlement failed, reporting success to the bank"
                );
                self.audit.record(raw, &failure.to_response());
                Ok(BillerResponse::payment(
                    bill,
                    self.config().item_description(),
                ))
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Shared helpers
    // ─────────────────────────────────────────────────────────────────────────────

    /// Finds the bill an Inquiry or Payment acts on.
    ///
    /// Unknown payers are `NotFound`; payers whose bills are all settled are
    /// `AlreadyPaid`.
    async fn locate_outstanding(&self, payer_reference: &str) -> Result<Bill, GatewayError> {
        if self.repo.find_latest_by_payer(payer_reference).await?.is_none() {
            return Err(GatewayError::NotFound);
        }

        self.repo
            .find_latest_outstanding_by_payer(payer_reference)
            .await?
            .ok_or(GatewayError::AlreadyPaid)
    }

    fn audit_failure(&self, raw: &Value, result: &Result<BillerResponse, GatewayError>) {
        if let Err(err) = result {
            if let GatewayError::Database(reason) = err {
                tracing::error!(reason = %reason, "Repository failure");
            }
            if err.is_audited() {
                self.audit.record(raw, &err.to_response());
            }
        }
    }
}
