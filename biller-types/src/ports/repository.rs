//! Repository port trait.
//!
//! This is the primary port in our hexagonal architecture.
//! Adapters (Postgres, SQLite) implement this trait.

use chrono::{DateTime, Utc};

use crate::domain::Bill;
use crate::dto::CreateBillRequest;
use crate::error::RepoError;

/// Result of a conditional settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleOutcome {
    /// The bill moved from outstanding to settled; carries the updated row.
    Settled(Bill),
    /// The bill was already settled when the write happened.
    AlreadySettled,
    /// No bill with that invoice id exists.
    NotFound,
}

/// The repository port for bill lookup and settlement.
///
/// `settle` MUST be a compare-and-set on the payment status executed inside a
/// single database transaction; a read followed by an unconditional write is
/// not an acceptable implementation.
#[async_trait::async_trait]
pub trait BillRepository: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────────
    // Lookups
    // ─────────────────────────────────────────────────────────────────────────────

    /// Most recent bill for the payer (by invoice date), whatever its status.
    async fn find_latest_by_payer(&self, payer_reference: &str) -> Result<Option<Bill>, RepoError>;

    /// Most recent bill for the payer that is still outstanding.
    async fn find_latest_outstanding_by_payer(
        &self,
        payer_reference: &str,
    ) -> Result<Option<Bill>, RepoError>;

    /// Gets a bill by invoice id.
    async fn get_bill(&self, invoice_id: &str) -> Result<Option<Bill>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Atomically settles the bill if, and only if, it is still outstanding.
    async fn settle(
        &self,
        invoice_id: &str,
        channel: &str,
        journal_ref: &str,
        now: DateTime<Utc>,
    ) -> Result<SettleOutcome, RepoError>;

    /// Registers a new outstanding bill (back-office import).
    async fn create_bill(&self, req: CreateBillRequest) -> Result<Bill, RepoError>;
}
