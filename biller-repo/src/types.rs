//! Shared database types with feature-gated fields for SQLite and PostgreSQL.

use sqlx::FromRow;

use biller_types::{Bill, DomainError, PaymentStatus, RepoError};

// ─────────────────────────────────────────────────────────────────────────────
// Feature-gated imports
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(not(feature = "sqlite"))]
use chrono::{DateTime, NaiveDate, Utc};

/// Storage format of `invoice_date` in SQLite (sorts lexicographically).
#[cfg(feature = "sqlite")]
pub const SQLITE_DATE_FORMAT: &str = "%Y-%m-%d";

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// Bill row from database.
#[derive(FromRow)]
pub struct DbBill {
    pub invoice_id: String,
    pub payer_reference: String,
    pub payer_name: String,

    #[cfg(not(feature = "sqlite"))]
    pub invoice_date: NaiveDate,
    #[cfg(feature = "sqlite")]
    pub invoice_date: String,

    pub amount_due: i64,
    pub description: String,
    pub payment_status: Option<String>,

    #[cfg(not(feature = "sqlite"))]
    pub settled_at: Option<DateTime<Utc>>,
    #[cfg(feature = "sqlite")]
    pub settled_at: Option<String>,

    pub settlement_channel: Option<String>,
    pub settlement_journal_ref: Option<String>,

    #[cfg(not(feature = "sqlite"))]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created_at: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversion helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn amount_to_db(amount: u64) -> Result<i64, RepoError> {
    i64::try_from(amount).map_err(|_| {
        RepoError::Domain(DomainError::ValidationError(format!(
            "Amount out of range: {}",
            amount
        )))
    })
}

pub fn amount_from_db(amount: i64) -> Result<u64, RepoError> {
    u64::try_from(amount)
        .map_err(|_| RepoError::Database(format!("Negative amount in storage: {}", amount)))
}

pub fn parse_payment_status(s: Option<String>) -> Result<Option<PaymentStatus>, RepoError> {
    s.map(|s| s.parse::<PaymentStatus>())
        .transpose()
        .map_err(|e| RepoError::Database(e.to_string()))
}

/// Maps insert failures, turning primary-key collisions into `Conflict`.
pub fn map_insert_error(err: sqlx::Error, invoice_id: &str) -> RepoError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::Conflict(format!("Invoice {} already exists", invoice_id))
        }
        _ => RepoError::Database(err.to_string()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain conversion (feature-gated implementations)
// ─────────────────────────────────────────────────────────────────────────────

impl DbBill {
    /// Convert database row to domain Bill.
    pub fn into_domain(self) -> Result<Bill, RepoError> {
        let amount_due = amount_from_db(self.amount_due)?;
        let payment_status = parse_payment_status(self.payment_status)?;

        #[cfg(not(feature = "sqlite"))]
        let (invoice_date, settled_at, created_at) =
            (self.invoice_date, self.settled_at, self.created_at);

        #[cfg(feature = "sqlite")]
        let (invoice_date, settled_at, created_at) = {
            let invoice_date =
                chrono::NaiveDate::parse_from_str(&self.invoice_date, SQLITE_DATE_FORMAT)
                    .map_err(|e| RepoError::Database(e.to_string()))?;

            let settled_at = self
                .settled_at
                .map(|s| chrono::DateTime::parse_from_rfc3339(&s))
                .transpose()
                .map_err(|e| RepoError::Database(e.to_string()))?
                .map(|dt| dt.with_timezone(&chrono::Utc));

            let created_at = chrono::DateTime::parse_from_rfc3339(&self.created_at)
                .map_err(|e| RepoError::Database(e.to_string()))?
                .with_timezone(&chrono::Utc);

            (invoice_date, settled_at, created_at)
        };

        Ok(Bill {
            invoice_id: self.invoice_id,
            payer_reference: self.payer_reference,
            payer_name: self.payer_name,
            invoice_date,
            amount_due,
            description: self.description,
            payment_status,
            settled_at,
            settlement_channel: self.settlement_channel,
            settlement_journal_ref: self.settlement_journal_ref,
            created_at,
        })
    }
}
