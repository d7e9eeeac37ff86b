//! Bill domain model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::DomainError;

/// Terminal settlement status of a bill.
///
/// An outstanding bill carries no status at all (`Option::None`), so the only
/// representable transition is `None -> Some(Settled)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Settled,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Settled => write!(f, "SETTLED"),
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SETTLED" => Ok(PaymentStatus::Settled),
            other => Err(DomainError::ValidationError(format!(
                "Unknown payment status: {}",
                other
            ))),
        }
    }
}

/// A single invoice owed by a payer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    /// Invoice identifier (primary key)
    pub invoice_id: String,
    /// Reference the bank looks the bill up by (e.g. student number)
    pub payer_reference: String,
    /// Payer display name
    pub payer_name: String,
    /// Issue date, used to pick the most recent bill
    pub invoice_date: NaiveDate,
    /// Amount due in minor currency units
    pub amount_due: u64,
    /// Line item shown to the payer
    pub description: String,
    pub payment_status: Option<PaymentStatus>,
    pub settled_at: Option<DateTime<Utc>>,
    pub settlement_channel: Option<String>,
    pub settlement_journal_ref: Option<String>,
    /// When the row was inserted
    pub created_at: DateTime<Utc>,
}

impl Bill {
    /// Creates a new outstanding bill.
    ///
    /// # Validation
    /// - Invoice id, payer reference and payer name cannot be empty
    pub fn new(
        invoice_id: String,
        payer_reference: String,
        payer_name: String,
        invoice_date: NaiveDate,
        amount_due: u64,
        description: String,
    ) -> Result<Self, DomainError> {
        for (field, value) in [
            ("invoice_id", &invoice_id),
            ("payer_reference", &payer_reference),
            ("payer_name", &payer_name),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::ValidationError(format!(
                    "{} cannot be empty",
                    field
                )));
            }
        }

        Ok(Self {
            invoice_id,
            payer_reference,
            payer_name,
            invoice_date,
            amount_due,
            description,
            payment_status: None,
            settled_at: None,
            settlement_channel: None,
            settlement_journal_ref: None,
            created_at: Utc::now(),
        })
    }

    /// Returns true while no settlement has been recorded.
    pub fn is_outstanding(&self) -> bool {
        self.payment_status.is_none()
    }
}
