//! Error types for the biller gateway.

use crate::dto::{BillerResponse, ResponseCode};

/// Domain-level errors (business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Gateway-level errors, one per response code the banks integrate against.
///
/// The `Display` text of each variant is the exact `message` sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("Invalid message format")]
    ParsingMessage,

    #[error("Collecting agent is not allowed by {biller}")]
    AgentNotAllowed { biller: String },

    #[error("Channel is not allowed by {biller}")]
    ChannelNotAllowed { biller: String },

    #[error("H2H Checksum is invalid")]
    SecureHash,

    #[error("Billing number not found")]
    NotFound,

    #[error("Bill already paid")]
    AlreadyPaid,

    #[error("Total paid amount ({paid}) is not equal to bill amount ({due})")]
    WrongPaymentAmount { paid: u64, due: u64 },

    #[error("Error encountered while updating transaction")]
    Database(String),
}

impl GatewayError {
    /// Response code reported in the `rc` field.
    pub fn response_code(&self) -> ResponseCode {
        match self {
            GatewayError::ParsingMessage => ResponseCode::ParsingMessage,
            GatewayError::AgentNotAllowed { .. } | GatewayError::ChannelNotAllowed { .. } => {
                ResponseCode::BankUnknown
            }
            GatewayError::SecureHash => ResponseCode::SecureHash,
            GatewayError::NotFound => ResponseCode::NotFound,
            GatewayError::AlreadyPaid => ResponseCode::AlreadyPaid,
            GatewayError::WrongPaymentAmount { .. } => ResponseCode::WrongPaymentAmount,
            GatewayError::Database(_) => ResponseCode::Database,
        }
    }

    /// HTTP status the error is delivered with.
    pub fn http_status(&self) -> u16 {
        self.response_code().http_status()
    }

    /// Whether the bank request should be written to the audit log.
    ///
    /// Malformed messages carry nothing worth reconciling.
    pub fn is_audited(&self) -> bool {
        !matches!(self, GatewayError::ParsingMessage)
    }

    /// Renders the `{ rc, message }` body.
    pub fn to_response(&self) -> BillerResponse {
        BillerResponse::error(self.response_code(), self.to_string())
    }
}

impl From<RepoError> for GatewayError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => GatewayError::NotFound,
            other => GatewayError::Database(other.to_string()),
        }
    }
}
