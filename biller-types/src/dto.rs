//! Data Transfer Objects (DTOs) for the H2H wire contract.
//!
//! Field names follow the contract the collecting-agent banks integrate
//! against, so they are kept verbatim on the wire.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::domain::Bill;

/// Accepts a JSON string or number and treats `null` and `""` as absent.
///
/// Banks are inconsistent about quoting numeric identifiers, so numbers are
/// kept in their canonical decimal text.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Inbound DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Inquiry request as sent by the bank.
///
/// Every field is optional at this stage; completeness is checked by the
/// request validator so that a missing field yields `ERR-PARSING-MESSAGE`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InquiryRequest {
    /// Collecting agent (bank) code
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    #[schema(example = "BSM")]
    pub kode_bank: Option<String>,
    /// Origination channel
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    #[schema(example = "TELLER")]
    pub kode_channel: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub kode_biller: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub kode_terminal: Option<String>,
    /// Payer reference (e.g. student number)
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    #[schema(example = "12345")]
    pub nomor_pembayaran: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    #[schema(example = "2024-01-10")]
    pub tanggal_transaksi: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub id_transaksi: Option<String>,
    /// Lowercase hex SHA-1 over the operation's canonical fields
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// Payment request as sent by the bank: the inquiry fields plus settlement data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    #[serde(flatten)]
    pub inquiry: InquiryRequest,
    /// Invoice being paid
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub id_tagihan: Option<String>,
    /// Paid amount in minor currency units
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    #[schema(example = "500000")]
    pub total_nominal: Option<String>,
    /// Bank journal/ledger reference
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    #[schema(example = "JRN001")]
    pub nomor_jurnal_pembukuan: Option<String>,
}

/// An inquiry that passed completeness, allow-list and checksum checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedInquiry {
    pub bank_code: String,
    pub channel_code: String,
    pub biller_code: String,
    pub terminal_code: String,
    pub payer_reference: String,
    pub transaction_date: String,
    pub transaction_id: String,
}

/// A payment that passed completeness, allow-list and checksum checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPayment {
    pub inquiry: ValidatedInquiry,
    pub invoice_id: String,
    pub amount: u64,
    pub journal_ref: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Outbound DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Value of the `rc` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ResponseCode {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ERR-PARSING-MESSAGE")]
    ParsingMessage,
    #[serde(rename = "ERR-BANK-UNKNOWN")]
    BankUnknown,
    #[serde(rename = "ERR-SECURE-HASH")]
    SecureHash,
    #[serde(rename = "ERR-NOT-FOUND")]
    NotFound,
    #[serde(rename = "ERR-ALREADY-PAID")]
    AlreadyPaid,
    #[serde(rename = "ERR-WRONG-PAYMENT-AMOUNT")]
    WrongPaymentAmount,
    #[serde(rename = "ERR-DB")]
    Database,
    #[serde(rename = "ERR-RATE-LIMITED")]
    RateLimited,
}

impl ResponseCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseCode::Ok => "OK",
            ResponseCode::ParsingMessage => "ERR-PARSING-MESSAGE",
            ResponseCode::BankUnknown => "ERR-BANK-UNKNOWN",
            ResponseCode::SecureHash => "ERR-SECURE-HASH",
            ResponseCode::NotFound => "ERR-NOT-FOUND",
            ResponseCode::AlreadyPaid => "ERR-ALREADY-PAID",
            ResponseCode::WrongPaymentAmount => "ERR-WRONG-PAYMENT-AMOUNT",
            ResponseCode::Database => "ERR-DB",
            ResponseCode::RateLimited => "ERR-RATE-LIMITED",
        }
    }

    /// HTTP status for this code.
    ///
    /// Already-paid and wrong-amount are delivered with 200, matching what
    /// integrated banks expect.
    pub fn http_status(&self) -> u16 {
        match self {
            ResponseCode::Ok | ResponseCode::AlreadyPaid | ResponseCode::WrongPaymentAmount => 200,
            ResponseCode::ParsingMessage | ResponseCode::BankUnknown | ResponseCode::SecureHash => {
                406
            }
            ResponseCode::NotFound => 404,
            ResponseCode::RateLimited => 429,
            ResponseCode::Database => 500,
        }
    }
}

impl std::fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-text information block shown by the bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Informasi {
    #[schema(example = "SPP Januari 2024")]
    pub info1: String,
}

/// Itemized breakdown line of a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Rincian {
    #[schema(example = "TAGIHAN")]
    pub kode_rincian: String,
    #[schema(example = "TAGIHAN SPP")]
    pub deskripsi: String,
    #[schema(example = 500000)]
    pub nominal: u64,
}

/// Response body for both Inquiry and Payment.
///
/// Errors carry only `rc` and `message`; successes add the bill payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BillerResponse {
    pub rc: ResponseCode,
    #[schema(example = "Inquiry Success")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_tagihan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nomor_pembayaran: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_pelanggan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nama: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_nominal: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub informasi: Option<Informasi>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rincian: Option<Vec<Rincian>>,
}

/// Item code used for the single bill line in `rincian`.
pub const BILL_ITEM_CODE: &str = "TAGIHAN";

impl BillerResponse {
    /// Error body with no bill payload.
    pub fn error(rc: ResponseCode, message: impl Into<String>) -> Self {
        Self {
            rc,
            message: message.into(),
            id_tagihan: None,
            nomor_pembayaran: None,
            id_pelanggan: None,
            nama: None,
            total_nominal: None,
            informasi: None,
            rincian: None,
        }
    }

    /// Successful inquiry payload for an outstanding bill.
    pub fn inquiry(bill: &Bill) -> Self {
        Self {
            rc: ResponseCode::Ok,
            message: "Inquiry Success".to_string(),
            id_tagihan: Some(bill.invoice_id.clone()),
            nomor_pembayaran: Some(bill.payer_reference.clone()),
            id_pelanggan: Some(bill.payer_reference.clone()),
            nama: Some(bill.payer_name.clone()),
            total_nominal: Some(bill.amount_due),
            informasi: Some(Informasi {
                info1: bill.description.clone(),
            }),
            rincian: None,
        }
    }

    /// Successful payment payload: the inquiry payload plus the item breakdown.
    pub fn payment(bill: &Bill, item_description: &str) -> Self {
        Self {
            message: "Payment Success".to_string(),
            rincian: Some(vec![Rincian {
                kode_rincian: BILL_ITEM_CODE.to_string(),
                deskripsi: item_description.to_string(),
                nominal: bill.amount_due,
            }]),
            ..Self::inquiry(bill)
        }
    }

    pub fn is_ok(&self) -> bool {
        self.rc == ResponseCode::Ok
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Back-office DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to register a new outstanding bill.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateBillRequest {
    #[schema(example = "INV0001")]
    pub invoice_id: String,
    #[schema(example = "12345")]
    pub payer_reference: String,
    #[schema(example = "Siti Aminah")]
    pub payer_name: String,
    #[schema(value_type = String, example = "2024-01-05")]
    pub invoice_date: NaiveDate,
    #[schema(example = 500000)]
    pub amount_due: u64,
    #[schema(example = "SPP Januari 2024")]
    pub description: String,
}
