//! Inbound request validation.
//!
//! Checks run in a fixed order and the first failure wins:
//! 1. completeness of the required fields
//! 2. collecting agent allow-list
//! 3. channel allow-list
//! 4. H2H checksum

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use biller_types::security::{inquiry_checksum, payment_checksum, verify_checksum};
use biller_types::{
    GatewayConfig, GatewayError, InquiryRequest, PaymentRequest, ValidatedInquiry,
    ValidatedPayment,
};

/// Turns raw bank payloads into validated, typed requests.
#[derive(Debug, Clone)]
pub struct RequestValidator {
    config: Arc<GatewayConfig>,
}

impl RequestValidator {
    pub fn new(config: Arc<GatewayConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Validates an Inquiry payload.
    ///
    /// The checksum is not part of the completeness check for inquiries; a
    /// missing checksum fails the integrity step instead.
    pub fn validate_inquiry(&self, raw: &Value) -> Result<ValidatedInquiry, GatewayError> {
        let req: InquiryRequest = parse(raw)?;
        let inquiry = require_inquiry_fields(&req)?;

        self.check_allow_lists(&inquiry)?;

        let expected = inquiry_checksum(
            &inquiry.payer_reference,
            self.config.secret(),
            &inquiry.transaction_date,
        );
        check_checksum(&expected, req.checksum.as_deref())?;

        Ok(inquiry)
    }

    /// Validates a Payment payload.
    pub fn validate_payment(&self, raw: &Value) -> Result<ValidatedPayment, GatewayError> {
        let req: PaymentRequest = parse(raw)?;
        let inquiry = require_inquiry_fields(&req.inquiry)?;
        let invoice_id = required(&req.id_tagihan)?;
        let amount_text = required(&req.total_nominal)?;
        let journal_ref = required(&req.nomor_jurnal_pembukuan)?;
        let checksum = required(&req.inquiry.checksum)?;
        let amount = parse_amount(amount_text)?;

        self.check_allow_lists(&inquiry)?;

        // The digest covers the amount exactly as the bank sent it.
        let expected = payment_checksum(
            &inquiry.payer_reference,
            self.config.secret(),
            &inquiry.transaction_date,
            amount_text,
            journal_ref,
        );
        check_checksum(&expected, Some(checksum))?;

        Ok(ValidatedPayment {
            inquiry,
            invoice_id: invoice_id.to_string(),
            amount,
            journal_ref: journal_ref.to_string(),
        })
    }

    fn check_allow_lists(&self, inquiry: &ValidatedInquiry) -> Result<(), GatewayError> {
        if !self.config.accepts_collecting_agent(&inquiry.bank_code) {
            return Err(GatewayError::AgentNotAllowed {
                biller: self.config.biller_name().to_string(),
            });
        }

        if !self.config.accepts_channel(&inquiry.channel_code) {
            return Err(GatewayError::ChannelNotAllowed {
                biller: self.config.biller_name().to_string(),
            });
        }

        Ok(())
    }
}

fn parse<T: DeserializeOwned>(raw: &Value) -> Result<T, GatewayError> {
    if !raw.is_object() {
        return Err(GatewayError::ParsingMessage);
    }
    serde_json::from_value(raw.clone()).map_err(|_| GatewayError::ParsingMessage)
}

fn required(field: &Option<String>) -> Result<&str, GatewayError> {
    field.as_deref().ok_or(GatewayError::ParsingMessage)
}

fn require_inquiry_fields(req: &InquiryRequest) -> Result<ValidatedInquiry, GatewayError> {
    Ok(ValidatedInquiry {
        bank_code: required(&req.kode_bank)?.to_string(),
        channel_code: required(&req.kode_channel)?.to_string(),
        biller_code: required(&req.kode_biller)?.to_string(),
        terminal_code: required(&req.kode_terminal)?.to_string(),
        payer_reference: required(&req.nomor_pembayaran)?.to_string(),
        transaction_date: required(&req.tanggal_transaksi)?.to_string(),
        transaction_id: required(&req.id_transaksi)?.to_string(),
    })
}

/// Amounts are plain unsigned decimal integers in minor units.
fn parse_amount(text: &str) -> Result<u64, GatewayError> {
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GatewayError::ParsingMessage);
    }
    text.parse().map_err(|_| GatewayError::ParsingMessage)
}

fn check_checksum(expected: &str, supplied: Option<&str>) -> Result<(), GatewayError> {
    match supplied {
        Some(supplied) if verify_checksum(expected, supplied) => Ok(()),
        _ => Err(GatewayError::SecureHash),
    }
}
