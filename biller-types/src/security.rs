//! H2H checksum primitives.
//!
//! The checksum is a SHA-1 digest over a plain concatenation of request
//! fields with the shared secret spliced in after the payer reference. It is
//! kept byte-for-byte compatible with what the collecting agents compute.

use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;

/// Lowercase hex SHA-1 over the concatenation of `parts`, no delimiters.
pub fn digest(parts: &[&str]) -> String {
    let mut hasher = Sha1::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Inquiry checksum: `payerReference ++ secret ++ transactionDate`.
pub fn inquiry_checksum(payer_reference: &str, secret: &str, transaction_date: &str) -> String {
    digest(&[payer_reference, secret, transaction_date])
}

/// Payment checksum:
/// `payerReference ++ secret ++ transactionDate ++ amount ++ journalRef`.
pub fn payment_checksum(
    payer_reference: &str,
    secret: &str,
    transaction_date: &str,
    amount: &str,
    journal_ref: &str,
) -> String {
    digest(&[payer_reference, secret, transaction_date, amount, journal_ref])
}

/// Compares a computed checksum with the caller-supplied one in constant time.
pub fn verify_checksum(expected: &str, supplied: &str) -> bool {
    expected.as_bytes().ct_eq(supplied.as_bytes()).into()
}
