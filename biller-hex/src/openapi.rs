//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use biller_types::dto::{
    BillerResponse, Informasi, InquiryRequest, PaymentRequest, ResponseCode, Rincian,
};
use utoipa::OpenApi;

// Dummy functions to generate path documentation
// These are not the actual handlers, just for OpenAPI path generation

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = inline(serde_json::Value), example = json!({"status": "healthy"}))
    )
)]
async fn health() {}

/// Look up the outstanding bill for a payer
#[utoipa::path(
    post,
    path = "/inquiry",
    tag = "h2h",
    request_body = InquiryRequest,
    responses(
        (status = 200, description = "Outstanding bill found, or all bills already paid (ERR-ALREADY-PAID)", body = BillerResponse),
        (status = 404, description = "Billing number not found", body = BillerResponse),
        (status = 406, description = "Malformed message, unknown agent or channel, or invalid checksum", body = BillerResponse),
        (status = 429, description = "Rate limit exceeded", body = BillerResponse),
        (status = 500, description = "Repository failure", body = BillerResponse)
    )
)]
async fn inquiry() {}

/// Settle the outstanding bill for a payer
#[utoipa::path(
    post,
    path = "/payment",
    tag = "h2h",
    request_body = PaymentRequest,
    responses(
        (status = 200, description = "Bill settled, already paid (ERR-ALREADY-PAID) or amount mismatch (ERR-WRONG-PAYMENT-AMOUNT)", body = BillerResponse),
        (status = 404, description = "Billing number not found", body = BillerResponse),
        (status = 406, description = "Malformed message, unknown agent or channel, or invalid checksum", body = BillerResponse),
        (status = 429, description = "Rate limit exceeded", body = BillerResponse),
        (status = 500, description = "Settlement failed", body = BillerResponse)
    )
)]
async fn payment() {}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "H2H Biller Gateway API",
        version = "1.0.0",
        description = "Host-to-host endpoints through which collecting-agent banks query and settle bills.\n\n## Integrity\n\nEvery request carries a lowercase hex SHA-1 `checksum`:\n\n```\ninquiry: sha1(nomorPembayaran + secret + tanggalTransaksi)\npayment: sha1(nomorPembayaran + secret + tanggalTransaksi + totalNominal + nomorJurnalPembukuan)\n```",
        license(name = "MIT"),
    ),
    paths(health, inquiry, payment),
    components(
        schemas(
            InquiryRequest,
            PaymentRequest,
            BillerResponse,
            ResponseCode,
            Informasi,
            Rincian,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "h2h", description = "Inquiry and payment operations for collecting agents"),
    )
)]
pub struct ApiDoc;
