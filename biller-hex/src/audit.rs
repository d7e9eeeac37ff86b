//! Audit sink backed by `tracing`.

use serde_json::Value;

use biller_types::{AuditSink, BillerResponse};

/// Log target for audit records, filterable with `RUST_LOG=biller_audit=error`.
pub const AUDIT_TARGET: &str = "biller_audit";

/// Writes every audited exchange as an error-level event under [`AUDIT_TARGET`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, bank_request: &Value, response: &BillerResponse) {
        let response_json = serde_json::to_string(response).unwrap_or_default();
        tracing::error!(
            target: AUDIT_TARGET,
            rc = %response.rc,
            bank_request = %bank_request,
            response = %response_json,
            "{}",
            response.message
        );
    }
}
