//! Audit sink port.
//!
//! Rejections and settlement failures are recorded together with the raw
//! bank request so disputes can be reconciled later.

use serde_json::Value;

use crate::dto::BillerResponse;

/// Destination for (bank request, response) audit pairs.
pub trait AuditSink: Send + Sync + 'static {
    /// Records one rejected or failed exchange.
    fn record(&self, bank_request: &Value, response: &BillerResponse);
}
