//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use biller_types::{BillRepository, GatewayError};

use crate::BillerService;

/// Application state shared across handlers.
pub struct AppState<R: BillRepository> {
    pub service: BillerService<R>,
}

/// Wrapper to implement IntoResponse for GatewayError (orphan rule workaround).
pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, Json(self.0.to_response())).into_response()
    }
}

/// Parses the raw body; anything but valid JSON is a malformed message.
fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
    serde_json::from_slice(body).map_err(|_| ApiError(GatewayError::ParsingMessage))
}

/// Copies the request identifiers onto the handler span.
fn record_request_fields(raw: &Value) {
    let span = tracing::Span::current();
    for (field, key) in [
        ("bank", "kodeBank"),
        ("payer_reference", "nomorPembayaran"),
        ("transaction_id", "idTransaksi"),
    ] {
        match raw.get(key) {
            Some(Value::String(s)) => {
                span.record(field, s.as_str());
            }
            Some(other) => {
                span.record(field, tracing::field::display(other));
            }
            None => {}
        }
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// OpenAPI document.
pub async fn openapi() -> impl IntoResponse {
    use utoipa::OpenApi;
    Json(crate::openapi::ApiDoc::openapi())
}

/// Inquiry: report the outstanding bill for a payer.
#[tracing::instrument(
    skip(state, body),
    fields(
        bank = tracing::field::Empty,
        payer_reference = tracing::field::Empty,
        transaction_id = tracing::field::Empty
    )
)]
pub async fn inquiry<R: BillRepository>(
    State(state): State<Arc<AppState<R>>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let raw = parse_body(&body)?;
    record_request_fields(&raw);

    let response = state.service.inquiry(&raw).await?;
    Ok(Json(response))
}

/// Payment: settle the outstanding bill for a payer.
#[tracing::instrument(
    skip(state, body),
    fields(
        bank = tracing::field::Empty,
        payer_reference = tracing::field::Empty,
        transaction_id = tracing::field::Empty
    )
)]
pub async fn payment<R: BillRepository>(
    State(state): State<Arc<AppState<R>>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let raw = parse_body(&body)?;
    record_request_fields(&raw);

    let response = state.service.payment(&raw).await?;
    Ok(Json(response))
}
