//! Content-Type guard for the H2H endpoints.

use axum::{
    Json,
    body::Body,
    http::{Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use biller_types::GatewayError;

/// Accepts `application/json` with or without parameters such as `charset`.
fn is_json(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|value| value.split(';').next())
        .is_some_and(|media_type| media_type.trim().eq_ignore_ascii_case("application/json"))
}

/// Rejects POST requests whose body is not declared as JSON.
///
/// Requests other than POST (health, OpenAPI) pass through untouched.
pub async fn json_only_middleware(request: Request<Body>, next: Next) -> Response {
    if request.method() != Method::POST {
        return next.run(request).await;
    }

    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    if !is_json(content_type) {
        tracing::debug!(?content_type, "Rejected non-JSON request");
        let err = GatewayError::ParsingMessage;
        return (StatusCode::NOT_ACCEPTABLE, Json(err.to_response())).into_response();
    }

    next.run(request).await
}
