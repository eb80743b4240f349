use anyhow::{Context, Result, anyhow};
use bytes::Bytes;
use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::{debug, error, warn};

use shared::types::ErrorBody;

use crate::HttpResponse;
use crate::handlers::http::utils::deliver_page::full;

/// Serialize any `Serialize` type and deliver it as a JSON response.
/// This is the primary helper all handlers should use instead of
/// writing their own one-off serialization + response-building blocks.
pub fn deliver_serialized_json<T: Serialize>(data: &T, status: StatusCode) -> Result<HttpResponse> {
    let json = serde_json::to_string(data).context("Failed to serialize response")?;

    debug!("Delivering serialized JSON response, size: {} bytes", json.len());

    let response = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(full(json))
        .map_err(|e| anyhow!("Failed to build JSON response: {}", e))?;

    Ok(response)
}

/// Same as [`deliver_serialized_json`] with an extra `Set-Cookie` header.
pub fn deliver_json_with_cookie<T: Serialize>(
    data: &T,
    status: StatusCode,
    cookie: HeaderValue,
) -> Result<HttpResponse> {
    let mut response = deliver_serialized_json(data, status)?;
    response.headers_mut().insert(header::SET_COOKIE, cookie);
    Ok(response)
}

/// Delivers a `{"error": message}` response with the given status.
pub fn deliver_error_json(message: &str, status: StatusCode) -> Result<HttpResponse> {
    if status.is_server_error() {
        error!("Delivering error JSON: {} ({})", status.as_u16(), message);
    } else {
        warn!("Delivering error JSON: {} ({})", status.as_u16(), message);
    }

    deliver_serialized_json(&ErrorBody::new(message), status)
}

/// Infallible `{"error": message}` response for middleware and fallbacks,
/// where there is no caller left to hand an error to.
pub fn error_response(status: StatusCode, message: &str) -> HttpResponse {
    let body = serde_json::json!({ "error": message }).to_string();

    let mut response = Response::new(full(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}
