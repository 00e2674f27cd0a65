//! HTTP response helpers shared by the mock listeners and the admin API.

use crate::errors::{ErrorDetail, ErrorEnvelope, MockError};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Serialize;

pub const APPLICATION_JSON: &str = "application/json";

/// Response with the given status, headers and body.
///
/// Header pairs hyper cannot represent turn the whole response into a bare 500.
pub fn build_response_with_headers(
    status: StatusCode,
    headers: impl IntoIterator<Item = (impl AsRef<str>, impl AsRef<str>)>,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(status);
    for (key, value) in headers {
        builder = builder.header(key.as_ref(), value.as_ref());
    }
    builder
        .body(Full::new(body.into()))
        .unwrap_or_else(|_| internal_error())
}

fn internal_error() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from("Internal Server Error")));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

/// Compact JSON body with `Content-Type: application/json`
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    build_response_with_headers(status, [("Content-Type", APPLICATION_JSON)], json)
}

/// Create an ARM-style error response
pub fn error_response(status: StatusCode, code: &str, message: &str) -> Response<Full<Bytes>> {
    let envelope = ErrorEnvelope {
        error: ErrorDetail {
            code: code.to_string(),
            message: message.to_string(),
        },
    };
    json_response(status, &envelope)
}

/// Answer a pipeline failure with its mapped status
pub fn mock_error_response(err: &MockError) -> Response<Full<Bytes>> {
    json_response(err.status_code(), &err.to_body())
}

/// 404 for unknown admin routes
pub fn not_found() -> Response<Full<Bytes>> {
    error_response(StatusCode::NOT_FOUND, "NotFound", "Not Found")
}

/// Read the whole request body
pub async fn collect_body(req: Request<Incoming>) -> Result<Bytes, String> {
    req.collect()
        .await
        .map(|c| c.to_bytes())
        .map_err(|e| format!("Failed to read request body: {e}"))
}
