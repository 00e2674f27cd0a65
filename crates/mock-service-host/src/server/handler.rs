//! Per-request handling for mock listeners.
//!
//! Converts a hyper request into a `VirtualServerRequest`, runs the pipeline
//! and writes the finalized `VirtualServerResponse` (or the mapped error) back.

use crate::config::Protocol;
use crate::coordinator::Coordinator;
use crate::errors::MockError;
use crate::metrics;
use crate::models::{TestProfile, VirtualServerRequest, VirtualServerResponse};
use crate::response::{build_response_with_headers, collect_body, mock_error_response, APPLICATION_JSON};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{HeaderMap, Request, Response, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything a listener's requests share
#[derive(Clone)]
pub struct ListenerContext {
    pub coordinator: Arc<Coordinator>,
    pub protocol: Protocol,
    pub profile: TestProfile,
}

pub async fn handle_request(
    req: Request<Incoming>,
    ctx: ListenerContext,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().as_str().to_string();
    let url = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let headers = lowercase_headers(req.headers());

    let response = match collect_body(req).await {
        Ok(bytes) => {
            let mut mock_req = VirtualServerRequest::new(ctx.protocol.as_str(), &method, &url);
            mock_req.headers = headers;
            mock_req.body = parse_body(&bytes);
            answer(&ctx, &mock_req).await
        }
        Err(e) => fail(&method, &url, &MockError::InvalidRequest(e)),
    };

    metrics::record_request(&method, response.status().as_u16());
    Ok(response)
}

async fn answer(ctx: &ListenerContext, req: &VirtualServerRequest) -> Response<Full<Bytes>> {
    let mut res = VirtualServerResponse::new();
    match ctx
        .coordinator
        .generate_response(req, &mut res, &ctx.profile)
        .await
    {
        Ok(()) if res.is_finalized() => {
            debug!("{} {} -> {:?}", req.method, req.url, res.status);
            to_http_response(&res)
        }
        Ok(()) => fail(&req.method, &req.url, &MockError::NoResponse("200".to_string())),
        Err(e) => fail(&req.method, &req.url, &e),
    }
}

fn fail(method: &str, url: &str, err: &MockError) -> Response<Full<Bytes>> {
    warn!("{} {} rejected: {} ({})", method, url, err, err.code());
    metrics::record_pipeline_error(err.code());
    mock_error_response(err)
}

/// Header names lower-cased; values that are not visible ASCII are dropped
fn lowercase_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect()
}

/// JSON request body; empty or malformed bodies are treated as absent
fn parse_body(bytes: &Bytes) -> Option<Value> {
    if bytes.is_empty() {
        return None;
    }
    serde_json::from_slice(bytes).ok()
}

/// Serialize a finalized response. 204 carries no body.
pub fn to_http_response(res: &VirtualServerResponse) -> Response<Full<Bytes>> {
    let status = res
        .status
        .and_then(|s| StatusCode::from_u16(s).ok())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = if status == StatusCode::NO_CONTENT {
        Bytes::new()
    } else {
        Bytes::from(serde_json::to_vec(&res.body).unwrap_or_default())
    };
    let headers = std::iter::once(("Content-Type", APPLICATION_JSON)).chain(
        res.headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str())),
    );
    build_response_with_headers(status, headers, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::json;

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(&Bytes::from_static(b"")), None);
        assert_eq!(parse_body(&Bytes::from_static(b"not json")), None);
        assert_eq!(
            parse_body(&Bytes::from_static(br#"{"location":"eastus"}"#)),
            Some(json!({"location": "eastus"}))
        );
    }

    #[test]
    fn test_lowercase_headers() {
        let mut map = HeaderMap::new();
        let name = hyper::header::HeaderName::from_bytes(b"X-Ms-Client-Request-Id").unwrap();
        map.insert(name, "abc".parse().unwrap());
        let headers = lowercase_headers(&map);
        assert_eq!(headers["x-ms-client-request-id"], "abc");
    }

    #[tokio::test]
    async fn test_to_http_response_with_lro_headers() {
        let mut res = VirtualServerResponse::new();
        res.set_header("Azure-AsyncOperation", "http://localhost/poll");
        res.set_header("Retry-After", "1");
        res.set(201, json!({"name": "f1"}));
        let resp = to_http_response(&res);
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(resp.headers()["content-type"], APPLICATION_JSON);
        assert_eq!(resp.headers()["azure-asyncoperation"], "http://localhost/poll");
        assert_eq!(resp.headers()["retry-after"], "1");
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!({"name": "f1"}));
    }

    #[tokio::test]
    async fn test_no_content_has_empty_body() {
        let mut res = VirtualServerResponse::new();
        res.set(204, json!({}));
        let resp = to_http_response(&res);
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }
}
