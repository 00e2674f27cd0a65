//! Poll-URL discovery for long-running operations.

use crate::errors::MockError;
use crate::metrics;
use crate::models::{parse_query_string, LiveRequest, VirtualServerRequest};
use crate::spec::LiveValidator;
use serde_json::Value;
use tracing::debug;

/// Query flag marking a request as an LRO poll callback
pub const LRO_CALLBACK: &str = "lro-callback";

pub const AZURE_ASYNC_OPERATION: &str = "Azure-AsyncOperation";

pub const RETRY_AFTER: &str = "Retry-After";

/// Query string of a poll URL: the request's own query plus `lro-callback=true`
fn callback_query(url: &str) -> String {
    let flag = format!("{LRO_CALLBACK}=true");
    match url.split_once('?') {
        Some((_, query)) if query.split('&').any(|pair| pair == flag) => query.to_string(),
        Some((_, query)) if !query.is_empty() => format!("{query}&{flag}"),
        _ => flag,
    }
}

/// Find a GET operation the client can poll for the outcome of `req`.
///
/// Candidates are the request path and its ancestors. After the path itself,
/// only prefixes with an odd number of `/`-separated parts (counting the leading
/// empty one) are tried, which keeps probes on `type/name` boundaries. The first
/// candidate the validator accepts as a GET is returned as an absolute URL.
pub async fn find_lro_get(
    validator: &dyn LiveValidator,
    req: &VirtualServerRequest,
) -> Result<String, MockError> {
    let query = callback_query(&req.url);
    let parsed_query = parse_query_string(&query);
    let path = crate::utils::get_pure_url(&req.url);
    let mut uri_path: Vec<&str> = path.split('/').collect();
    let origin = req.origin();

    let mut first = true;
    while !uri_path.is_empty() {
        if first || uri_path.len() % 2 == 1 {
            let joined = uri_path.join("/");
            let candidate_path = if joined.is_empty() { "/" } else { joined.as_str() };
            let testing_url = format!("{origin}{candidate_path}?{query}");
            let probe = LiveRequest {
                url: testing_url.clone(),
                method: "GET".to_string(),
                headers: req.headers.clone(),
                query: parsed_query.clone(),
                body: Some(Value::Object(Default::default())),
            };
            let result = validator.validate_live_request(&probe).await;
            metrics::record_lro_probe(result.is_successful);
            if result.is_successful {
                debug!("LRO poll URL for {} {}: {}", req.method, req.url, testing_url);
                return Ok(testing_url);
            }
        }
        uri_path.pop();
        first = false;
    }

    Err(MockError::LroCallbackNotFound(format!(
        "Lro operation: {} {}",
        req.method, req.url
    )))
}
