//! System handlers: health, metrics, spec reload.

use crate::coordinator::Coordinator;
use crate::metrics::collect_metrics;
use crate::response::{build_response_with_headers, error_response, json_response};
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::{error, info};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub validator_status: String,
    pub resources: usize,
}

/// GET /health - ready once specs are loaded
pub fn handle_health(coordinator: &Coordinator) -> Response<Full<Bytes>> {
    let validator_status = coordinator.validator_status();
    let (status, code) = if validator_status.is_ready() {
        ("ok", StatusCode::OK)
    } else {
        ("unavailable", StatusCode::SERVICE_UNAVAILABLE)
    };
    json_response(
        code,
        &HealthResponse {
            status,
            validator_status: validator_status.to_string(),
            resources: coordinator.resource_count(),
        },
    )
}

/// GET /metrics - Prometheus metrics
pub fn handle_metrics() -> Response<Full<Bytes>> {
    build_response_with_headers(
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        collect_metrics(),
    )
}

/// POST /admin/reload - load specs again
pub async fn handle_reload(coordinator: &Coordinator) -> Response<Full<Bytes>> {
    match coordinator.reload().await {
        Ok(operations) => {
            info!("Admin API: specs reloaded ({} operations)", operations);
            json_response(
                StatusCode::OK,
                &serde_json::json!({
                    "validatorStatus": coordinator.validator_status().to_string(),
                    "operations": operations
                }),
            )
        }
        Err(e) => {
            error!("Admin API: spec reload failed: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "ReloadFailed",
                &e.to_string(),
            )
        }
    }
}
