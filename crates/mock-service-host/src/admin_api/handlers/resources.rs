//! Resource pool inspection and reset.

use crate::coordinator::Coordinator;
use crate::response::json_response;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct ListResourcesResponse {
    pub resources: Vec<String>,
}

/// GET /resources
pub fn handle_list(coordinator: &Coordinator) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &ListResourcesResponse {
            resources: coordinator.resource_urls(),
        },
    )
}

/// POST /admin/reset - forget every created resource
pub fn handle_reset(coordinator: &Coordinator) -> Response<Full<Bytes>> {
    let removed = coordinator.resource_count();
    coordinator.initiate_resource_pool();
    info!("Admin API: resource pool reset ({} resources removed)", removed);
    json_response(StatusCode::OK, &serde_json::json!({"removed": removed}))
}
