//! Prometheus metrics for mock-service-host.
//!
//! Tracks answered requests, pipeline failures by kind, LRO poll-URL probing
//! and the size of the resource pool.
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_int_gauge, CounterVec, Encoder, IntGauge, TextEncoder,
};

lazy_static! {
    /// Total number of requests answered by mock listeners
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "mock_requests_total",
        "Total number of requests answered by mock listeners",
        &["method", "status"]
    )
    .unwrap();

    /// Pipeline failures by error code
    pub static ref PIPELINE_ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "mock_pipeline_errors_total",
        "Total number of requests aborted by the pipeline",
        &["kind"]
    )
    .unwrap();

    /// Candidate poll URLs submitted to the validator
    pub static ref LRO_PROBES_TOTAL: CounterVec = register_counter_vec!(
        "mock_lro_probes_total",
        "Total number of LRO poll-URL probes",
        &["result"]  // result: hit|miss
    )
    .unwrap();

    /// Resources currently held by the resource pool
    pub static ref RESOURCE_POOL_NODES: IntGauge = register_int_gauge!(
        "mock_resource_pool_nodes",
        "Number of resources currently tracked by the resource pool"
    )
    .unwrap();
}

/// Collect and return all metrics in Prometheus text format
pub fn collect_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Helper to record an answered request
pub fn record_request(method: &str, status: u16) {
    REQUESTS_TOTAL
        .with_label_values(&[method, &status.to_string()])
        .inc();
}

/// Helper to record a pipeline failure
pub fn record_pipeline_error(kind: &str) {
    PIPELINE_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

/// Helper to record one poll-URL probe
pub fn record_lro_probe(hit: bool) {
    LRO_PROBES_TOTAL
        .with_label_values(&[if hit { "hit" } else { "miss" }])
        .inc();
}

pub fn set_resource_pool_nodes(count: usize) {
    RESOURCE_POOL_NODES.set(count as i64);
}
