//! Admin REST API for the mock service host.
//!
//! Separate listener (default port 2525) exposing:
//! - health and readiness of the Swagger validator
//! - Prometheus metrics
//! - resource pool inspection and reset
//! - spec reload

mod handlers;
mod router;
mod server;

pub use router::route_request;
pub use server::AdminApiServer;
