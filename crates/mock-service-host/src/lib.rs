//! Mock of a cloud resource-management control plane.
//!
//! Requests are validated against locally loaded API specifications, answered
//! from the matched operation's examples, and optionally tracked in a resource
//! pool so that create/read/delete sequences behave like the real service.

pub mod admin_api;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod resource;
pub mod responder;
pub mod response;
pub mod server;
pub mod spec;
pub mod utils;

pub use config::Config;
pub use coordinator::{Coordinator, ValidatorStatus};
pub use errors::MockError;
pub use server::MockServer;
