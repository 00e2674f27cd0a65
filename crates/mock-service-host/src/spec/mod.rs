//! Specification engine seam.
//!
//! The coordinator only talks to the traits in this module:
//! - `LiveValidator`: parses and validates live requests against loaded specs
//! - `OperationSearcher`: the operation index behind the validator
//!
//! `SpecCatalog` is the in-repo implementation, backed by Swagger 2.0 documents
//! read from a local directory.

mod catalog;
mod template;

pub use catalog::SpecCatalog;
pub use template::PathTemplate;

use crate::errors::MockError;
use crate::models::{LiveRequest, QueryValue};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Api-version sentinel that matches operations of any version
pub const UNKNOWN_API_VERSION: &str = "unknown-api-version";

/// Provider namespace reported when the path has no `providers/{ns}` pair
pub const UNKNOWN_PROVIDER_NAMESPACE: &str = "microsoft.unknown";

/// Runtime exception code for an ambiguous (but acceptable) match
pub const MULTIPLE_OPERATIONS_FOUND: &str = "MultipleOperationsFound";

pub const OPERATION_NOT_FOUND: &str = "OperationNotFound";

pub const API_VERSION_NOT_FOUND: &str = "ApiVersionNotFound";

/// Errors raised while loading specification documents
#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },
    #[error("Invalid path template '{template}' in {path}: {message}")]
    Template {
        path: String,
        template: String,
        message: String,
    },
    #[error("Spec directory {0} does not exist")]
    MissingDirectory(String),
}

/// Request reduced to what operation search needs
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationRequest {
    /// Lower-cased; `UNKNOWN_PROVIDER_NAMESPACE` when absent
    pub provider_namespace: String,
    /// `type/subtype` after the namespace, empty when absent
    pub resource_type: String,
    pub api_version: String,
    /// Upper-cased
    pub request_method: String,
    /// Pure path, no query
    pub path: String,
    pub query: HashMap<String, QueryValue>,
    pub correlation_id: String,
}

/// Where a declared parameter is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Body,
    Other,
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
}

/// One endpoint + method from a loaded document
#[derive(Debug, Clone)]
pub struct Operation {
    pub operation_id: String,
    /// Upper-cased
    pub method: String,
    pub path_template: PathTemplate,
    pub api_version: String,
    pub provider_namespace: String,
    pub long_running: bool,
    pub parameters: Vec<Parameter>,
    /// Declared response status keys (`"200"`, `"default"`, ...)
    pub responses: Vec<String>,
    /// Example documents by name (each with a `responses` map)
    pub examples: BTreeMap<String, Value>,
}

/// An operation resolved against a concrete request
#[derive(Debug, Clone)]
pub struct OperationMatch {
    pub operation: Arc<Operation>,
    pub api_version: String,
}

/// Why a search came back empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchReason {
    pub code: String,
    pub message: String,
}

impl From<SearchReason> for MockError {
    fn from(reason: SearchReason) -> Self {
        MockError::ResolutionFailure {
            code: reason.code,
            message: reason.message,
        }
    }
}

/// Output of `OperationSearcher::get_potential_operations`
#[derive(Debug, Clone, Default)]
pub struct PotentialOperations {
    pub matches: Vec<OperationMatch>,
    pub reason: Option<SearchReason>,
    /// Version the search ran under
    pub api_version: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RuntimeException {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ValidationIssue {
    pub code: String,
    pub message: String,
}

/// Outcome of validating a live request
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_successful: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_exception: Option<RuntimeException>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub request_validation_result: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn success() -> Self {
        Self {
            is_successful: true,
            ..Default::default()
        }
    }

    pub fn exception(code: &str, message: impl Into<String>) -> Self {
        Self {
            is_successful: false,
            runtime_exception: Some(RuntimeException {
                code: code.to_string(),
                message: message.into(),
            }),
            request_validation_result: Vec::new(),
        }
    }

    /// Successful, or ambiguous in a way the resolver can settle
    pub fn is_acceptable(&self) -> bool {
        self.is_successful
            || self
                .runtime_exception
                .as_ref()
                .is_some_and(|e| e.code == MULTIPLE_OPERATIONS_FOUND)
    }
}

/// Operation index
pub trait OperationSearcher: Send + Sync {
    fn get_potential_operations(&self, request: &ValidationRequest) -> PotentialOperations;
}

/// Specification-backed request validator
#[async_trait]
pub trait LiveValidator: Send + Sync {
    fn parse_validation_request(
        &self,
        url: &str,
        method: &str,
        correlation_id: &str,
    ) -> Result<ValidationRequest, MockError>;

    async fn validate_live_request(&self, request: &LiveRequest) -> ValidationResult;

    fn operation_searcher(&self) -> &dyn OperationSearcher;
}

/// Default parsing shared by validator implementations.
///
/// Accepts an absolute URL or a bare path.
pub fn parse_validation_request(
    url: &str,
    method: &str,
    correlation_id: &str,
) -> Result<ValidationRequest, MockError> {
    let uri: hyper::Uri = url
        .parse()
        .map_err(|e| MockError::InvalidRequest(format!("'{url}': {e}")))?;
    let path = uri.path().to_string();
    let query = uri
        .query()
        .map(crate::models::parse_query_string)
        .unwrap_or_default();

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let provider_pos = segments
        .iter()
        .rposition(|s| s.eq_ignore_ascii_case("providers"))
        .filter(|&pos| pos + 1 < segments.len());

    let (provider_namespace, resource_type) = match provider_pos {
        Some(pos) => {
            let types: Vec<&str> = segments[pos + 2..].iter().step_by(2).copied().collect();
            (segments[pos + 1].to_lowercase(), types.join("/").to_lowercase())
        }
        None => (UNKNOWN_PROVIDER_NAMESPACE.to_string(), String::new()),
    };

    let api_version = query
        .get("api-version")
        .map(|v| v.first().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| UNKNOWN_API_VERSION.to_string());

    Ok(ValidationRequest {
        provider_namespace,
        resource_type,
        api_version,
        request_method: method.to_uppercase(),
        path,
        query,
        correlation_id: correlation_id.to_string(),
    })
}
