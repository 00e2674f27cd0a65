//! Error kinds raised by the request pipeline.
//!
//! Every variant is request-scoped: the host translates it into an HTTP status
//! and an ARM-style error body, and the process keeps serving.

use hyper::StatusCode;
use serde::Serialize;

/// Pipeline failure for a single request
#[derive(Debug, Clone, thiserror::Error)]
pub enum MockError {
    /// No operation matched, even after the api-version fallback
    #[error("{message}")]
    ResolutionFailure { code: String, message: String },
    /// The validator rejected the request and no special endpoint applies
    #[error("Request validation failed: {0}")]
    ValidationFail(String),
    /// The test profile asked for a forced failure
    #[error("Intentional error requested by the test profile")]
    IntentionalError,
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),
    #[error("Parent resource does not exist: {0}")]
    NoParentResource(String),
    #[error("Resource still has child resources: {0}")]
    HasChildResource(String),
    #[error("No example response available (wanted status {0})")]
    NoResponse(String),
    #[error("No pollable GET operation found. {0}")]
    LroCallbackNotFound(String),
    /// Specs are not loaded yet, or the last load failed
    #[error("{0}")]
    ValidatorNotReady(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl MockError {
    /// Stable error code used in response bodies and metric labels
    pub fn code(&self) -> &str {
        match self {
            MockError::ResolutionFailure { code, .. } => code,
            MockError::ValidationFail(_) => "ValidationFail",
            MockError::IntentionalError => "IntentionalError",
            MockError::ResourceNotFound(_) => "ResourceNotFound",
            MockError::NoParentResource(_) => "NoParentResource",
            MockError::HasChildResource(_) => "HasChildResource",
            MockError::NoResponse(_) => "NoResponse",
            MockError::LroCallbackNotFound(_) => "LroCallbackNotFound",
            MockError::ValidatorNotReady(_) => "ValidatorNotReady",
            MockError::InvalidRequest(_) => "InvalidRequest",
        }
    }

    /// HTTP status the host answers with
    pub fn status_code(&self) -> StatusCode {
        match self {
            MockError::ResolutionFailure { .. }
            | MockError::ValidationFail(_)
            | MockError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            MockError::ResourceNotFound(_) | MockError::NoParentResource(_) => {
                StatusCode::NOT_FOUND
            }
            MockError::HasChildResource(_) => StatusCode::CONFLICT,
            MockError::IntentionalError
            | MockError::NoResponse(_)
            | MockError::LroCallbackNotFound(_) => StatusCode::INTERNAL_SERVER_ERROR,
            MockError::ValidatorNotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// ARM-style error envelope: `{"error": {"code": ..., "message": ...}}`
    pub fn to_body(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        }
    }
}

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorDetail,
}

/// Individual error detail
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}
