//! Request pipeline.
//!
//! The `Coordinator` owns the loaded validator and the resource pool and turns
//! every inbound request into either a finalized response or a `MockError`:
//!
//! 1. validate the request against the loaded specs
//! 2. resolve the operation (with api-version fallback) and fetch its examples,
//!    or answer a well-known infrastructure endpoint
//! 3. enforce the resource lifecycle for stateful profiles
//! 4. pick and rewrite the example response, attaching LRO headers

mod lro;
mod mutate;
mod search;
mod specials;

#[cfg(test)]
mod tests;

pub use lro::{find_lro_get, AZURE_ASYNC_OPERATION, LRO_CALLBACK, RETRY_AFTER};
pub use mutate::{finalize_body, find_response, is_async_status, prepare_body};
pub use search::search;
pub use specials::{handle_specials, PLACEHOLDER_ID};

use crate::config::Config;
use crate::errors::MockError;
use crate::metrics;
use crate::models::{TestProfile, VirtualServerRequest, VirtualServerResponse};
use crate::resource::ResourcePool;
use crate::responder::{ExampleResponses, ResponseGenerator};
use crate::spec::{LiveValidator, SpecCatalog};
use crate::utils::{get_path, get_pure_url, is_management_url_level};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Readiness of the Swagger-backed validator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorStatus {
    NotInitialized,
    Initialized,
    InitializationFailed,
}

impl ValidatorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidatorStatus::NotInitialized => "Validator not initialized",
            ValidatorStatus::Initialized => "Validator initialized",
            ValidatorStatus::InitializationFailed => "Validator initialization failure",
        }
    }

    pub fn is_ready(&self) -> bool {
        *self == ValidatorStatus::Initialized
    }
}

impl fmt::Display for ValidatorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orchestrates validation, resolution, lifecycle and response rewriting
pub struct Coordinator {
    config: Arc<Config>,
    responder: Arc<dyn ResponseGenerator>,
    validator: RwLock<Option<Arc<dyn LiveValidator>>>,
    status: RwLock<ValidatorStatus>,
    resource_pool: Mutex<ResourcePool>,
}

impl Coordinator {
    /// Create a coordinator with no validator loaded yet
    pub fn new(config: Arc<Config>, responder: Arc<dyn ResponseGenerator>) -> Self {
        let resource_pool = ResourcePool::new(config.cascade_enabled);
        Self {
            config,
            responder,
            validator: RwLock::new(None),
            status: RwLock::new(ValidatorStatus::NotInitialized),
            resource_pool: Mutex::new(resource_pool),
        }
    }

    /// Create a coordinator around an already loaded validator
    pub fn with_validator(
        config: Arc<Config>,
        responder: Arc<dyn ResponseGenerator>,
        validator: Arc<dyn LiveValidator>,
    ) -> Self {
        let coordinator = Self::new(config, responder);
        *coordinator.validator.write() = Some(validator);
        *coordinator.status.write() = ValidatorStatus::Initialized;
        coordinator
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn validator_status(&self) -> ValidatorStatus {
        *self.status.read()
    }

    /// Snapshot of the current validator
    pub fn validator(&self) -> Option<Arc<dyn LiveValidator>> {
        self.validator.read().clone()
    }

    /// Load specs from the configured directory unless already loaded.
    ///
    /// A failure is logged and leaves the coordinator not ready.
    pub async fn initialize(&self) {
        if self.validator.read().is_some() {
            return;
        }
        if let Err(e) = self.reload().await {
            error!("Validator: unable to load specs. Error: {}", e);
        }
    }

    /// Load specs again and swap the validator in on success.
    ///
    /// Returns the number of operations loaded. On failure the previous
    /// validator, if any, keeps serving.
    pub async fn reload(&self) -> Result<usize, anyhow::Error> {
        let directory = self.config.specs.directory.clone();
        info!("Loading specs from {}", directory.display());
        let loaded = tokio::task::spawn_blocking(move || SpecCatalog::load_dir(&directory)).await;

        let catalog = match loaded {
            Ok(Ok(catalog)) => catalog,
            Ok(Err(e)) => return Err(self.load_failed(e.into())),
            Err(e) => return Err(self.load_failed(e.into())),
        };

        let count = catalog.len();
        *self.validator.write() = Some(Arc::new(catalog));
        *self.status.write() = ValidatorStatus::Initialized;
        info!("Validator initialized with {} operations", count);
        Ok(count)
    }

    fn load_failed(&self, err: anyhow::Error) -> anyhow::Error {
        if self.validator.read().is_none() {
            *self.status.write() = ValidatorStatus::InitializationFailed;
        }
        err
    }

    /// Forget every created resource
    pub fn initiate_resource_pool(&self) {
        *self.resource_pool.lock() = ResourcePool::new(self.config.cascade_enabled);
        metrics::set_resource_pool_nodes(0);
    }

    /// Paths of the resources created so far, sorted
    pub fn resource_urls(&self) -> Vec<String> {
        self.resource_pool.lock().urls()
    }

    pub fn resource_count(&self) -> usize {
        self.resource_pool.lock().len()
    }

    /// Run the pipeline for one request, filling `res` on success
    pub async fn generate_response(
        &self,
        req: &VirtualServerRequest,
        res: &mut VirtualServerResponse,
        profile: &TestProfile,
    ) -> Result<(), MockError> {
        let validator = self
            .validator()
            .ok_or_else(|| MockError::ValidatorNotReady(self.validator_status().to_string()))?;

        let live_request = req.to_live_request();
        let validation_request =
            validator.parse_validation_request(&live_request.url, &live_request.method, "")?;
        let validate_result = validator.validate_live_request(&live_request).await;

        if validate_result.is_acceptable() {
            let (operation_match, api_version) =
                search(validator.operation_searcher(), &validation_request)?;
            let operation = &operation_match.operation;
            debug!(
                "{} {} resolved to {}/{} ({}, long-running: {})",
                req.method,
                req.url,
                operation.provider_namespace,
                operation.operation_id,
                api_version,
                operation.long_running
            );
            let example = self
                .responder
                .generate(&operation_match.operation, &self.config, &live_request)
                .await?;
            if profile.always_error {
                return Err(MockError::IntentionalError);
            }
            self.gen_stateful_response(validator.as_ref(), req, res, &example.responses, profile)
                .await
        } else {
            match handle_specials(req, &validation_request) {
                Some(responses) => {
                    self.gen_stateful_response(validator.as_ref(), req, res, &responses, profile)
                        .await
                }
                None => Err(MockError::ValidationFail(
                    serde_json::to_string(&validate_result).unwrap_or_default(),
                )),
            }
        }
    }

    /// Apply the lifecycle step, then pick and rewrite the response
    pub async fn gen_stateful_response(
        &self,
        validator: &dyn LiveValidator,
        req: &VirtualServerRequest,
        res: &mut VirtualServerResponse,
        responses: &ExampleResponses,
        profile: &TestProfile,
    ) -> Result<(), MockError> {
        self.enforce_lifecycle(req, profile)?;

        let (code, body) = find_response(responses, 200)?;
        let mut ret = prepare_body(body);

        if is_async_status(code) {
            let poll_url = find_lro_get(validator, req).await?;
            res.set_header(AZURE_ASYNC_OPERATION, poll_url);
            res.set_header(RETRY_AFTER, "1");
        }

        let lro_callback = req.query_value(LRO_CALLBACK) == Some("true");
        finalize_body(&mut ret, &req.url, lro_callback);
        res.set(code, ret);
        Ok(())
    }

    /// Existence check and pool mutation under one lock guard
    fn enforce_lifecycle(
        &self,
        req: &VirtualServerRequest,
        profile: &TestProfile,
    ) -> Result<(), MockError> {
        let mut pool = self.resource_pool.lock();

        if profile.stateful {
            let url = get_pure_url(&req.url);
            let level = get_path(url).len();
            let method = req.method.to_ascii_uppercase();
            if matches!(method.as_str(), "GET" | "DELETE" | "PATCH")
                && is_management_url_level(level, url)
                && !pool.has_url(req)
            {
                return Err(MockError::ResourceNotFound(url.to_string()));
            }
        }

        let manipulated = pool.update_resource_pool(req);
        metrics::set_resource_pool_nodes(pool.len());

        if profile.stateful && !manipulated {
            if ResourcePool::is_create_method(req) {
                return Err(MockError::NoParentResource(req.url.clone()));
            }
            return Err(MockError::HasChildResource(req.url.clone()));
        }
        Ok(())
    }
}
