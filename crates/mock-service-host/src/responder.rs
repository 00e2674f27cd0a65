//! Example response generation.
//!
//! The coordinator asks a `ResponseGenerator` for the candidate responses of a
//! matched operation, keyed by status code. `ExampleResponder` serves them from
//! the operation's `x-ms-examples`.

use crate::config::Config;
use crate::errors::MockError;
use crate::models::LiveRequest;
use crate::spec::Operation;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// One candidate response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExampleResponse {
    #[serde(default)]
    pub body: Value,
}

impl ExampleResponse {
    pub fn new(body: Value) -> Self {
        Self { body }
    }
}

/// Candidate responses keyed by status code (`"200"`, `"201"`, ...)
pub type ExampleResponses = BTreeMap<String, ExampleResponse>;

/// Candidate responses for a matched operation
#[derive(Debug, Clone, Default)]
pub struct GeneratedExample {
    /// Name of the example the responses came from, if any
    pub example_name: Option<String>,
    pub responses: ExampleResponses,
}

/// Source of example responses
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(
        &self,
        operation: &Operation,
        config: &Config,
        request: &LiveRequest,
    ) -> Result<GeneratedExample, MockError>;
}

/// Serves responses from `x-ms-examples`.
///
/// The configured preferred example wins when present; otherwise the first
/// example (by name) with responses. Without examples, every declared numeric
/// status gets an empty object body.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExampleResponder;

impl ExampleResponder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResponseGenerator for ExampleResponder {
    async fn generate(
        &self,
        operation: &Operation,
        config: &Config,
        request: &LiveRequest,
    ) -> Result<GeneratedExample, MockError> {
        let preferred = config.responses.preferred_example.as_deref();
        let mut candidates: Vec<(&String, ExampleResponses)> = operation
            .examples
            .iter()
            .map(|(name, doc)| (name, example_responses(doc)))
            .filter(|(_, responses)| !responses.is_empty())
            .collect();

        if let Some(preferred) = preferred {
            if let Some(pos) = candidates
                .iter()
                .position(|(name, _)| name.eq_ignore_ascii_case(preferred))
            {
                candidates.swap(0, pos);
            }
        }

        if let Some((name, responses)) = candidates.into_iter().next() {
            debug!(
                "Using example '{}' for {} {}",
                name, request.method, operation.operation_id
            );
            return Ok(GeneratedExample {
                example_name: Some(name.clone()),
                responses,
            });
        }

        let responses = operation
            .responses
            .iter()
            .filter(|code| code.parse::<u16>().is_ok())
            .map(|code| (code.clone(), ExampleResponse::new(Value::Object(Default::default()))))
            .collect();
        Ok(GeneratedExample {
            example_name: None,
            responses,
        })
    }
}

/// `responses` map of an example document, numeric keys only
fn example_responses(doc: &Value) -> ExampleResponses {
    doc.get("responses")
        .and_then(Value::as_object)
        .map(|responses| {
            responses
                .iter()
                .filter(|(code, _)| code.parse::<u16>().is_ok())
                .map(|(code, response)| {
                    let body = response.get("body").cloned().unwrap_or(Value::Null);
                    (code.clone(), ExampleResponse::new(body))
                })
                .collect()
        })
        .unwrap_or_default()
}
