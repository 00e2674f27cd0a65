//! Swagger-backed operation catalog.
//!
//! Loads Swagger 2.0 documents (JSON or YAML) from a directory tree, indexes
//! every path + method as an `Operation`, and answers operation searches and
//! shallow request validation (route, api-version, required parameters).

use super::template::PathTemplate;
use super::{
    parse_validation_request, LiveValidator, Operation, OperationMatch, OperationSearcher,
    Parameter, ParameterLocation, PotentialOperations, SearchReason, SpecError,
    ValidationIssue, ValidationRequest, ValidationResult, API_VERSION_NOT_FOUND,
    MULTIPLE_OPERATIONS_FOUND, OPERATION_NOT_FOUND, UNKNOWN_API_VERSION,
    UNKNOWN_PROVIDER_NAMESPACE,
};
use crate::errors::MockError;
use crate::models::LiveRequest;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const METHODS: [&str; 7] = ["get", "put", "post", "patch", "delete", "head", "options"];

/// In-memory index of all loaded operations
#[derive(Debug, Default)]
pub struct SpecCatalog {
    operations: Vec<Arc<Operation>>,
}

impl SpecCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every Swagger document below `dir`.
    ///
    /// Files inside `examples` directories are only read through `$ref`.
    /// Documents that fail to parse are skipped with a warning.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, SpecError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(SpecError::MissingDirectory(dir.display().to_string()));
        }

        let mut catalog = Self::new();
        let mut documents = 0;
        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0 || !e.file_name().to_string_lossy().eq_ignore_ascii_case("examples")
            });

        for entry in walker {
            let entry = entry.map_err(|e| SpecError::Io {
                path: dir.display().to_string(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() || !is_spec_file(entry.path()) {
                continue;
            }
            let doc = match read_document(entry.path()) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!("Skipping spec file: {}", e);
                    continue;
                }
            };
            if doc.get("swagger").is_none() && doc.get("paths").is_none() {
                debug!("Ignoring non-swagger file {}", entry.path().display());
                continue;
            }
            let added = catalog.add_document(&doc, entry.path())?;
            debug!("Loaded {} operations from {}", added, entry.path().display());
            documents += 1;
        }

        info!(
            "Spec catalog loaded: {} operations from {} documents in {}",
            catalog.len(),
            documents,
            dir.display()
        );
        Ok(catalog)
    }

    /// Build a catalog from a single in-memory document (inline examples only)
    pub fn from_document(doc: &Value) -> Result<Self, SpecError> {
        let mut catalog = Self::new();
        catalog.add_document(doc, Path::new("<inline>"))?;
        Ok(catalog)
    }

    /// Index the operations of one document; returns how many were added.
    ///
    /// `source` is the document's own path, used to resolve example `$ref`s.
    pub fn add_document(&mut self, doc: &Value, source: &Path) -> Result<usize, SpecError> {
        let api_version = doc
            .pointer("/info/version")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let base_dir = source.parent();
        let before = self.operations.len();

        for key in ["paths", "x-ms-paths"] {
            let Some(paths) = doc.get(key).and_then(Value::as_object) else {
                continue;
            };
            for (template, item) in paths {
                let path_template =
                    PathTemplate::compile(template).map_err(|e| SpecError::Template {
                        path: source.display().to_string(),
                        template: template.clone(),
                        message: e.to_string(),
                    })?;
                let provider_namespace = template_namespace(template);
                let path_params = item
                    .get("parameters")
                    .map(|p| collect_parameters(doc, p))
                    .unwrap_or_default();

                for method in METHODS {
                    let Some(op) = item.get(method) else {
                        continue;
                    };
                    let mut parameters = path_params.clone();
                    if let Some(p) = op.get("parameters") {
                        for param in collect_parameters(doc, p) {
                            parameters.retain(|existing: &Parameter| {
                                !(existing.name == param.name && existing.location == param.location)
                            });
                            parameters.push(param);
                        }
                    }

                    let operation = Operation {
                        operation_id: op
                            .get("operationId")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        method: method.to_uppercase(),
                        path_template: path_template.clone(),
                        api_version: api_version.clone(),
                        provider_namespace: provider_namespace.clone(),
                        long_running: op
                            .get("x-ms-long-running-operation")
                            .and_then(Value::as_bool)
                            .unwrap_or(false),
                        parameters,
                        responses: op
                            .get("responses")
                            .and_then(Value::as_object)
                            .map(|r| r.keys().cloned().collect())
                            .unwrap_or_default(),
                        examples: load_examples(op, base_dir),
                    };
                    self.operations.push(Arc::new(operation));
                }
            }
        }

        Ok(self.operations.len() - before)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn operations(&self) -> &[Arc<Operation>] {
        &self.operations
    }

    fn search(&self, request: &ValidationRequest) -> PotentialOperations {
        let routed: Vec<&Arc<Operation>> = self
            .operations
            .iter()
            .filter(|op| {
                op.method == request.request_method
                    && op.path_template.matches(&request.path, &request.query)
            })
            .collect();

        if routed.is_empty() {
            return PotentialOperations {
                matches: Vec::new(),
                reason: Some(SearchReason {
                    code: OPERATION_NOT_FOUND.to_string(),
                    message: format!(
                        "Could not find any operation matching {} {}",
                        request.request_method, request.path
                    ),
                }),
                api_version: request.api_version.clone(),
            };
        }

        let any_version = request.api_version == UNKNOWN_API_VERSION;
        let mut matched: Vec<&Arc<Operation>> = routed
            .iter()
            .copied()
            .filter(|op| any_version || op.api_version.eq_ignore_ascii_case(&request.api_version))
            .collect();

        if matched.is_empty() {
            let mut available: Vec<&str> = routed.iter().map(|op| op.api_version.as_str()).collect();
            available.sort_unstable();
            available.dedup();
            return PotentialOperations {
                matches: Vec::new(),
                reason: Some(SearchReason {
                    code: API_VERSION_NOT_FOUND.to_string(),
                    message: format!(
                        "api-version '{}' is not available for {} {}; available versions: {}",
                        request.api_version,
                        request.request_method,
                        request.path,
                        available.join(", ")
                    ),
                }),
                api_version: request.api_version.clone(),
            };
        }

        // most specific template (then newest version) last
        matched.sort_by(|a, b| {
            a.path_template
                .specificity()
                .cmp(&b.path_template.specificity())
                .then_with(|| a.api_version.cmp(&b.api_version))
        });

        let api_version = if any_version {
            matched
                .last()
                .map(|op| op.api_version.clone())
                .unwrap_or_default()
        } else {
            request.api_version.clone()
        };

        PotentialOperations {
            matches: matched
                .into_iter()
                .map(|op| OperationMatch {
                    operation: Arc::clone(op),
                    api_version: op.api_version.clone(),
                })
                .collect(),
            reason: None,
            api_version,
        }
    }
}

impl OperationSearcher for SpecCatalog {
    fn get_potential_operations(&self, request: &ValidationRequest) -> PotentialOperations {
        self.search(request)
    }
}

#[async_trait]
impl LiveValidator for SpecCatalog {
    fn parse_validation_request(
        &self,
        url: &str,
        method: &str,
        correlation_id: &str,
    ) -> Result<ValidationRequest, MockError> {
        parse_validation_request(url, method, correlation_id)
    }

    async fn validate_live_request(&self, request: &LiveRequest) -> ValidationResult {
        let parsed = match parse_validation_request(&request.url, &request.method, "") {
            Ok(parsed) => parsed,
            Err(e) => return ValidationResult::exception("InvalidRequest", e.to_string()),
        };

        let potential = self.search(&parsed);
        let operation = match potential.matches.as_slice() {
            [] => {
                let reason = potential.reason.unwrap_or_else(|| SearchReason {
                    code: OPERATION_NOT_FOUND.to_string(),
                    message: format!("No operation for {} {}", parsed.request_method, parsed.path),
                });
                return ValidationResult::exception(&reason.code, reason.message);
            }
            [single] => &single.operation,
            many => {
                let ids: Vec<&str> = many
                    .iter()
                    .map(|m| m.operation.operation_id.as_str())
                    .collect();
                return ValidationResult::exception(
                    MULTIPLE_OPERATIONS_FOUND,
                    format!("Multiple operations matched: {}", ids.join(", ")),
                );
            }
        };

        let issues = missing_parameters(operation, request);
        ValidationResult {
            is_successful: issues.is_empty(),
            runtime_exception: None,
            request_validation_result: issues,
        }
    }

    fn operation_searcher(&self) -> &dyn OperationSearcher {
        self
    }
}

fn missing_parameters(operation: &Operation, request: &LiveRequest) -> Vec<ValidationIssue> {
    operation
        .parameters
        .iter()
        .filter(|p| p.required)
        .filter(|p| match p.location {
            ParameterLocation::Query => !request.query.contains_key(&p.name),
            ParameterLocation::Header => !request
                .headers
                .contains_key(&p.name.to_ascii_lowercase()),
            ParameterLocation::Body => request.body.as_ref().is_none_or(Value::is_null),
            ParameterLocation::Path | ParameterLocation::Other => false,
        })
        .map(|p| ValidationIssue {
            code: "MISSING_REQUIRED_PARAMETER".to_string(),
            message: format!(
                "Value is required but was not provided for parameter '{}' ({:?})",
                p.name, p.location
            ),
        })
        .collect()
}

fn collect_parameters(doc: &Value, params: &Value) -> Vec<Parameter> {
    params
        .as_array()
        .map(|items| items.iter().filter_map(|p| resolve_parameter(doc, p)).collect())
        .unwrap_or_default()
}

fn resolve_parameter(doc: &Value, param: &Value) -> Option<Parameter> {
    if let Some(reference) = param.get("$ref").and_then(Value::as_str) {
        return match reference.split_once('#') {
            Some(("", pointer)) => doc
                .pointer(pointer)
                .and_then(|target| resolve_parameter(doc, target)),
            _ => external_parameter(reference),
        };
    }

    let location = match param.get("in").and_then(Value::as_str)? {
        "path" => ParameterLocation::Path,
        "query" => ParameterLocation::Query,
        "header" => ParameterLocation::Header,
        "body" => ParameterLocation::Body,
        _ => ParameterLocation::Other,
    };
    Some(Parameter {
        name: param.get("name").and_then(Value::as_str)?.to_string(),
        location,
        required: param
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(location == ParameterLocation::Path),
    })
}

/// Parameters shared through other files cannot be followed; the api-version
/// and subscription id parameters are recognized by name.
fn external_parameter(reference: &str) -> Option<Parameter> {
    let name = reference.rsplit('/').next().unwrap_or(reference).to_lowercase();
    if name.contains("apiversion") {
        Some(Parameter {
            name: "api-version".to_string(),
            location: ParameterLocation::Query,
            required: true,
        })
    } else if name.contains("subscriptionid") {
        Some(Parameter {
            name: "subscriptionId".to_string(),
            location: ParameterLocation::Path,
            required: true,
        })
    } else {
        None
    }
}

fn load_examples(op: &Value, base_dir: Option<&Path>) -> BTreeMap<String, Value> {
    let Some(examples) = op.get("x-ms-examples").and_then(Value::as_object) else {
        return BTreeMap::new();
    };

    examples
        .iter()
        .filter_map(|(name, example)| {
            let Some(reference) = example.get("$ref").and_then(Value::as_str) else {
                return Some((name.clone(), example.clone()));
            };
            let file = base_dir?.join(reference);
            match read_document(&file) {
                Ok(doc) => Some((name.clone(), doc)),
                Err(e) => {
                    warn!("Skipping example '{}': {}", name, e);
                    None
                }
            }
        })
        .collect()
}

fn template_namespace(template: &str) -> String {
    let path = template.split('?').next().unwrap_or(template);
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    segments
        .iter()
        .rposition(|s| s.eq_ignore_ascii_case("providers"))
        .and_then(|pos| segments.get(pos + 1))
        .filter(|ns| !ns.starts_with('{'))
        .map(|ns| ns.to_lowercase())
        .unwrap_or_else(|| UNKNOWN_PROVIDER_NAMESPACE.to_string())
}

fn is_spec_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref(),
        Some("json" | "yaml" | "yml")
    )
}

fn read_document(path: &Path) -> Result<Value, SpecError> {
    let contents = std::fs::read_to_string(path).map_err(|source| SpecError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let parse_error = |message: String| SpecError::Parse {
        path: path.display().to_string(),
        message,
    };
    // some spec files start with a BOM
    let contents = contents.trim_start_matches('\u{feff}');
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => {
            serde_json::from_str(contents).map_err(|e| parse_error(e.to_string()))
        }
        _ => serde_yaml::from_str(contents).map_err(|e| parse_error(e.to_string())),
    }
}
