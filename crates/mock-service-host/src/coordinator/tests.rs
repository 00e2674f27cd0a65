use super::*;
use crate::models::LiveRequest;
use crate::responder::ExampleResponder;
use crate::spec::{OperationSearcher, ValidationRequest, ValidationResult};
use async_trait::async_trait;
use serde_json::{json, Value};

const RG: &str = "/subscriptions/sub1/resourceGroups/rg1";
const FOO: &str = "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Foo/foos/f1";
const BAR: &str = "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Foo/foos/f1/bars/b1";
const API: &str = "api-version=2021-01-01";

fn document() -> Value {
    let api_version = json!([{"$ref": "#/parameters/ApiVersionParameter"}]);
    json!({
        "swagger": "2.0",
        "info": {"title": "Foo", "version": "2021-01-01"},
        "parameters": {
            "ApiVersionParameter": {"name": "api-version", "in": "query", "required": true, "type": "string"}
        },
        "paths": {
            "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Foo/foos/{fooName}": {
                "parameters": api_version,
                "get": {
                    "operationId": "Foos_Get",
                    "responses": {"200": {}},
                    "x-ms-examples": {
                        "Get foo": {"responses": {"200": {"body": {
                            "name": "example",
                            "properties": {"provisioningState": "Succeeded"}
                        }}}}
                    }
                },
                "put": {
                    "operationId": "Foos_CreateOrUpdate",
                    "x-ms-long-running-operation": true,
                    "responses": {"200": {}, "201": {}},
                    "x-ms-examples": {
                        "Create foo": {"responses": {"201": {"body": {
                            "name": "example",
                            "nextLink": "https://example/next",
                            "properties": {"provisioningState": "Creating"}
                        }}}}
                    }
                },
                "delete": {
                    "operationId": "Foos_Delete",
                    "responses": {"200": {}, "204": {}}
                }
            },
            "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Foo/foos/{fooName}/bars/{barName}": {
                "parameters": api_version,
                "put": {"operationId": "Bars_CreateOrUpdate", "responses": {"200": {}}},
                "delete": {"operationId": "Bars_Delete", "responses": {"200": {}}}
            },
            "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Foo/foos/{fooName}/operations/{operationName}": {
                "parameters": api_version,
                "post": {"operationId": "Foos_RunOperation", "responses": {"202": {}}}
            },
            "/subscriptions/{subscriptionId}/providers/Microsoft.Foo/checkName": {
                "parameters": api_version,
                "post": {"operationId": "CheckName", "responses": {"202": {}}}
            }
        }
    })
}

/// Delegates to a real catalog and records every validated URL
struct RecordingValidator {
    catalog: SpecCatalog,
    validated: Mutex<Vec<(String, String)>>,
}

impl RecordingValidator {
    fn new() -> Self {
        Self {
            catalog: SpecCatalog::from_document(&document()).unwrap(),
            validated: Mutex::new(Vec::new()),
        }
    }

    fn probes(&self) -> Vec<String> {
        self.validated
            .lock()
            .iter()
            .filter(|(method, url)| method == "GET" && url.contains(LRO_CALLBACK))
            .map(|(_, url)| url.clone())
            .collect()
    }
}

#[async_trait]
impl LiveValidator for RecordingValidator {
    fn parse_validation_request(
        &self,
        url: &str,
        method: &str,
        correlation_id: &str,
    ) -> Result<ValidationRequest, MockError> {
        self.catalog
            .parse_validation_request(url, method, correlation_id)
    }

    async fn validate_live_request(&self, request: &LiveRequest) -> ValidationResult {
        self.validated
            .lock()
            .push((request.method.clone(), request.url.clone()));
        self.catalog.validate_live_request(request).await
    }

    fn operation_searcher(&self) -> &dyn OperationSearcher {
        &self.catalog
    }
}

fn coordinator_with(config: Config) -> (Coordinator, Arc<RecordingValidator>) {
    let validator = Arc::new(RecordingValidator::new());
    let coordinator = Coordinator::with_validator(
        Arc::new(config),
        Arc::new(ExampleResponder::new()),
        validator.clone(),
    );
    (coordinator, validator)
}

fn coordinator() -> (Coordinator, Arc<RecordingValidator>) {
    coordinator_with(Config::default())
}

fn request(method: &str, path: &str) -> VirtualServerRequest {
    let url = format!("{path}?{API}");
    VirtualServerRequest::new("http", method, &url).with_header("Host", "localhost:8443")
}

const STATEFUL: TestProfile = TestProfile {
    stateful: true,
    always_error: false,
};

const STATELESS: TestProfile = TestProfile {
    stateful: false,
    always_error: false,
};

async fn run(
    coordinator: &Coordinator,
    req: &VirtualServerRequest,
    profile: &TestProfile,
) -> Result<VirtualServerResponse, MockError> {
    let mut res = VirtualServerResponse::new();
    coordinator.generate_response(req, &mut res, profile).await?;
    Ok(res)
}

#[test]
fn test_validator_status_strings() {
    assert_eq!(
        ValidatorStatus::NotInitialized.to_string(),
        "Validator not initialized"
    );
    assert_eq!(ValidatorStatus::Initialized.to_string(), "Validator initialized");
    assert_eq!(
        ValidatorStatus::InitializationFailed.to_string(),
        "Validator initialization failure"
    );
    assert!(ValidatorStatus::Initialized.is_ready());
    assert!(!ValidatorStatus::InitializationFailed.is_ready());
}

#[tokio::test]
async fn test_not_ready_rejects_requests() {
    let coordinator = Coordinator::new(
        Arc::new(Config::default()),
        Arc::new(ExampleResponder::new()),
    );
    let err = run(&coordinator, &request("GET", FOO), &STATELESS)
        .await
        .unwrap_err();
    assert!(matches!(err, MockError::ValidatorNotReady(_)));
    assert_eq!(err.to_string(), "Validator not initialized");
}

#[tokio::test]
async fn test_initialize_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("foo.json"), document().to_string()).unwrap();
    let mut config = Config::default();
    config.specs.directory = dir.path().to_path_buf();
    let coordinator = Coordinator::new(Arc::new(config), Arc::new(ExampleResponder::new()));

    coordinator.initialize().await;
    assert_eq!(coordinator.validator_status(), ValidatorStatus::Initialized);

    let res = run(&coordinator, &request("GET", FOO), &STATELESS)
        .await
        .unwrap();
    assert_eq!(res.status, Some(200));

    // a second call keeps the loaded validator
    std::fs::remove_file(dir.path().join("foo.json")).unwrap();
    coordinator.initialize().await;
    assert!(run(&coordinator, &request("GET", FOO), &STATELESS).await.is_ok());
}

#[tokio::test]
async fn test_initialize_failure_leaves_not_ready() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.specs.directory = dir.path().join("missing");
    let coordinator = Coordinator::new(Arc::new(config), Arc::new(ExampleResponder::new()));

    coordinator.initialize().await;
    assert_eq!(
        coordinator.validator_status(),
        ValidatorStatus::InitializationFailed
    );
    let err = run(&coordinator, &request("GET", FOO), &STATELESS)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Validator initialization failure");
}

#[tokio::test]
async fn test_failed_reload_keeps_validator() {
    let mut config = Config::default();
    config.specs.directory = "/nonexistent/mock-service-host/specs".into();
    let (coordinator, _) = coordinator_with(config);

    assert!(coordinator.reload().await.is_err());
    assert_eq!(coordinator.validator_status(), ValidatorStatus::Initialized);
    assert!(run(&coordinator, &request("GET", FOO), &STATELESS).await.is_ok());
}

#[tokio::test]
async fn test_create_rewrites_body_and_adds_lro_headers() {
    let (coordinator, validator) = coordinator();
    run(&coordinator, &request("PUT", RG), &STATEFUL).await.unwrap();

    let res = run(&coordinator, &request("PUT", FOO), &STATEFUL)
        .await
        .unwrap();
    assert_eq!(res.status, Some(201));
    assert_eq!(res.body["name"], "f1");
    assert_eq!(res.body["properties"]["provisioningState"], "Succeeded");
    assert!(res.body.get("nextLink").is_none());
    assert_eq!(
        res.header(AZURE_ASYNC_OPERATION),
        Some(format!("http://localhost:8443{FOO}?{API}&lro-callback=true").as_str())
    );
    assert_eq!(res.header(RETRY_AFTER), Some("1"));
    assert_eq!(validator.probes().len(), 1);
    assert_eq!(coordinator.resource_urls(), vec![RG.to_string(), FOO.to_string()]);
}

#[tokio::test]
async fn test_lro_callback_reports_succeeded() {
    let (coordinator, _) = coordinator();
    let url = format!("{FOO}?{API}&lro-callback=true");
    let req = VirtualServerRequest::new("http", "GET", &url);
    let res = run(&coordinator, &req, &STATELESS).await.unwrap();
    assert_eq!(res.status, Some(200));
    assert_eq!(res.body["status"], "Succeeded");
    assert!(res.header(AZURE_ASYNC_OPERATION).is_none());
}

#[tokio::test]
async fn test_lro_probe_order_walks_up_to_parent() {
    let (coordinator, validator) = coordinator();
    let path = format!("{FOO}/operations/op1");
    let res = run(&coordinator, &request("POST", &path), &STATELESS)
        .await
        .unwrap();
    assert_eq!(res.status, Some(202));
    assert_eq!(
        validator.probes(),
        vec![
            format!("http://localhost:8443{path}?{API}&lro-callback=true"),
            format!("http://localhost:8443{FOO}?{API}&lro-callback=true"),
        ]
    );
}

#[tokio::test]
async fn test_lro_without_get_fails() {
    let (coordinator, validator) = coordinator();
    let path = "/subscriptions/sub1/providers/Microsoft.Foo/checkName";
    let err = run(&coordinator, &request("POST", path), &STATELESS)
        .await
        .unwrap_err();
    assert!(matches!(err, MockError::LroCallbackNotFound(_)));
    assert!(err
        .to_string()
        .contains(&format!("Lro operation: POST {path}?{API}")));
    // full path, then 5, 3 and 1 parts
    let probes = validator.probes();
    assert_eq!(probes.len(), 4);
    assert_eq!(
        probes[1],
        format!("http://localhost:8443/subscriptions/sub1/providers/Microsoft.Foo?{API}&lro-callback=true")
    );
    assert_eq!(
        probes[3],
        format!("http://localhost:8443/?{API}&lro-callback=true")
    );
}

#[tokio::test]
async fn test_stateful_create_without_parent() {
    let (coordinator, _) = coordinator();
    let err = run(&coordinator, &request("PUT", FOO), &STATEFUL)
        .await
        .unwrap_err();
    assert!(matches!(err, MockError::NoParentResource(_)));
    assert!(coordinator.resource_urls().is_empty());
}

#[tokio::test]
async fn test_stateless_ignores_lifecycle_failures() {
    let (coordinator, _) = coordinator();
    let res = run(&coordinator, &request("PUT", FOO), &STATELESS)
        .await
        .unwrap();
    assert_eq!(res.status, Some(201));
    assert_eq!(coordinator.resource_count(), 0);

    let res = run(&coordinator, &request("GET", FOO), &STATELESS)
        .await
        .unwrap();
    assert_eq!(res.status, Some(200));
}

#[tokio::test]
async fn test_stateful_get_requires_existing_resource() {
    let (coordinator, _) = coordinator();
    let err = run(&coordinator, &request("GET", FOO), &STATEFUL)
        .await
        .unwrap_err();
    assert!(matches!(err, MockError::ResourceNotFound(ref url) if url == FOO));

    run(&coordinator, &request("PUT", RG), &STATEFUL).await.unwrap();
    run(&coordinator, &request("PUT", FOO), &STATEFUL).await.unwrap();
    let res = run(&coordinator, &request("GET", FOO), &STATEFUL)
        .await
        .unwrap();
    assert_eq!(res.status, Some(200));
    assert_eq!(res.body["name"], "f1");
}

#[tokio::test]
async fn test_stateful_delete_with_children() {
    let (coordinator, _) = coordinator();
    run(&coordinator, &request("PUT", RG), &STATEFUL).await.unwrap();
    run(&coordinator, &request("PUT", FOO), &STATEFUL).await.unwrap();
    run(&coordinator, &request("PUT", BAR), &STATEFUL).await.unwrap();

    let err = run(&coordinator, &request("DELETE", FOO), &STATEFUL)
        .await
        .unwrap_err();
    assert!(matches!(err, MockError::HasChildResource(_)));
    assert_eq!(coordinator.resource_count(), 3);

    run(&coordinator, &request("DELETE", BAR), &STATEFUL).await.unwrap();
    let res = run(&coordinator, &request("DELETE", FOO), &STATEFUL)
        .await
        .unwrap();
    assert_eq!(res.status, Some(200));
    assert_eq!(coordinator.resource_urls(), vec![RG.to_string()]);

    let err = run(&coordinator, &request("DELETE", FOO), &STATEFUL)
        .await
        .unwrap_err();
    assert!(matches!(err, MockError::ResourceNotFound(_)));
}

#[tokio::test]
async fn test_cascade_delete() {
    let config = Config {
        cascade_enabled: true,
        ..Config::default()
    };
    let (coordinator, _) = coordinator_with(config);
    run(&coordinator, &request("PUT", RG), &STATEFUL).await.unwrap();
    run(&coordinator, &request("PUT", FOO), &STATEFUL).await.unwrap();
    run(&coordinator, &request("PUT", BAR), &STATEFUL).await.unwrap();

    run(&coordinator, &request("DELETE", FOO), &STATEFUL).await.unwrap();
    assert_eq!(coordinator.resource_urls(), vec![RG.to_string()]);
}

#[tokio::test]
async fn test_always_error_leaves_pool_untouched() {
    let (coordinator, _) = coordinator();
    run(&coordinator, &request("PUT", RG), &STATEFUL).await.unwrap();
    let profile = TestProfile {
        stateful: true,
        always_error: true,
    };
    let err = run(&coordinator, &request("PUT", FOO), &profile)
        .await
        .unwrap_err();
    assert!(matches!(err, MockError::IntentionalError));
    assert_eq!(coordinator.resource_urls(), vec![RG.to_string()]);
}

#[tokio::test]
async fn test_subscription_special() {
    let (coordinator, _) = coordinator();
    let res = run(&coordinator, &request("GET", "/subscriptions/sub1"), &STATEFUL)
        .await
        .unwrap();
    assert_eq!(res.status, Some(200));
    assert_eq!(res.body["subscriptionId"], "sub1");
    assert_eq!(res.body["id"], "/subscriptions/sub1");
}

#[tokio::test]
async fn test_unknown_operation_fails_validation() {
    let (coordinator, _) = coordinator();
    let path = "/subscriptions/sub1/providers/Microsoft.Foo/widgets/w1";
    let err = run(&coordinator, &request("GET", path), &STATELESS)
        .await
        .unwrap_err();
    let diagnostics = match err {
        MockError::ValidationFail(diagnostics) => diagnostics,
        other => panic!("expected ValidationFail, got {other:?}"),
    };
    let diagnostics: Value = serde_json::from_str(&diagnostics).unwrap();
    assert_eq!(diagnostics["isSuccessful"], false);
    assert_eq!(diagnostics["runtimeException"]["code"], "OperationNotFound");
}

#[tokio::test]
async fn test_reset_clears_pool() {
    let (coordinator, _) = coordinator();
    run(&coordinator, &request("PUT", RG), &STATEFUL).await.unwrap();
    assert_eq!(coordinator.resource_count(), 1);
    coordinator.initiate_resource_pool();
    assert_eq!(coordinator.resource_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_create_and_delete_never_orphans() {
    let (coordinator, _) = coordinator();
    let coordinator = Arc::new(coordinator);

    for _ in 0..50 {
        coordinator.initiate_resource_pool();
        run(&coordinator, &request("PUT", RG), &STATEFUL).await.unwrap();

        let mut tasks = Vec::new();
        for i in 0..16 {
            let coordinator = Arc::clone(&coordinator);
            let (method, path) = if i % 2 == 0 { ("PUT", FOO) } else { ("DELETE", RG) };
            tasks.push(tokio::spawn(async move {
                // NoParentResource and HasChildResource are expected outcomes
                let _ = run(&coordinator, &request(method, path), &STATEFUL).await;
                coordinator.resource_urls()
            }));
        }

        for task in tasks {
            let urls = task.await.unwrap();
            let has_foo = urls.iter().any(|u| u == FOO);
            let has_rg = urls.iter().any(|u| u == RG);
            assert!(!has_foo || has_rg, "child without parent: {urls:?}");
        }
        let urls = coordinator.resource_urls();
        assert!(!urls.contains(&FOO.to_string()) || urls.contains(&RG.to_string()));
    }
}

#[tokio::test]
async fn test_ambiguous_match_answers_from_later_document() {
    let doc = |marker: &str| {
        json!({
            "swagger": "2.0",
            "info": {"title": marker, "version": "2021-01-01"},
            "paths": {
                "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Foo/foos/{fooName}": {
                    "get": {
                        "operationId": format!("Foos_Get_{marker}"),
                        "parameters": [{"name": "api-version", "in": "query", "required": true, "type": "string"}],
                        "responses": {"200": {}},
                        "x-ms-examples": {
                            "Get foo": {"responses": {"200": {"body": {"source": marker}}}}
                        }
                    }
                }
            }
        })
    };
    let mut catalog = SpecCatalog::new();
    catalog
        .add_document(&doc("first"), std::path::Path::new("a/first.json"))
        .unwrap();
    catalog
        .add_document(&doc("second"), std::path::Path::new("b/second.json"))
        .unwrap();

    let validation = catalog
        .validate_live_request(&request("GET", FOO).to_live_request())
        .await;
    assert!(!validation.is_successful);
    assert!(validation.is_acceptable());

    let coordinator = Coordinator::with_validator(
        Arc::new(Config::default()),
        Arc::new(ExampleResponder::new()),
        Arc::new(catalog),
    );
    let res = run(&coordinator, &request("GET", FOO), &STATELESS)
        .await
        .unwrap();
    assert_eq!(res.status, Some(200));
    assert_eq!(res.body, json!({"source": "second"}));
}
