use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use guardchat::backends::{ClassifierBackend, GraphqlBackend, Verdict};
use guardchat::error::is_transport_error;
use guardchat::transport::GraphqlEndpoint;

fn backend(server: &MockServer, api_key: Option<&str>) -> GraphqlBackend {
    let endpoint = GraphqlEndpoint {
        url: format!("{}/graphql", server.uri()).parse().unwrap(),
        region: "us-east-1".to_string(),
        api_key: api_key.map(str::to_string),
    };
    GraphqlBackend::new(endpoint, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_fetch_stats_sends_api_key_and_decodes_string_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("x-api-key", "da2-secret"))
        .and(body_partial_json(json!({ "operationName": "GetStats" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "Stats": "{\"total_prompts\":12,\"safe_count\":9,\"misuse_count\":3,\"flagged_count\":2}"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let stats = backend(&server, Some("da2-secret"))
        .fetch_stats()
        .await
        .unwrap();
    assert_eq!(stats.total_prompts, 12);
    assert_eq!(stats.safe_count, 9);
    assert_eq!(stats.misuse_count, 3);
    assert_eq!(stats.flagged_count, 2);
}

#[tokio::test]
async fn test_classify_translates_camel_case_fields() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({
            "operationName": "ClassifyPrompt",
            "variables": { "prompt": "hello" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "classifyPrompt": {
                    "id": "g1",
                    "predictedClass": 0,
                    "label": "safe",
                    "confidence": 0.99,
                    "processingTime": 0.01
                }
            }
        })))
        .mount(&server)
        .await;

    let result = backend(&server, None).classify("hello").await.unwrap();
    assert_eq!(result.id, "g1");
    assert_eq!(result.predicted_class, Verdict::Safe);
    assert_eq!(result.processing_time_seconds, 0.01);
}

#[tokio::test]
async fn test_errors_array_is_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{ "message": "Not Authorized", "errorType": "Unauthorized" }]
        })))
        .mount(&server)
        .await;

    let err = backend(&server, None).fetch_stats().await.unwrap_err();
    assert!(is_transport_error(&err));
    assert!(err.to_string().contains("Not Authorized"));
}

#[tokio::test]
async fn test_http_failure_is_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let err = backend(&server, None).classify("hello").await.unwrap_err();
    assert!(is_transport_error(&err));
}

#[tokio::test]
async fn test_flag_sends_update_input() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({
            "operationName": "FlagTrainingData",
            "variables": { "input": { "id": "g1", "userFlaggedIncorrect": true } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "updateTrainingData": { "id": "g1", "userFlaggedIncorrect": true }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    backend(&server, None).flag("g1").await.unwrap();
}

#[tokio::test]
async fn test_flag_null_record_is_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "updateTrainingData": null }
        })))
        .mount(&server)
        .await;

    let err = backend(&server, None).flag("missing").await.unwrap_err();
    assert!(is_transport_error(&err));
}
