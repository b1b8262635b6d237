mod common;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use guardchat::backends::{BackendKind, Verdict};
use guardchat::error::GuardchatError;
use guardchat::transport::TransportDescriptor;

use common::{router_for, transport_config};

async fn mount_rest_classify(server: &MockServer, id: &str) {
    Mock::given(method("POST"))
        .and(path("/api/classify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "predicted_class": 0,
            "confidence": 0.95,
            "processing_time": 0.02
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_graphql_failure_falls_back_to_rest() {
    let graphql = MockServer::start().await;
    let rest = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&graphql)
        .await;
    mount_rest_classify(&rest, "r1").await;

    let router = router_for(&transport_config(&rest.uri(), Some(&graphql.uri())));
    assert_eq!(router.descriptor().primary(), BackendKind::Graphql);

    let result = router.classify("hello").await.unwrap();
    assert_eq!(result.id, "r1");
    assert_eq!(result.predicted_class, Verdict::Safe);
}

#[tokio::test]
async fn test_graphql_success_skips_rest() {
    let graphql = MockServer::start().await;
    let rest = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "Stats": { "total_prompts": 3, "safe_count": 2, "misuse_count": 1 } }
        })))
        .expect(1)
        .mount(&graphql)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/stats"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&rest)
        .await;

    let router = router_for(&transport_config(&rest.uri(), Some(&graphql.uri())));
    let stats = router.fetch_stats().await.unwrap();
    assert_eq!(stats.total_prompts, 3);
}

#[tokio::test]
async fn test_placeholder_endpoint_never_contacts_graphql() {
    let graphql = MockServer::start().await;
    let rest = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&graphql)
        .await;
    mount_rest_classify(&rest, "r2").await;

    let mut cfg = transport_config(&rest.uri(), None);
    cfg.graphql.endpoint = Some("https://your-amplify-endpoint.example.com/graphql".to_string());
    let router = router_for(&cfg);

    assert!(matches!(
        router.descriptor(),
        TransportDescriptor::Rest { .. }
    ));
    let result = router.classify("hello").await.unwrap();
    assert_eq!(result.id, "r2");
}

#[tokio::test]
async fn test_rest_primary_falls_back_to_graphql() {
    let graphql = MockServer::start().await;
    let rest = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/flag"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&rest)
        .await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "updateTrainingData": { "id": "x1", "userFlaggedIncorrect": true } }
        })))
        .expect(1)
        .mount(&graphql)
        .await;

    let mut cfg = transport_config(&rest.uri(), Some(&graphql.uri()));
    cfg.primary = Some("rest".to_string());
    let router = router_for(&cfg);

    router.flag("x1").await.unwrap();
}

#[tokio::test]
async fn test_both_transports_failing_reports_fallback_cause() {
    let graphql = MockServer::start().await;
    let rest = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&graphql)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/classify"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "down" })))
        .expect(1)
        .mount(&rest)
        .await;

    let router = router_for(&transport_config(&rest.uri(), Some(&graphql.uri())));
    let err = router.classify("hello").await.unwrap_err();

    match err.downcast_ref::<GuardchatError>() {
        Some(GuardchatError::BothTransportsFailed { secondary, .. }) => {
            assert!(secondary.to_string().contains("down"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_rest_only_failure_is_not_retried() {
    let rest = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/stats"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&rest)
        .await;

    let router = router_for(&transport_config(&rest.uri(), None));
    let err = router.fetch_stats().await.unwrap_err();
    assert!(guardchat::error::is_transport_error(&err));
}
