//! Integration tests for query and mutation dispatch against a mock server.

use relay_network_core::{
    ErrorKind, NetworkLayer, Operation, RelayRequest, RequestIdMiddleware, RetryMiddleware,
    UrlMiddleware,
};
use relay_network_http::{HttpClientConfig, HttpClientError, RetryConfig, transport_fn};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn layer(server: &MockServer) -> NetworkLayer {
    NetworkLayer::builder()
        .http_config(HttpClientConfig::with_base_url(server.uri()))
        .build()
        .unwrap()
}

fn viewer() -> RelayRequest {
    RelayRequest::query(
        "q1",
        Operation::new("query Viewer { viewer { id } }").operation_name("Viewer"),
    )
}

async fn respond(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(template)
        .mount(server)
        .await;
}

// =============================================================================
// Settlement Tests
// =============================================================================

#[tokio::test]
async fn test_resolves_with_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_json(json!({
            "query": "query Viewer { viewer { id } }",
            "operationName": "Viewer"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
        .expect(1)
        .mount(&server)
        .await;

    let request = layer(&server).send(viewer()).await;

    assert_eq!(request.result(), Some(&json!({})));
    assert!(request.error().is_none());
}

#[tokio::test]
async fn test_rejects_on_network_failure() {
    let layer = NetworkLayer::builder()
        .transport(transport_fn(|_| async {
            Err(HttpClientError::Connection("Network connection error".into()))
        }))
        .build()
        .unwrap();

    let request = layer.send(viewer()).await;

    let error = request.error().unwrap();
    assert_eq!(error.kind(), ErrorKind::Network);
    assert_eq!(error.message(), "Network connection error");
    assert!(error.fetch_response().is_none());
}

#[tokio::test]
async fn test_rejects_unreachable_server_with_client_message() {
    let layer = NetworkLayer::builder()
        .http_config(HttpClientConfig::with_base_url("http://127.0.0.1:9"))
        .build()
        .unwrap();

    let request = layer.send(viewer()).await;

    let error = request.error().unwrap();
    assert_eq!(error.kind(), ErrorKind::Network);
    assert!(!error.message().starts_with("HTTP error"));
    assert!(error.message().contains("127.0.0.1:9"));
}

#[tokio::test]
async fn test_rejects_on_graphql_errors() {
    let server = MockServer::start().await;
    respond(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [
                { "message": "Cannot query field `viewr`", "locations": [{ "line": 1, "column": 16 }] }
            ]
        })),
    )
    .await;

    let request = layer(&server).send(viewer()).await;

    let error = request.error().unwrap();
    assert_eq!(error.kind(), ErrorKind::GraphQLErrors);
    assert_eq!(
        error.message(),
        "Server request for query `Viewer` failed for the following reasons:\n\n\
         1. Cannot query field `viewr` at 1:16"
    );
    assert_eq!(error.graphql_errors().len(), 1);
    assert!(error.payload().is_some());
}

#[tokio::test]
async fn test_rejects_on_loosely_shaped_errors() {
    let server = MockServer::start().await;
    respond(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(json!({ "errors": [{ "location": 1, "message": "major error" }] })),
    )
    .await;

    let request = layer(&server).send(viewer()).await;

    assert!(request.result().is_none());
    let error = request.error().unwrap();
    assert_eq!(error.kind(), ErrorKind::GraphQLErrors);
    assert!(error.message().contains("1. major error"));
}

#[tokio::test]
async fn test_rejects_on_http_status() {
    let server = MockServer::start().await;
    respond(
        &server,
        ResponseTemplate::new(500).set_body_string("Something went completely wrong."),
    )
    .await;

    let request = layer(&server).send(viewer()).await;

    let error = request.error().unwrap();
    assert_eq!(error.kind(), ErrorKind::HttpStatus);
    assert_eq!(error.message(), "Something went completely wrong.");
    assert_eq!(error.status(), Some(500));
    assert!(error.fetch_response().is_some());
}

#[tokio::test]
async fn test_rejects_json_errors_with_status() {
    let server = MockServer::start().await;
    respond(
        &server,
        ResponseTemplate::new(400).set_body_json(json!({ "errors": [{ "message": "bad" }] })),
    )
    .await;

    let request = layer(&server).send(viewer()).await;

    let error = request.error().unwrap();
    assert_eq!(error.kind(), ErrorKind::HttpStatus);
    assert_eq!(error.status(), Some(400));
}

#[tokio::test]
async fn test_rejects_when_data_is_missing() {
    let server = MockServer::start().await;
    respond(&server, ResponseTemplate::new(200).set_body_json(json!({}))).await;

    let request = layer(&server).send(viewer()).await;

    let error = request.error().unwrap();
    assert_eq!(error.kind(), ErrorKind::MalformedResponse);
    assert!(error.message().starts_with("Server response.data was missing"));
}

#[tokio::test]
async fn test_rejects_invalid_json() {
    let server = MockServer::start().await;
    respond(&server, ResponseTemplate::new(200).set_body_string("<html>")).await;

    let request = layer(&server).send(viewer()).await;

    let error = request.error().unwrap();
    assert_eq!(error.kind(), ErrorKind::MalformedResponse);
    assert!(error.message().starts_with("Server response was not valid JSON"));
}

#[tokio::test]
async fn test_same_request_sent_twice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "n": 1 } })))
        .expect(2)
        .mount(&server)
        .await;

    let layer = layer(&server);
    let request = viewer();

    let first = layer.send(request.clone()).await;
    let second = layer.send(request).await;

    assert_eq!(first.result(), second.result());
}

#[tokio::test]
async fn test_partial_success_across_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_json(json!({ "query": "{ ok }" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "ok": true } })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_json(json!({ "query": "{ broken }" })))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let mut requests = vec![
        RelayRequest::query("1", Operation::new("{ ok }")),
        RelayRequest::query("2", Operation::new("{ broken }")),
    ];
    layer(&server).send_queries(&mut requests).await;

    assert_eq!(requests[0].result(), Some(&json!({ "ok": true })));
    assert_eq!(requests[1].error().unwrap().status(), Some(502));
}

// =============================================================================
// Mutation Tests
// =============================================================================

#[tokio::test]
async fn test_mutation_sends_variables() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_json(json!({
            "query": "mutation AddTodo($text: String!) { addTodo(text: $text) { id } }",
            "operationName": "AddTodo",
            "variables": { "text": "write tests" }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "addTodo": { "id": "t1" } } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut request = RelayRequest::mutation(
        "m1",
        Operation::new("mutation AddTodo($text: String!) { addTodo(text: $text) { id } }")
            .operation_name("AddTodo")
            .variable("text", "write tests"),
    );
    layer(&server).send_mutation(&mut request).await;

    assert_eq!(request.result(), Some(&json!({ "addTodo": { "id": "t1" } })));
}

// =============================================================================
// Middleware Tests
// =============================================================================

#[tokio::test]
async fn test_middlewares_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/graphql"))
        .and(header_exists("x-request-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "ok": true } })))
        .expect(1)
        .mount(&server)
        .await;

    let layer = NetworkLayer::builder()
        .http_config(HttpClientConfig::with_base_url(server.uri()))
        .middleware(UrlMiddleware::new("/api/graphql"))
        .middleware(RequestIdMiddleware::new())
        .build()
        .unwrap();

    let request = layer.send(viewer()).await;
    assert_eq!(request.result(), Some(&json!({ "ok": true })));
}

#[tokio::test]
async fn test_retry_recovers_from_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    respond(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({ "data": { "ok": true } })),
    )
    .await;

    let layer = NetworkLayer::builder()
        .http_config(HttpClientConfig::with_base_url(server.uri()))
        .middleware(RetryMiddleware::new(RetryConfig::delays(vec![
            Duration::from_millis(10),
        ])))
        .build()
        .unwrap();

    let request = layer.send(viewer()).await;
    assert_eq!(request.result(), Some(&json!({ "ok": true })));
}

// =============================================================================
// Batching Tests
// =============================================================================

#[tokio::test]
async fn test_batched_queries_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql/batch"))
        .and(body_json(json!([
            { "id": "1", "query": "{ a }" },
            { "id": "2", "query": "{ b }" }
        ])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "1", "payload": { "data": { "a": 1 } } },
            { "id": "2", "payload": { "errors": [{ "message": "no b" }] } }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let layer = NetworkLayer::builder()
        .http_config(HttpClientConfig::with_base_url(server.uri()))
        .batching(true)
        .build()
        .unwrap();

    let mut requests = vec![
        RelayRequest::query("1", Operation::new("{ a }")),
        RelayRequest::query("2", Operation::new("{ b }")),
    ];
    layer.send_queries(&mut requests).await;

    assert_eq!(requests[0].result(), Some(&json!({ "a": 1 })));
    let error = requests[1].error().unwrap();
    assert_eq!(error.kind(), ErrorKind::GraphQLErrors);
    assert!(error.message().contains("query `2`"));
}
