//! Integration tests for resilience-policy nesting and the transport
//! override.

mod support;

use std::sync::Arc;
use std::time::Duration;

use crucible::{FactoryBuilder, HttpClient, Method, Policy, Request, Transport};
use support::{
    ContextObserverPolicy, DeadlinePolicy, Log, RecordingLayer, RecordingPolicy, RetryPolicy,
    entries,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

async fn hello_server() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hello/world"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Hello world!"))
        .mount(&server)
        .await;

    server
}

#[tokio::test]
async fn retry_policy_recovers_from_transient_failure() {
    let server = MockServer::start().await;

    // Transient issue resolves after the first attempt
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(408))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
        .expect(1)
        .mount(&server)
        .await;

    let client = FactoryBuilder::new()
        .with_base_url(server.uri())
        .expect("base url")
        .with_policy(RetryPolicy::new(3))
        .build()
        .create_client()
        .expect("client");

    let response = client.get("/flaky").await.expect("response");

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().expect("utf-8"), "recovered");
}

#[tokio::test]
async fn last_registered_policy_is_outermost() {
    let server = hello_server().await;
    let log = Log::default();

    let client = FactoryBuilder::new()
        .with_base_url(server.uri())
        .expect("base url")
        .with_policy(RecordingPolicy::new("first", &log))
        .with_policy(RecordingPolicy::new("second", &log))
        .build()
        .create_client()
        .expect("client");

    client.get("/hello/world").await.expect("response");

    assert_eq!(entries(&log), ["second>", "first>", "<first", "<second"]);
}

#[tokio::test]
async fn policy_collection_registration_preserves_order() {
    let server = hello_server().await;
    let log = Log::default();

    let policies: Vec<Arc<dyn Policy>> = vec![
        Arc::new(RecordingPolicy::new("inner", &log)),
        Arc::new(RecordingPolicy::new("outer", &log)),
    ];

    let client = FactoryBuilder::new()
        .with_base_url(server.uri())
        .expect("base url")
        .with_policies(policies)
        .expect("policies")
        .build()
        .create_client()
        .expect("client");

    client.get("/hello/world").await.expect("response");

    assert_eq!(entries(&log), ["outer>", "inner>", "<inner", "<outer"]);
}

#[tokio::test]
async fn retry_bounded_by_outer_deadline_makes_four_attempts() {
    let server = MockServer::start().await;

    // Endpoint that always reports a request timeout
    Mock::given(method("GET"))
        .and(path("/timeout"))
        .respond_with(ResponseTemplate::new(408))
        .expect(4)
        .mount(&server)
        .await;

    // retry registered first, deadline second: the deadline is the outer
    // bound around all four physical attempts
    let client = FactoryBuilder::new()
        .with_base_url(server.uri())
        .expect("base url")
        .with_policy(RetryPolicy::new(3))
        .with_policy(DeadlinePolicy::new(Duration::from_secs(4)))
        .build()
        .create_client()
        .expect("client");

    let response = client.get("/timeout").await.expect("response");

    assert_eq!(response.status(), 408);
    let received = server.received_requests().await.unwrap_or_default();
    assert_eq!(received.len(), 4);
}

#[tokio::test]
async fn policies_without_middleware_wrap_the_transport_directly() {
    let server = hello_server().await;
    let log = Log::default();

    let client = FactoryBuilder::new()
        .with_base_url(server.uri())
        .expect("base url")
        .with_policy(RecordingPolicy::new("only", &log))
        .build()
        .create_client()
        .expect("client");

    let response = client.get("/hello/world").await.expect("response");

    assert!(response.is_success());
    assert_eq!(entries(&log), ["only>", "<only"]);
}

#[tokio::test]
async fn middleware_wraps_policies_when_both_are_registered() {
    let server = hello_server().await;
    let log = Log::default();

    let client = FactoryBuilder::new()
        .with_base_url(server.uri())
        .expect("base url")
        .with_policy(RecordingPolicy::new("policy", &log))
        .with_handler(RecordingLayer::new("mw", &log))
        .build()
        .create_client()
        .expect("client");

    client.get("/hello/world").await.expect("response");

    assert_eq!(entries(&log), ["mw>", "policy>", "<policy", "<mw"]);
}

#[tokio::test]
async fn execution_context_is_shared_across_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/timeout"))
        .respond_with(ResponseTemplate::new(408))
        .expect(3)
        .mount(&server)
        .await;

    let log = Log::default();

    // The observer nests outside the retry policy and reads the attempt
    // counter the retry policy wrote into the shared context
    let client = FactoryBuilder::new()
        .with_base_url(server.uri())
        .expect("base url")
        .with_policy(RetryPolicy::new(2))
        .with_policy(ContextObserverPolicy::new("attempt", &log))
        .build()
        .create_client()
        .expect("client");

    let response = client.get("/timeout").await.expect("response");

    assert_eq!(response.status(), 408);
    assert_eq!(entries(&log), ["attempt=3"]);
}

#[tokio::test]
async fn substituted_transport_survives_client_drop() {
    let server = hello_server().await;
    let transport = Transport::new();

    let client = FactoryBuilder::new()
        .with_base_url(server.uri())
        .expect("base url")
        .with_transport(transport.clone())
        .build()
        .create_client()
        .expect("client");

    assert!(client.get("/hello/world").await.expect("response").is_success());
    drop(client);

    // The caller-owned transport keeps working after the client is gone
    let url = format!("{}/hello/world", server.uri())
        .parse()
        .expect("url");
    let request = Request::builder(Method::Get, url).build();
    let response = transport.execute(request).await.expect("direct response");

    assert!(response.is_success());
    let received = server.received_requests().await.unwrap_or_default();
    assert_eq!(received.len(), 2);
}

#[tokio::test]
async fn last_registered_configurator_wins_at_assembly() {
    let server = hello_server().await;
    let transport = Transport::new();

    let client = FactoryBuilder::new()
        .with_base_url(server.uri())
        .expect("base url")
        .with_transport(transport.clone())
        .with_transport_configurator(|config| config.max_connections_per_host = 1)
        .with_transport_configurator(|config| config.max_connections_per_host = 4)
        .build()
        .create_client()
        .expect("client");

    assert_eq!(transport.config().max_connections_per_host, 4);
    assert!(client.get("/hello/world").await.expect("response").is_success());
}
