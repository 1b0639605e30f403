//! Integration tests for the HTTP ingestion path
//!
//! **Coverage:**
//! - Client facade → processor → HttpBatchSender → mock ingestion endpoint
//! - Retry of 5xx responses through the flush loop
//! - Terminal 4xx responses reported to the error observer
//! - Nested observations on the wire
//!
//! **Infrastructure:**
//! - WireMock HTTP server (simulates the ingestion API)

#![allow(dead_code)]

#[path = "support.rs"]
mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use support::{quiet_config, wait_until, CollectingObserver};
use tracebatch_domain::{
    BatchConfig, ClientConfig, Config, Generation, GenerationUpdate, ObservationType, Span,
    Trace, TraceContext, Usage,
};
use tracebatch_infra::{BatchError, HttpBatchSender, TelemetryClient};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn client_config(server: &MockServer) -> ClientConfig {
    ClientConfig::new("pk-lf-test", "sk-lf-test").with_base_url(server.uri())
}

async fn batches(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| serde_json::from_slice::<Value>(&request.body).unwrap())
        .collect()
}

#[tokio::test]
async fn client_records_reach_ingestion_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/public/ingestion"))
        .respond_with(
            ResponseTemplate::new(207).set_body_string(r#"{"successes":[],"errors":[]}"#),
        )
        .mount(&server)
        .await;

    let config = Config { client: client_config(&server), batch: quiet_config() };
    let client = TelemetryClient::from_config(&config).unwrap();

    let trace_id = client.create_trace(Trace::new("chat request")).unwrap();
    let generation_id = client
        .create_generation(Generation {
            model: Some("claude".into()),
            ..Generation::new(&trace_id, "completion")
        })
        .unwrap();
    client
        .update_generation(
            &generation_id,
            GenerationUpdate {
                usage: Some(Usage { input: Some(12), output: Some(34), ..Usage::default() }),
                ..GenerationUpdate::default()
            },
        )
        .unwrap();
    client.create_span(Span::new(&trace_id, "retrieval")).unwrap();

    client.flush().await.unwrap();
    client.shutdown().await.unwrap();

    let bodies = batches(&server).await;
    assert_eq!(bodies.len(), 1);
    let batch = bodies[0]["batch"].as_array().unwrap();
    let types: Vec<&str> = batch.iter().map(|event| event["type"].as_str().unwrap()).collect();
    assert_eq!(
        types,
        vec!["trace-create", "generation-create", "generation-update", "span-create"]
    );
    assert_eq!(batch[0]["id"], trace_id.as_str());
    assert_eq!(batch[1]["body"]["traceId"], trace_id.as_str());
    assert_eq!(batch[2]["body"]["id"], generation_id.as_str());
    assert!(batch.iter().all(|event| event["timestamp"].is_string()));
}

#[tokio::test]
async fn server_errors_are_retried_until_accepted() {
    let server = MockServer::start().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();
    Mock::given(method("POST"))
        .respond_with(move |_req: &Request| -> ResponseTemplate {
            if calls_clone.fetch_add(1, Ordering::SeqCst) < 2 {
                ResponseTemplate::new(503)
            } else {
                ResponseTemplate::new(200)
            }
        })
        .expect(3)
        .mount(&server)
        .await;

    let sender = Arc::new(HttpBatchSender::new(&client_config(&server)).unwrap());
    let observer = CollectingObserver::new();
    let client = TelemetryClient::with_observer(
        sender,
        BatchConfig { max_batch_size: 1, ..quiet_config() },
        observer.clone(),
    )
    .unwrap();

    client.create_trace(Trace::new("eventually")).unwrap();

    assert!(wait_until(Duration::from_secs(2), || calls.load(Ordering::SeqCst) == 3).await);
    client.shutdown().await.unwrap();
    assert!(observer.failures().is_empty());
}

#[tokio::test]
async fn rejected_batches_reach_observer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("malformed batch"))
        .expect(1)
        .mount(&server)
        .await;

    let sender = Arc::new(HttpBatchSender::new(&client_config(&server)).unwrap());
    let observer = CollectingObserver::new();
    let client = TelemetryClient::with_observer(sender, quiet_config(), observer.clone()).unwrap();

    let trace_id = client.create_trace(Trace::new("bad")).unwrap();
    client.shutdown().await.unwrap();

    let failures = observer.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0.status(), Some(400));
    assert_eq!(failures[0].1, vec![trace_id]);
}

#[tokio::test]
async fn manual_flush_surfaces_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let config = Config { client: client_config(&server), batch: quiet_config() };
    let client = TelemetryClient::from_config(&config).unwrap();
    client.create_trace(Trace::new("unauthorized")).unwrap();

    let err = client.flush().await.unwrap_err();
    assert!(matches!(err, BatchError::Delivery(ref e) if e.status() == Some(401)));
    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn send_now_posts_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/public/ingestion"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let config = Config { client: client_config(&server), batch: quiet_config() };
    let client = TelemetryClient::from_config(&config).unwrap();

    let event = tracebatch_domain::TelemetryEvent::trace(Trace::new("sync"));
    client.send_now(vec![event]).await.unwrap();

    assert_eq!(batches(&server).await.len(), 1);
    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn nested_observations_carry_parentage_on_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/public/ingestion"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let config = Config { client: client_config(&server), batch: quiet_config() };
    let client = TelemetryClient::from_config(&config).unwrap();

    let context = TraceContext::seeded("support-ticket-991");
    let retriever = client
        .start_observation_in(&context, ObservationType::Retriever, "kb-search", None)
        .unwrap();
    let generation = retriever.start_child(ObservationType::Generation, "answer", None).unwrap();
    let (retriever_id, generation_id) =
        (retriever.id().to_string(), generation.id().to_string());
    generation.end().unwrap();
    retriever.end().unwrap();

    client.shutdown().await.unwrap();

    let bodies = batches(&server).await;
    let events: Vec<&Value> =
        bodies.iter().flat_map(|body| body["batch"].as_array().unwrap()).collect();
    let types: Vec<&str> = events.iter().map(|event| event["type"].as_str().unwrap()).collect();
    assert_eq!(types, vec!["span-create", "generation-create", "generation-update", "span-update"]);

    assert_eq!(events[0]["body"]["id"], retriever_id.as_str());
    assert_eq!(events[0]["body"]["traceId"], context.trace_id.as_str());
    assert_eq!(events[0]["body"]["metadata"]["observation_type"], "retriever");
    assert_eq!(events[1]["body"]["parentObservationId"], retriever_id.as_str());
    assert!(events[1]["body"].get("metadata").is_none());
    assert_eq!(events[2]["body"]["id"], generation_id.as_str());
    assert!(events[2]["body"]["endTime"].is_string());
}
