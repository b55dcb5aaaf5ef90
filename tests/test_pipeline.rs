//! End-to-end tests for the orchestrated pipeline
//!
//! Endpoints are redirected to a local wiremock server through the
//! `[endpoints.*]` overrides; the cooldown is disabled unless a test times it.

use airdrop_claim_checker::api_spec::ApiKind;
use airdrop_claim_checker::proxy::Proxy;
use airdrop_claim_checker::proxy_pool::ProxyProbe;
use airdrop_claim_checker::settings::{EndpointOverride, Settings};
use airdrop_claim_checker::Orchestrator;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ADDRESS: &str = "0xabc";

/// Rejects every proxy and counts the probes.
#[derive(Default)]
struct RejectAll {
    probes: AtomicUsize,
}

#[async_trait]
impl ProxyProbe for RejectAll {
    async fn probe(&self, _proxy: &Proxy) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        false
    }
}

async fn mock_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/puffer/{}", ADDRESS)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "amount": "5000000000000000000" }])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/etherfi"))
        .and(query_param("address", ADDRESS))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .expect(1)
        .mount(&server)
        .await;
    server
}

fn settings(server: &MockServer, dir: &tempfile::TempDir) -> Settings {
    let mut settings = Settings::default();
    settings.run.apis = vec![ApiKind::Puffer, ApiKind::Etherfi];
    settings.run.cooldown_seconds = 0;
    settings.fetch.max_attempts = 2;
    settings.fetch.retry_delay_ms = 10;
    settings.fetch.request_timeout_seconds = 2;
    settings.inputs.output_file = dir.path().join("results.json");
    settings.endpoints.insert(
        "PUFFER".to_string(),
        EndpointOverride {
            url: Some(format!("{}/puffer/{{address}}", server.uri())),
            ..Default::default()
        },
    );
    settings.endpoints.insert(
        "ETHERFI".to_string(),
        EndpointOverride {
            url: Some(format!("{}/etherfi", server.uri())),
            ..Default::default()
        },
    );
    settings
}

/// Test the full run: one PUFFER claim, no ETHERFI data
#[tokio::test]
async fn test_end_to_end_single_claim() {
    let server = mock_server().await;
    let dir = tempfile::tempdir().unwrap();

    let address_file = dir.path().join("evm.txt");
    fs::write(&address_file, format!("# wallets\n{}\n\n", ADDRESS)).unwrap();

    let mut settings = settings(&server, &dir);
    settings.inputs.address_file = address_file;
    settings.inputs.use_proxies = false;
    let output = settings.inputs.output_file.clone();

    let orchestrator = Orchestrator::new(settings).unwrap().with_progress(false);
    let report = orchestrator.run_from_inputs().await.unwrap();

    assert_eq!(report.wallet_count(), 1);
    assert_eq!(report.total(), 5.0);
    let record = &report.records[0];
    assert_eq!(record.address, ADDRESS);
    assert_eq!(record.amounts.len(), 1, "ETHERFI had no data");
    assert_eq!(record.amounts[&ApiKind::Puffer], 5.0);

    orchestrator.emit(&report).unwrap();
    let written: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written, json!([{ "address": ADDRESS, "puffer": 5.0 }]));

    let summary = report.render_summary();
    assert!(summary.contains("PUFFER: 5.000 EIGEN"));
    assert!(summary.contains("Sum of Eigen found: 5.000"));
}

/// Test that a run without any working proxy proceeds with direct requests
#[tokio::test]
async fn test_no_working_proxies_is_not_fatal() {
    let server = mock_server().await;
    let dir = tempfile::tempdir().unwrap();

    let probe = Arc::new(RejectAll::default());
    let orchestrator = Orchestrator::new(settings(&server, &dir))
        .unwrap()
        .with_probe(probe.clone())
        .with_progress(false);

    let candidates: Vec<Proxy> = vec![
        "10.0.0.1:8080".parse().unwrap(),
        "10.0.0.2:8080".parse().unwrap(),
        "10.0.0.1:8080".parse().unwrap(),
    ];
    let report = orchestrator.run(&[ADDRESS.to_string()], &candidates).await;

    assert_eq!(probe.probes.load(Ordering::SeqCst), 2, "each distinct proxy probed once");
    assert_eq!(report.wallet_count(), 1);
    assert_eq!(report.total(), 5.0);
}

/// Test that disabled APIs are never requested
#[tokio::test]
async fn test_disabled_api_is_not_fetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/puffer/{}", ADDRESS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "amount": "0" }])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/etherfi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "amount": "1" })))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings(&server, &dir);
    settings.run.apis = vec![ApiKind::Puffer];

    let orchestrator = Orchestrator::new(settings).unwrap().with_progress(false);
    let report = orchestrator.run(&[ADDRESS.to_string()], &[]).await;

    assert!(report.records.is_empty(), "zero amounts produce no record");
}

/// Test that the cooldown separates batches and is not applied after the last
#[tokio::test]
async fn test_cooldown_only_between_batches() {
    let server = mock_server().await;
    let dir = tempfile::tempdir().unwrap();

    let mut settings = settings(&server, &dir);
    settings.run.cooldown_seconds = 1;
    let orchestrator = Orchestrator::new(settings).unwrap().with_progress(false);

    let started = Instant::now();
    let report = orchestrator.run(&[ADDRESS.to_string()], &[]).await;
    let elapsed = started.elapsed();

    assert_eq!(report.total(), 5.0);
    assert!(elapsed >= Duration::from_secs(1), "one pause between two batches, took {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(2), "no pause after the last batch, took {:?}", elapsed);
}

/// Test that a single batch never waits for the cooldown
#[tokio::test]
async fn test_single_batch_has_no_cooldown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/puffer/{}", ADDRESS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "amount": "0" }])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings(&server, &dir);
    settings.run.apis = vec![ApiKind::Puffer];
    settings.run.cooldown_seconds = 1;
    let orchestrator = Orchestrator::new(settings).unwrap().with_progress(false);

    let started = Instant::now();
    orchestrator.run(&[ADDRESS.to_string()], &[]).await;

    assert!(started.elapsed() < Duration::from_secs(1), "no trailing cooldown");
}
