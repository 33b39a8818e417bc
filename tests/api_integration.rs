//! Integration tests for the SID server API.
//!
//! These tests spin up a real server instance over the file backend and make
//! HTTP requests to verify the complete request/response cycle.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tempfile::TempDir;
use tokio::net::TcpListener;

use sid_server::api::{AppState, create_router};
use sid_server::config::{BackendConfig, BackendDriver, FileBackendConfig};
use sid_server::domain::SequenceDefinition;
use sid_server::service::SequenceRegistry;
use sid_server::storage::create_backend;

// ============================================================================
// Test Harness
// ============================================================================

/// Token from the reference scenario.
const JOBS_TOKEN: [u8; 14] = [
    0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC, 0xDD,
];

/// Test server instance.
struct TestServer {
    addr: SocketAddr,
    client: Client,
    registry: Arc<SequenceRegistry>,
    _temp_dir: TempDir,
}

impl TestServer {
    async fn new() -> Self {
        Self::with_sequences(&["jobs", "orders"]).await
    }

    async fn with_sequences(names: &[&str]) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let config = BackendConfig {
            driver: BackendDriver::File,
            file: FileBackendConfig {
                data_dir: temp_dir.path().to_path_buf(),
            },
            ..Default::default()
        };

        let backend = create_backend(&config)
            .await
            .expect("Failed to create backend");

        let registry = Arc::new(
            SequenceRegistry::build(
                backend,
                names
                    .iter()
                    .map(|name| SequenceDefinition::new(*name, config.token_width)),
            )
            .await
            .expect("Failed to build registry"),
        );

        let app = create_router(AppState::new(Arc::clone(&registry)));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server failed");
        });

        tokio::time::sleep(Duration::from_millis(100)).await;

        Self {
            addr,
            client: Client::new(),
            registry,
            _temp_dir: temp_dir,
        }
    }

    fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url(), path))
            .send()
            .await
            .expect("Request failed")
    }

    async fn generate(&self, sequence: &str, oid: &[u8]) -> Reply {
        let response = self
            .client
            .post(format!("{}/v1/generate", self.base_url()))
            .json(&json!({ "sequence": sequence, "oid": STANDARD.encode(oid) }))
            .send()
            .await
            .expect("Request failed");
        assert_eq!(response.status(), StatusCode::OK);
        response.json().await.expect("Invalid reply")
    }
}

/// Generate reply structure.
#[derive(Debug, Deserialize)]
struct Reply {
    code: i32,
    id: u64,
    oid: String,
}

impl Reply {
    fn oid_bytes(&self) -> Vec<u8> {
        STANDARD.decode(&self.oid).expect("oid is not base64")
    }
}

// ============================================================================
// Health Endpoint Tests
// ============================================================================

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i32,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct HealthData {
    status: String,
}

#[derive(Debug, Deserialize)]
struct ReadyData {
    ready: bool,
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = TestServer::new().await;
    let response = server.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Envelope<HealthData> = response.json().await.unwrap();
    assert_eq!(body.code, 0);
    assert_eq!(body.data.unwrap().status, "healthy");
}

#[tokio::test]
async fn test_ready_endpoint() {
    let server = TestServer::new().await;
    let response = server.get("/ready").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Envelope<ReadyData> = response.json().await.unwrap();
    assert_eq!(body.code, 0);
    assert!(body.data.unwrap().ready);
}

#[tokio::test]
async fn test_ready_after_close_is_unavailable() {
    let server = TestServer::new().await;
    server.registry.close_all().await;

    let response = server.get("/ready").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let server = TestServer::new().await;
    let response = server.get("/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);

    let text = response.text().await.unwrap();
    assert!(text.contains("sid_up 1"));
}

// ============================================================================
// Generate Tests
// ============================================================================

#[tokio::test]
async fn test_generate_success() {
    let server = TestServer::new().await;

    let reply = server.generate("jobs", &JOBS_TOKEN).await;
    assert_eq!(reply.code, 0);
    assert_eq!(reply.id, 1);
    assert_eq!(reply.oid_bytes(), JOBS_TOKEN);
}

#[tokio::test]
async fn test_generate_ids_increase() {
    let server = TestServer::new().await;

    let mut last = 0;
    for i in 0..10u8 {
        let reply = server.generate("jobs", &[i; 12]).await;
        assert_eq!(reply.code, 0);
        assert!(reply.id > last);
        assert_eq!(reply.oid_bytes(), vec![i; 12]);
        last = reply.id;
    }
}

#[tokio::test]
async fn test_generate_concurrent_jobs() {
    let server = Arc::new(TestServer::new().await);
    let other_token = [0x42u8; 12];

    let (first, second) = tokio::join!(
        server.generate("jobs", &JOBS_TOKEN),
        server.generate("jobs", &other_token),
    );

    assert_eq!(first.code, 0);
    assert_eq!(second.code, 0);
    assert_ne!(first.id, second.id);
    assert_eq!(first.oid_bytes(), JOBS_TOKEN);
    assert_eq!(second.oid_bytes(), other_token);
}

#[tokio::test]
async fn test_generate_many_concurrent_are_unique() {
    let server = Arc::new(TestServer::new().await);

    let handles: Vec<_> = (0..50u8)
        .map(|i| {
            let server = Arc::clone(&server);
            tokio::spawn(async move { server.generate("orders", &[i]).await })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        let reply = handle.await.unwrap();
        assert_eq!(reply.code, 0);
        assert!(ids.insert(reply.id), "duplicate id {}", reply.id);
    }
    assert_eq!(ids.len(), 50);
}

#[tokio::test]
async fn test_generate_sequence_required() {
    let server = TestServer::new().await;

    for _ in 0..3 {
        let reply = server.generate("", &JOBS_TOKEN).await;
        assert_eq!(reply.code, 1);
        assert_eq!(reply.id, 0);
        assert!(reply.oid.is_empty());
    }

    // Nothing was allocated.
    assert_eq!(server.generate("jobs", &JOBS_TOKEN).await.id, 1);
}

#[tokio::test]
async fn test_generate_sequence_undefined() {
    let server = TestServer::new().await;

    for name in ["unknown", "Jobs", "jobs "] {
        let reply = server.generate(name, &JOBS_TOKEN).await;
        assert_eq!(reply.code, 2, "name {name:?}");
        assert_eq!(reply.id, 0);
    }

    assert_eq!(server.generate("jobs", &JOBS_TOKEN).await.id, 1);
}

#[tokio::test]
async fn test_generate_oversize_token_fails() {
    let server = TestServer::new().await;

    let reply = server.generate("jobs", &[0u8; 15]).await;
    assert_eq!(reply.code, 3);
}

#[tokio::test]
async fn test_generate_after_store_severed() {
    let server = TestServer::new().await;

    let reply = server.generate("jobs", &JOBS_TOKEN).await;
    assert_eq!(reply.code, 0);

    server.registry.close_all().await;

    let reply = server.generate("jobs", &JOBS_TOKEN).await;
    assert_eq!(reply.code, 3);
    assert_eq!(reply.id, 0);
}

#[tokio::test]
async fn test_generate_missing_fields_default_to_empty() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(format!("{}/v1/generate", server.base_url()))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let reply: Reply = response.json().await.unwrap();
    assert_eq!(reply.code, 1);
}

#[tokio::test]
async fn test_generate_malformed_body_is_rejected() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(format!("{}/v1/generate", server.base_url()))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

// ============================================================================
// Sequence Listing Tests
// ============================================================================

#[derive(Debug, Deserialize)]
struct SequenceList {
    sequences: Vec<String>,
}

#[tokio::test]
async fn test_list_sequences() {
    let server = TestServer::with_sequences(&["orders", "jobs"]).await;

    let response = server.get("/v1/sequences").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: SequenceList = response.json().await.unwrap();
    assert_eq!(body.sequences, vec!["jobs", "orders"]);
}
