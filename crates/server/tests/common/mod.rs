//! Common test utilities for endpoint testing with mocks.
//!
//! This module provides a test fixture that creates an in-process router
//! with a scripted worker and a recording publisher injected, so the HTTP
//! surface can be exercised without launching real processes.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use weaver_core::{
    testing::{MockBehavior, MockInvoker, MockPublisher},
    Config, JobOrchestrator, OrchestratorSettings, ResultConfig, ResultResolver, ServerConfig,
    StagingConfig, StagingStore, WorkerConfig,
};

pub const BOUNDARY: &str = "----weaver-test-boundary";

/// Smallest byte sequence that passes the PNG signature check.
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";

/// Test fixture for endpoint testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_submit() {
///     let fixture = TestFixture::new().await;
///     let response = fixture.submit(&[Part::image("cat.png", "image/png", PNG)]).await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Scripted worker - configure exit codes and stderr
    pub invoker: MockInvoker,
    /// Recording publisher - inspect or fail publishes
    pub publisher: MockPublisher,
    /// Staging directory inside `temp_dir`
    pub staging_dir: PathBuf,
    /// Temporary directory for staging and served results
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub max_upload_bytes: usize,
    pub retain_inputs: bool,
    pub timeout_secs: Option<u64>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 1024 * 1024,
            retain_inputs: true,
            timeout_secs: None,
        }
    }
}

/// One multipart part.
pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn image(filename: &'a str, content_type: &'a str, data: &'a [u8]) -> Self {
        Self {
            name: "image",
            filename: Some(filename),
            content_type: Some(content_type),
            data,
        }
    }

    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            filename: None,
            content_type: None,
            data: value.as_bytes(),
        }
    }
}

/// Encodes `parts` as a `multipart/form-data` body using [`BOUNDARY`].
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(filename) = part.filename {
            disposition.push_str(&format!("; filename=\"{}\"", filename));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(ct) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", ct).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let staging_dir = temp_dir.path().join("public").join("images");
        let auxiliary_path = temp_dir.path().join("nails.jpg");
        let results_dir = temp_dir.path().join("results");
        std::fs::create_dir_all(&results_dir).expect("Failed to create results dir");

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            staging: StagingConfig {
                dir: staging_dir.clone(),
                max_upload_bytes: test_config.max_upload_bytes,
                retain_inputs: test_config.retain_inputs,
            },
            worker: WorkerConfig {
                program: PathBuf::from("/opt/weaver/bin/weave"),
                leading_args: Vec::new(),
                auxiliary_path: auxiliary_path.clone(),
                verbosity_flag: "1".to_string(),
                max_stderr_bytes: 4096,
                timeout_secs: test_config.timeout_secs,
            },
            result: ResultConfig {
                serve_dir: Some(results_dir),
                ..Default::default()
            },
        };

        let invoker = MockInvoker::new();
        let publisher = MockPublisher::new("https://cdn.example.com/weaves");

        let staging = Arc::new(StagingStore::new(&staging_dir));
        staging
            .ensure_ready()
            .await
            .expect("Failed to prepare staging dir");

        let resolver = ResultResolver::with_sensitive_paths(
            Arc::new(publisher.clone()),
            config.result.max_error_excerpt,
            staging_dir.clone(),
            auxiliary_path,
            config.worker.program.clone(),
        );

        let orchestrator = Arc::new(JobOrchestrator::new(
            OrchestratorSettings::from_config(&config),
            staging,
            Arc::new(invoker.clone()),
            resolver,
        ));

        let state = Arc::new(weaver_server::state::AppState::new(config, orchestrator));
        let router = weaver_server::api::create_router(state);

        Self {
            router,
            invoker,
            publisher,
            staging_dir,
            temp_dir,
        }
    }

    pub async fn set_worker(&self, behavior: MockBehavior) {
        self.invoker.set_behavior(behavior).await;
    }

    /// Files currently in the staging directory.
    pub fn staged_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.staging_dir)
            .expect("Failed to read staging dir")
            .map(|e| e.unwrap().path())
            .collect();
        files.sort();
        files
    }

    /// POST a multipart body to the submission endpoint.
    pub async fn submit(&self, parts: &[Part<'_>]) -> TestResponse {
        self.request_raw(
            "POST",
            "/api/v1/jobs",
            multipart_body(parts),
            &format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .await
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request_raw("GET", path, Vec::new(), "application/json")
            .await
    }

    /// Send a GET request and return the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Send a request with raw body and custom content type.
    pub async fn request_raw(
        &self,
        method: &str,
        path: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", content_type)
            .body(Body::from(body))
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
