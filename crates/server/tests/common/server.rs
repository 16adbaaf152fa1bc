//! Server test utilities.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use depot_core::config::AppConfig;
use depot_metadata::{MetadataStore, SqliteStore};
use depot_server::{AppState, create_router};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with temporary volumes and database.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let mut config = AppConfig::for_testing(temp_dir.path());
        modifier(&mut config);

        let db_path = temp_dir.path().join("metadata.db");
        let metadata: Arc<dyn MetadataStore> = Arc::new(
            SqliteStore::new(&db_path)
                .await
                .expect("Failed to create metadata store"),
        );

        let transfer = depot_storage::from_config(&config, metadata.clone())
            .expect("Failed to create transfer server");

        depot_server::metrics::register_metrics();
        let state = AppState::new(config, metadata, transfer);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Send a request and collect the raw response body.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body_bytes.to_vec())
    }

    /// Send a request with an optional JSON body and parse the JSON response.
    pub async fn json_request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(serde_json::to_vec(&v).unwrap())
            }
            None => Body::empty(),
        };

        let (status, body_bytes) = self.send(builder.body(body).unwrap()).await;
        let json: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Upload `data` as a whole file or, with `chunk`, as one chunk of `total`.
    pub async fn put(
        &self,
        category: &str,
        file_name: &str,
        chunk: Option<(i32, u32)>,
        data: &[u8],
    ) -> (StatusCode, Value) {
        let uri = match chunk {
            Some((total, ordinal)) => {
                format!("/v1/files/{category}/{file_name}?chunks={total}&chunk={ordinal}")
            }
            None => format!("/v1/files/{category}/{file_name}"),
        };
        let request = Request::builder()
            .method("PUT")
            .uri(uri)
            .body(Body::from(data.to_vec()))
            .unwrap();
        let (status, body_bytes) = self.send(request).await;
        (status, serde_json::from_slice(&body_bytes).unwrap_or(Value::Null))
    }

    /// Download a file, returning status and raw bytes.
    pub async fn get(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }
}
