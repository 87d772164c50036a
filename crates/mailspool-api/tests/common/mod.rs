//! Shared test environment for API integration tests.
//!
//! Builds the real router against a temporary spool directory, a test
//! credential table, and a controllable clock.

#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc};

use axum::{body::Body, http::Request, Router};
use mailspool_api::{create_router, AppState, CookieSettings};
use mailspool_core::{
    ApiKeyRecord, CredentialIndex, CredentialsConfig, IdentityCredentials, NoOpEventHandler,
    Operation, SpoolEventHandler, SpoolStore, TestClock,
};
use tempfile::TempDir;

/// 2024-05-01T12:00:00Z, the fixed instant tests start at.
pub const TEST_EPOCH: i64 = 1_714_564_800;

/// A running test application over a temporary spool.
pub struct TestApp {
    pub router: Router,
    pub clock: TestClock,
    pub spool: SpoolStore,
    spool_dir: TempDir,
}

impl TestApp {
    /// Absolute path of an artifact inside the spool.
    pub fn artifact_path(&self, stream: &str, name: &str) -> std::path::PathBuf {
        self.spool_dir.path().join("spool").join(stream).join(name)
    }

    /// Path of a stream directory inside the spool.
    pub fn stream_dir(&self, stream: &str) -> std::path::PathBuf {
        self.spool_dir.path().join("spool").join(stream)
    }
}

/// One key grant: identity, raw key, expiry, and (stream, operations)
/// pairs.
pub fn key(
    identity: &str,
    raw: &str,
    expiry: i64,
    grants: &[(&str, &[Operation])],
) -> (String, ApiKeyRecord) {
    let permissions: HashMap<_, _> = grants
        .iter()
        .map(|(stream, ops)| (stream.to_string(), ops.iter().copied().collect()))
        .collect();
    (identity.to_string(), ApiKeyRecord { key: raw.to_string(), expiry, permissions })
}

/// Builds a test app from `(identity, record)` pairs.
pub fn app(keys: Vec<(String, ApiKeyRecord)>) -> TestApp {
    app_with_events(keys, Arc::new(NoOpEventHandler::new()))
}

/// Builds a test app with a specific spool event handler.
pub fn app_with_events(
    keys: Vec<(String, ApiKeyRecord)>,
    events: Arc<dyn SpoolEventHandler>,
) -> TestApp {
    let mut credentials = CredentialsConfig::new();
    for (identity, record) in keys {
        credentials
            .entry(identity)
            .or_insert_with(|| IdentityCredentials { api_keys: Vec::new() })
            .api_keys
            .push(record);
    }

    let index = CredentialIndex::build(&credentials).expect("build credential index");
    let spool_dir = TempDir::new().expect("tempdir");
    let spool = SpoolStore::open(spool_dir.path().join("spool")).expect("open spool");
    let clock = TestClock::at(TEST_EPOCH);

    let state = AppState {
        index: Arc::new(index),
        spool: spool.clone(),
        events,
        clock: Arc::new(clock.clone()),
        cookies: CookieSettings { domain: "localtest.me".to_string(), max_age_secs: 1800 },
    };

    let router = create_router(state, std::time::Duration::from_secs(30));
    TestApp { router, clock, spool, spool_dir }
}

/// POST request with a JSON body.
pub fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request build")
}

/// GET request with no body.
pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request build")
}

/// DELETE request with no body.
pub fn delete(uri: &str) -> Request<Body> {
    Request::builder().method("DELETE").uri(uri).body(Body::empty()).expect("request build")
}

/// Reads a response body as JSON.
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes =
        axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body extraction");
    serde_json::from_slice(&bytes).expect("json deserialization")
}
