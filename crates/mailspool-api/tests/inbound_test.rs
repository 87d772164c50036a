//! Integration tests for the ingestion endpoint.
//!
//! Drives `POST /inbound/{stream}/` through the real router and
//! asserts on both the HTTP contract and the on-disk spool state.

mod common;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use axum::http::{header::SET_COOKIE, StatusCode};
use common::{app, app_with_events, key, post_json, TestApp};
use mailspool_core::{Operation, SpoolEvent, SpoolEventHandler};
use serde_json::json;
use tower::ServiceExt;

fn inbound_app() -> TestApp {
    app(vec![key("svc1", "K1", 0, &[("stream-a", &[Operation::Inbound, Operation::List])])])
}

#[tokio::test]
async fn valid_post_spools_notification_and_sets_cookie() {
    let app = inbound_app();
    let payload = json!({ "TextBody": "hello", "From": "someone@example.com" });

    let response = app
        .router
        .clone()
        .oneshot(post_json("/inbound/stream-a/?api_key=K1", &payload))
        .await
        .expect("request execution");

    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("Set-Cookie header")
        .to_string();
    assert!(cookie.contains("api_key=K1"));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Domain=localtest.me"));
    assert!(cookie.contains("Max-Age=1800"));

    let body = common::body_json(response).await;
    assert_eq!(body, json!({ "status": "all good" }));

    // Exactly one artifact, named by receipt time and the 8-hex
    // sha256 prefix of "hello".
    let names = app.spool.list("stream-a").await.expect("list");
    assert_eq!(names, vec!["2024-05-01T12:00:00-2cf24dba.json".to_string()]);

    // The spooled bytes round-trip to the serialized payload.
    let stored = app.spool.read("stream-a", &names[0]).await.expect("read");
    assert_eq!(stored, serde_json::to_vec(&payload).expect("serialize"));
}

#[tokio::test]
async fn api_key_accepted_from_header_and_cookie() {
    let app = inbound_app();
    let payload = json!({ "TextBody": "via header" });

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/inbound/stream-a/")
        .header("content-type", "application/json")
        .header("api_key", "K1")
        .body(axum::body::Body::from(payload.to_string()))
        .expect("request build");
    let response = app.router.clone().oneshot(request).await.expect("request execution");
    assert_eq!(response.status(), StatusCode::OK);

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/inbound/stream-a/")
        .header("content-type", "application/json")
        .header("cookie", "api_key=K1")
        .body(axum::body::Body::from(json!({ "TextBody": "via cookie" }).to_string()))
        .expect("request build");
    let response = app.router.clone().oneshot(request).await.expect("request execution");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn post_without_stream_permission_is_forbidden_and_spools_nothing() {
    let app = inbound_app();

    let response = app
        .router
        .clone()
        .oneshot(post_json("/inbound/stream-b/?api_key=K1", &json!({ "TextBody": "hello" })))
        .await
        .expect("request execution");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = common::body_json(response).await;
    assert_eq!(body["error"]["code"], "forbidden");

    assert!(!app.stream_dir("stream-b").exists());
}

#[tokio::test]
async fn post_without_operation_permission_is_forbidden() {
    // Key holds list but not inbound on the stream.
    let app = app(vec![key("svc1", "K1", 0, &[("stream-a", &[Operation::List])])]);

    let response = app
        .router
        .clone()
        .oneshot(post_json("/inbound/stream-a/?api_key=K1", &json!({ "TextBody": "hello" })))
        .await
        .expect("request execution");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(!app.stream_dir("stream-a").exists());
}

#[tokio::test]
async fn post_with_unknown_key_is_forbidden_and_spools_nothing() {
    let app = inbound_app();

    let response = app
        .router
        .clone()
        .oneshot(post_json("/inbound/stream-a/?api_key=WRONG", &json!({ "TextBody": "hello" })))
        .await
        .expect("request execution");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = common::body_json(response).await;
    assert_eq!(body["error"]["code"], "unauthorized");

    assert!(!app.stream_dir("stream-a").exists());
}

#[tokio::test]
async fn post_with_expired_key_is_forbidden() {
    let expiry = common::TEST_EPOCH - 60;
    let app = app(vec![key("svc1", "OLD", expiry, &[("stream-a", &[Operation::Inbound])])]);

    let response = app
        .router
        .clone()
        .oneshot(post_json("/inbound/stream-a/?api_key=OLD", &json!({ "TextBody": "hello" })))
        .await
        .expect("request execution");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(!app.stream_dir("stream-a").exists());
}

#[tokio::test]
async fn key_becomes_invalid_once_clock_passes_expiry() {
    let expiry = common::TEST_EPOCH + 3600;
    let app = app(vec![key("svc1", "K1", expiry, &[("stream-a", &[Operation::Inbound])])]);
    let payload = json!({ "TextBody": "hello" });

    let response = app
        .router
        .clone()
        .oneshot(post_json("/inbound/stream-a/?api_key=K1", &payload))
        .await
        .expect("request execution");
    assert_eq!(response.status(), StatusCode::OK);

    app.clock.advance_secs(7200);

    let response = app
        .router
        .clone()
        .oneshot(post_json("/inbound/stream-a/?api_key=K1", &payload))
        .await
        .expect("request execution");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn query_key_takes_precedence_over_differing_header_key() {
    // K_QUERY may only write stream-a, K_HEADER only stream-b. With
    // both presented, the query key decides what is authorized.
    let app = app(vec![
        key("svc1", "K_QUERY", 0, &[("stream-a", &[Operation::Inbound])]),
        key("svc2", "K_HEADER", 0, &[("stream-b", &[Operation::Inbound])]),
    ]);

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/inbound/stream-b/?api_key=K_QUERY")
        .header("content-type", "application/json")
        .header("api_key", "K_HEADER")
        .body(axum::body::Body::from(json!({ "TextBody": "hello" }).to_string()))
        .expect("request build");

    let response = app.router.clone().oneshot(request).await.expect("request execution");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn payload_without_identifying_fields_is_bad_request() {
    let app = inbound_app();

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/inbound/stream-a/?api_key=K1",
            &json!({ "Subject": "no identifying fields" }),
        ))
        .await
        .expect("request execution");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::body_json(response).await;
    assert_eq!(body["error"]["code"], "malformed_payload");

    assert!(!app.stream_dir("stream-a").exists());
}

#[tokio::test]
async fn same_second_duplicate_content_keeps_both_artifacts() {
    let app = inbound_app();
    let payload = json!({ "TextBody": "hello" });

    for _ in 0..2 {
        let response = app
            .router
            .clone()
            .oneshot(post_json("/inbound/stream-a/?api_key=K1", &payload))
            .await
            .expect("request execution");
        assert_eq!(response.status(), StatusCode::OK);
    }

    // Lexically '-' sorts before '.', so the suffixed name lists first.
    let names = app.spool.list("stream-a").await.expect("list");
    assert_eq!(
        names,
        vec![
            "2024-05-01T12:00:00-2cf24dba-1.json".to_string(),
            "2024-05-01T12:00:00-2cf24dba.json".to_string(),
        ]
    );
}

#[tokio::test]
async fn later_posts_sort_after_earlier_ones() {
    let app = inbound_app();

    let response = app
        .router
        .clone()
        .oneshot(post_json("/inbound/stream-a/?api_key=K1", &json!({ "TextBody": "first" })))
        .await
        .expect("request execution");
    assert_eq!(response.status(), StatusCode::OK);

    app.clock.advance_secs(3);

    let response = app
        .router
        .clone()
        .oneshot(post_json("/inbound/stream-a/?api_key=K1", &json!({ "TextBody": "second" })))
        .await
        .expect("request execution");
    assert_eq!(response.status(), StatusCode::OK);

    let names = app.spool.list("stream-a").await.expect("list");
    assert_eq!(names.len(), 2);
    assert!(names[0].starts_with("2024-05-01T12:00:00-"));
    assert!(names[1].starts_with("2024-05-01T12:00:03-"));
}

#[derive(Debug)]
struct CountingHandler {
    seen: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl SpoolEventHandler for CountingHandler {
    async fn handle_event(&self, event: SpoolEvent) {
        let SpoolEvent::ArtifactStored(stored) = event;
        assert_eq!(stored.stream, "stream-a");
        assert_eq!(stored.identity, "svc1");
        assert_eq!(stored.fingerprint, "2cf24dba");
        self.seen.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn successful_ingestion_emits_artifact_stored_event() {
    let seen = Arc::new(AtomicUsize::new(0));
    let app = app_with_events(
        vec![key("svc1", "K1", 0, &[("stream-a", &[Operation::Inbound])])],
        Arc::new(CountingHandler { seen: seen.clone() }),
    );

    let response = app
        .router
        .clone()
        .oneshot(post_json("/inbound/stream-a/?api_key=K1", &json!({ "TextBody": "hello" })))
        .await
        .expect("request execution");
    assert_eq!(response.status(), StatusCode::OK);

    // Dispatch is spawned; give it a beat to run.
    for _ in 0..50 {
        if seen.load(Ordering::SeqCst) == 1 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}
