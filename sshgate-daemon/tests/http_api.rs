//! Tests for the JSON API surface: payload shapes, status codes, and the
//! generic failure body.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use base64::prelude::*;
use common::TestHarness;
use serde_json::{json, Value};
use sshgate_auth::testutil;
use tower::ServiceExt;

async fn call(
    router: axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = match body {
        Some(value) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn full_flow_over_http() {
    let harness = TestHarness::new().await;
    let pair = testutil::generate_ed25519();
    harness.register("alice", &pair).await;

    let (status, payload) = call(
        harness.router(),
        "POST",
        "/auth/challenge",
        Some(json!({ "user_id": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["type"], "ssh");
    assert_eq!(payload["algorithm"], "ssh-ed25519");

    let challenge = payload["challenge"].as_str().unwrap();
    let signature = pair.sign(challenge.as_bytes());

    let (status, grant) = call(
        harness.router(),
        "POST",
        "/auth/response",
        Some(json!({
            "user_id": "alice",
            "ssh_auth_response": BASE64_STANDARD.encode(signature),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(grant["user_id"], "alice");

    let token = grant["session_token"].as_str().unwrap();
    let (status, session) = call(
        harness.router(),
        "GET",
        &format!("/auth/session/{token}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["user_id"], "alice");

    let (status, _) = call(
        harness.router(),
        "DELETE",
        &format!("/auth/session/{token}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(
        harness.router(),
        "GET",
        &format!("/auth/session/{token}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

/// Unknown users and bad responses produce the same generic body, so the
/// API is not a user-enumeration oracle.
#[tokio::test]
async fn failures_share_one_generic_body() {
    let harness = TestHarness::new().await;
    let pair = testutil::generate_ed25519();
    harness.register("alice", &pair).await;

    let (status, unknown_user) = call(
        harness.router(),
        "POST",
        "/auth/challenge",
        Some(json!({ "user_id": "nobody" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, no_challenge) = call(
        harness.router(),
        "POST",
        "/auth/response",
        Some(json!({ "user_id": "alice", "ssh_auth_response": "AAAA" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    harness.auth.begin("alice").await.unwrap();
    let (status, bad_signature) = call(
        harness.router(),
        "POST",
        "/auth/response",
        Some(json!({ "user_id": "alice", "ssh_auth_response": "AAAA" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(unknown_user, json!({ "error": "authentication failed" }));
    assert_eq!(no_challenge, unknown_user);
    assert_eq!(bad_signature, unknown_user);
}

#[tokio::test]
async fn session_lookup_with_unknown_token_unauthorized() {
    let harness = TestHarness::new().await;
    let (status, body) = call(
        harness.router(),
        "GET",
        "/auth/session/deadbeef",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "authentication failed" }));
}
