//! GoogleVerifier tests against a local stand-in for the tokeninfo oracle.

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{routing::get, Json, Router};
use serde_json::json;

use convertd::identity::{GoogleVerifier, IdentityVerifier, VerifyError};

/// Spawn a one-route stand-in for the tokeninfo endpoint. It accepts the
/// id_token "good" and answers with the given audience claim.
async fn spawn_tokeninfo(aud: &'static str) -> SocketAddr {
    let app = Router::new().route(
        "/tokeninfo",
        get(move |Query(params): Query<HashMap<String, String>>| async move {
            if params.get("id_token").map(String::as_str) == Some("good") {
                Json(json!({
                    "aud": aud,
                    "name": "Ada Lovelace",
                    "email": "ada@example.com",
                    "picture": "https://example.com/ada.png",
                }))
                .into_response()
            } else {
                (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_token"}))).into_response()
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr
}

#[tokio::test]
async fn verify_accepts_a_matching_audience() {
    let addr = spawn_tokeninfo("client-123").await;
    let verifier = GoogleVerifier::with_endpoint("client-123", format!("http://{addr}/tokeninfo"));

    let identity = verifier.verify("good").await.expect("verified identity");
    assert_eq!(identity.name, "Ada Lovelace");
    assert_eq!(identity.email, "ada@example.com");
    assert_eq!(identity.picture, "https://example.com/ada.png");
}

#[tokio::test]
async fn verify_rejects_a_mismatched_audience() {
    let addr = spawn_tokeninfo("someone-else").await;
    let verifier = GoogleVerifier::with_endpoint("client-123", format!("http://{addr}/tokeninfo"));

    let err = verifier.verify("good").await.expect_err("audience mismatch");
    assert!(matches!(err, VerifyError::AudienceMismatch));
}

#[tokio::test]
async fn verify_rejects_tokens_the_oracle_refuses() {
    let addr = spawn_tokeninfo("client-123").await;
    let verifier = GoogleVerifier::with_endpoint("client-123", format!("http://{addr}/tokeninfo"));

    let err = verifier.verify("expired-or-forged").await.expect_err("oracle refusal");
    assert!(matches!(err, VerifyError::Rejected));
}

#[tokio::test]
async fn verify_reports_an_unreachable_oracle() {
    // nothing listens on port 1
    let verifier = GoogleVerifier::with_endpoint("client-123", "http://127.0.0.1:1/tokeninfo");

    let err = verifier.verify("good").await.expect_err("unreachable");
    assert!(matches!(err, VerifyError::Unreachable(_)));
}
