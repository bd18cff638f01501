//!
//! convertd HTTP gateway
//! ---------------------
//! This module defines the Axum-based HTTP API of the gateway.
//!
//! Responsibilities:
//! - Identity exchange: a Google ID token in, a signed session token out.
//! - Bearer-token auth guard in front of every protected route.
//! - Guarded convert endpoint. Conversion is a filename rewrite only; no
//!   byte-level transformation happens and the upload is discarded.
//! - Audit trail: every convert attempt that reaches handler logic is
//!   recorded, and the trail is queryable on a guarded route.
//! - Liveness endpoint for probes.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::{get, post}, Router, extract::{DefaultBodyLimit, Multipart, State}, Json};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use anyhow::Context;

use crate::audit::{AuditAction, AuditEvent, AuditLog, AuditStatus};
use crate::error::{AppError, AppResult};
use crate::identity::{GoogleVerifier, Identity, IdentityVerifier, SessionCodec, SessionError};
use crate::upload::{self, ConvertForm};

/// Body ceiling for the convert route: the file limit plus an allowance for
/// multipart framing and the targetType field.
const CONVERT_BODY_LIMIT: usize = upload::MAX_FILE_BYTES + 2 * 1024 * 1024;

/// Shared server state injected into all handlers.
///
/// Everything is owned here and handed to the router; there is no ambient
/// module state. The audit log in particular lives for the process lifetime
/// and is shared across in-flight requests.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<dyn IdentityVerifier>,
    pub sessions: Arc<SessionCodec>,
    pub audit: Arc<AuditLog>,
}

/// Startup configuration, read from the environment in `main`.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub google_client_id: String,
    pub jwt_secret: String,
}

/// Start the gateway bound to the configured port.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let state = AppState {
        verifier: Arc::new(GoogleVerifier::new(config.google_client_id.clone())),
        sessions: Arc::new(SessionCodec::new(&config.jwt_secret)),
        audit: Arc::new(AuditLog::new()),
    };

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Starting convertd on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}

/// Mount all routes onto a router around the given state.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "convertd ok" }))
        .route("/api/auth/google", post(google_auth))
        .route(
            "/api/convert",
            post(convert).layer(DefaultBodyLimit::max(CONVERT_BODY_LIMIT)),
        )
        .route("/api/audit-logs", get(audit_logs))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}

/// Auth guard for protected routes: no credential is unauthenticated (401),
/// a credential the codec rejects is forbidden (403). Runs before any
/// handler logic and yields the resolved identity on success.
fn require_session(state: &AppState, headers: &HeaderMap) -> AppResult<Identity> {
    let Some(token) = bearer_token(headers) else {
        return Err(AppError::unauthenticated("no_token", "no bearer token supplied"));
    };
    state.sessions.validate(token).map_err(|err| match err {
        SessionError::Missing => AppError::unauthenticated("no_token", "no bearer token supplied"),
        _ => AppError::forbidden("bad_token", "session token invalid or expired"),
    })
}

/// Map an [`AppError`] to its wire shape. Auth failures carry an error
/// message; everything else uses the convert route's failure body.
fn error_response(err: &AppError) -> (StatusCode, Json<serde_json::Value>) {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match err {
        AppError::Unauthenticated { .. } | AppError::Forbidden { .. } | AppError::Upstream { .. } => {
            (status, Json(json!({"error": err.message()})))
        }
        _ => (status, Json(json!({"success": false}))),
    }
}

#[derive(Debug, Deserialize)]
struct GoogleAuthPayload {
    #[serde(default)]
    token: Option<String>,
}

async fn google_auth(State(state): State<AppState>, Json(payload): Json<GoogleAuthPayload>) -> impl IntoResponse {
    let Some(token) = payload.token.filter(|t| !t.trim().is_empty()) else {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "Token missing"})));
    };
    let identity = match state.verifier.verify(&token).await {
        Ok(identity) => identity,
        Err(e) => {
            error!("google auth error: {e}");
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": "Invalid Google token"})));
        }
    };
    match state.sessions.issue(&identity) {
        Ok(session_token) => (StatusCode::OK, Json(json!({"token": session_token, "user": identity}))),
        Err(e) => {
            error!("session issue error: {e}");
            (StatusCode::UNAUTHORIZED, Json(json!({"error": "Invalid Google token"})))
        }
    }
}

async fn convert(State(state): State<AppState>, headers: HeaderMap, multipart: Multipart) -> impl IntoResponse {
    // Guard before the multipart body is consumed
    let identity = match require_session(&state, &headers) {
        Ok(identity) => identity,
        Err(err) => return error_response(&err),
    };
    // Intake failures (over-limit, malformed framing) precede handler logic
    // and leave no audit entry
    let form = match upload::read_convert_form(multipart).await {
        Ok(form) => form,
        Err(err) => return error_response(&err),
    };

    match convert_validated(&state, &identity, &form) {
        Ok(response) => response,
        Err(err) => {
            // Unexpected failures after validation still leave an audit trace,
            // with no internal detail on the wire
            error!("convert failed: {err}");
            state.audit.record(AuditEvent {
                user: identity.email.clone(),
                action: AuditAction::Error,
                file: original_name_or_unknown(&form),
                from_to: None,
                status: AuditStatus::Failed,
                message: Some("Internal error".to_string()),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"success": false})))
        }
    }
}

/// The `Validated → (Succeeded | Failed)` step of the convert state machine.
/// Exactly one audit entry is recorded on every path through here.
fn convert_validated(
    state: &AppState,
    identity: &Identity,
    form: &ConvertForm,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let (Some(file), Some(target_type)) = (form.file.as_ref(), form.target_type.as_deref()) else {
        state.audit.record(AuditEvent {
            user: identity.email.clone(),
            action: AuditAction::Convert,
            file: original_name_or_unknown(form),
            from_to: None,
            status: AuditStatus::Failed,
            message: Some("Missing file or target type".to_string()),
        });
        return Ok((StatusCode::BAD_REQUEST, Json(json!({"success": false}))));
    };

    let converted = converted_name(&file.original_name, target_type);
    state.audit.record(AuditEvent {
        user: identity.email.clone(),
        action: AuditAction::Convert,
        file: file.original_name.clone(),
        from_to: Some(format!(
            "{} → {}",
            final_extension(&file.original_name).to_uppercase(),
            target_type.to_uppercase()
        )),
        status: AuditStatus::Success,
        message: None,
    });
    Ok((StatusCode::OK, Json(json!({"success": true, "convertedName": converted}))))
}

fn original_name_or_unknown(form: &ConvertForm) -> String {
    form.file
        .as_ref()
        .map(|f| f.original_name.clone())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Replace the final dot-delimited segment of `original` with `target`.
/// A name without a dot yields ".{target}", matching the behaviour this
/// endpoint has always had.
fn converted_name(original: &str, target: &str) -> String {
    let base = original.rsplit_once('.').map(|(base, _)| base).unwrap_or("");
    format!("{base}.{target}")
}

fn final_extension(original: &str) -> &str {
    original.rsplit_once('.').map(|(_, ext)| ext).unwrap_or(original)
}

async fn audit_logs(State(state): State<AppState>, headers: HeaderMap) -> axum::response::Response {
    match require_session(&state, &headers) {
        Ok(_identity) => (StatusCode::OK, Json(state.audit.list())).into_response(),
        Err(err) => error_response(&err).into_response(),
    }
}
