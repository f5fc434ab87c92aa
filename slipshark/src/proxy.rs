// Copyright 2026 The SlipShark Project
// SPDX-License-Identifier: Apache-2.0

// Research relay HTTP surface
//
// Responsibilities:
// - Validate the caller's {query} body
// - Open exactly one upstream research request via the injected client
// - Propagate upstream failure status as a JSON error, never a partial stream
// - Stream flattened content back with no-cache / keep-alive headers
// - Heartbeat endpoint
// - 404 for unknown paths

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::config::RelayConfig;
use crate::stream::relay_content;
use crate::upstream::{ResearchRequest, UpstreamClient};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors the relay reports to its caller before any content is streamed.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("request body is empty")]
    EmptyBody,

    #[error("request body is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("request body must contain a non-empty string \"query\"")]
    InvalidQuery,

    #[error("failed to read request body: {0}")]
    BodyRead(String),

    #[error("upstream responded with status {0}")]
    UpstreamStatus(StatusCode),

    #[error("upstream request failed: {0}")]
    UpstreamFailure(String),

    #[error("upstream response has no readable body")]
    MissingUpstreamBody,
}

impl ProxyError {
    /// Status and the public message. Internal detail stays in logs.
    fn public_parts(&self) -> (StatusCode, &'static str) {
        match self {
            ProxyError::EmptyBody => (StatusCode::BAD_REQUEST, "request body is empty"),
            ProxyError::MalformedJson(_) => {
                (StatusCode::BAD_REQUEST, "request body is not valid JSON")
            }
            ProxyError::InvalidQuery => (
                StatusCode::BAD_REQUEST,
                "request body must contain a non-empty string \"query\"",
            ),
            ProxyError::BodyRead(_) => (StatusCode::BAD_REQUEST, "failed to read request body"),
            ProxyError::UpstreamStatus(status) => (*status, "API request failed"),
            ProxyError::UpstreamFailure(_) | ProxyError::MissingUpstreamBody => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, public_message) = self.public_parts();
        (status, Json(serde_json::json!({ "error": public_message }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request parsing
// ---------------------------------------------------------------------------

/// Extract the query from a relay request body.
pub fn parse_query(body: &Bytes) -> Result<String, ProxyError> {
    if body.is_empty() {
        return Err(ProxyError::EmptyBody);
    }
    let json: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| ProxyError::MalformedJson(e.to_string()))?;

    match json.get("query").and_then(|q| q.as_str()) {
        Some(query) if !query.trim().is_empty() => Ok(query.to_string()),
        _ => Err(ProxyError::InvalidQuery),
    }
}

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// Shared state injected into axum handlers. Holds no per-request data.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<dyn UpstreamClient>,
    pub relay: Arc<RelayConfig>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Heartbeat endpoint: GET /v1/heartbeat -> 200 OK
pub async fn heartbeat() -> StatusCode {
    StatusCode::OK
}

/// Relay one research query.
///
/// Every invocation owns its frame buffer; nothing is shared between
/// requests except the upstream client.
pub async fn relay_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let started = Instant::now();

    let body = match axum::body::to_bytes(request.into_body(), state.relay.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return reject(&request_id, ProxyError::BodyRead(e.to_string())),
    };
    let query = match parse_query(&body) {
        Ok(q) => q,
        Err(e) => return reject(&request_id, e),
    };

    tracing::debug!(
        request_id = %request_id,
        query_chars = query.chars().count(),
        platform = %state.relay.platform,
        "relaying research query"
    );

    let research = ResearchRequest {
        query,
        platform: state.relay.platform.clone(),
    };

    let upstream = match state.upstream.open(research).await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                error = %e,
                latency_ms = started.elapsed().as_secs_f64() * 1000.0,
                "upstream request failed"
            );
            return ProxyError::UpstreamFailure(e.to_string()).into_response();
        }
    };

    if !upstream.status.is_success() {
        tracing::warn!(
            request_id = %request_id,
            status = upstream.status.as_u16(),
            latency_ms = started.elapsed().as_secs_f64() * 1000.0,
            "upstream returned non-success status"
        );
        return ProxyError::UpstreamStatus(upstream.status).into_response();
    }

    let Some(upstream_body) = upstream.body else {
        tracing::error!(request_id = %request_id, "upstream response has no readable body");
        return ProxyError::MissingUpstreamBody.into_response();
    };

    tracing::info!(
        request_id = %request_id,
        status = upstream.status.as_u16(),
        latency_ms = started.elapsed().as_secs_f64() * 1000.0,
        "upstream stream opened"
    );

    streaming_response(Body::from_stream(relay_content(upstream_body, request_id)))
}

fn reject(request_id: &str, err: ProxyError) -> Response {
    tracing::warn!(request_id = %request_id, error = %err, "rejected relay request");
    err.into_response()
}

/// Wrap a body with the headers a live text stream needs.
fn streaming_response(body: Body) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        body,
    )
        .into_response()
}

async fn unknown_path() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "unknown path" })),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Router construction
// ---------------------------------------------------------------------------

/// Build the axum router with the relay route and the heartbeat endpoint.
///
/// The upstream client is injected; no side effects, no hard-coded clients.
pub fn build_router(upstream: Arc<dyn UpstreamClient>, relay: RelayConfig) -> Router {
    let path = relay.path.clone();
    let state = AppState {
        upstream,
        relay: Arc::new(relay),
    };

    Router::new()
        .route("/v1/heartbeat", get(heartbeat))
        .route(&path, post(relay_handler))
        .fallback(unknown_path)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
