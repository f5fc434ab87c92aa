// Copyright 2026 The SlipShark Project
// SPDX-License-Identifier: Apache-2.0

// Upstream research API client
//
// Responsibilities:
// - Build the upstream request body ({query, platform})
// - Attach the server-held credential (X-API-Key)
// - Bound the wait for response headers, never the streaming body
// - Hand back status + a byte stream; interpretation is the relay's job

use async_trait::async_trait;
use axum::http::StatusCode;
use bytes::Bytes;
use futures_util::stream::Stream;
use futures_util::TryStreamExt;
use serde::Serialize;
use std::pin::Pin;
use std::time::Duration;

use crate::config::{SecretString, UpstreamConfig};

/// Header carrying the upstream credential.
pub const API_KEY_HEADER: &str = "X-API-Key";

// ---------------------------------------------------------------------------
// Transport types
// ---------------------------------------------------------------------------

/// Body of one upstream research request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearchRequest {
    pub query: String,
    pub platform: String,
}

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, UpstreamError>> + Send>>;

/// Response headers have arrived; the body has not been read yet.
pub struct UpstreamResponse {
    pub status: StatusCode,
    /// `None` when the upstream produced no readable body.
    pub body: Option<ByteStream>,
}

impl UpstreamResponse {
    /// A response whose body yields `chunks` in order.
    pub fn streaming(status: StatusCode, chunks: Vec<Result<Bytes, UpstreamError>>) -> Self {
        Self {
            status,
            body: Some(Box::pin(futures_util::stream::iter(chunks))),
        }
    }
}

impl std::fmt::Debug for UpstreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamResponse")
            .field("status", &self.status)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Transport(String),

    #[error("upstream request timed out after {0:?}")]
    Timeout(Duration),

    #[error("upstream body read failed: {0}")]
    Body(String),
}

// ---------------------------------------------------------------------------
// Trait: UpstreamClient (dependency injection point)
// ---------------------------------------------------------------------------

/// Opens research streams against the upstream API.
///
/// Implementations must be Send + Sync so they can be shared across request
/// handlers via `Arc`. One call is one upstream attempt; no retries.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn open(&self, request: ResearchRequest) -> Result<UpstreamResponse, UpstreamError>;
}

// ---------------------------------------------------------------------------
// Reqwest implementation
// ---------------------------------------------------------------------------

pub struct ReqwestUpstreamClient {
    client: reqwest::Client,
    url: String,
    api_key: SecretString,
    timeout: Option<Duration>,
}

impl ReqwestUpstreamClient {
    pub fn new(client: reqwest::Client, config: &UpstreamConfig) -> Self {
        Self {
            client,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
            timeout: config.timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl UpstreamClient for ReqwestUpstreamClient {
    async fn open(&self, request: ResearchRequest) -> Result<UpstreamResponse, UpstreamError> {
        let send = self
            .client
            .post(&self.url)
            .header(API_KEY_HEADER, self.api_key.expose())
            .json(&request)
            .send();

        let resp = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, send)
                .await
                .map_err(|_| UpstreamError::Timeout(limit))?,
            None => send.await,
        }
        .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = resp.status();
        // No-content responses have nothing to read.
        if status == StatusCode::NO_CONTENT {
            return Ok(UpstreamResponse { status, body: None });
        }

        let stream = resp
            .bytes_stream()
            .map_err(|e| UpstreamError::Body(e.to_string()));
        Ok(UpstreamResponse {
            status,
            body: Some(Box::pin(stream)),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
