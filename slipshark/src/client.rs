// Copyright 2026 The SlipShark Project
// SPDX-License-Identifier: Apache-2.0

// Streaming research client
//
// Responsibilities:
// - POST {query} to the relay endpoint
// - Reject non-success status and missing bodies before reading anything
// - Decode relay bytes to text without splitting characters across chunks
// - Offer a pull-based stream of text chunks (`open_query`)
// - Offer the callback contract on top of it (`send_query`): every chunk,
//   then exactly one terminal call, on_complete or on_error

use async_trait::async_trait;
use axum::http::StatusCode;
use bytes::Bytes;
use futures_util::stream::{Stream, StreamExt};
use futures_util::TryStreamExt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio_util::sync::CancellationToken;

use crate::stream::{StreamError, Utf8StreamDecoder};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Everything that can end a query without `on_complete`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("API request failed with status {0}")]
    Status(u16),

    #[error("Failed to get response reader")]
    MissingBody,

    #[error("request to relay failed: {0}")]
    Transport(String),

    #[error("response stream failed: {0}")]
    Stream(String),

    #[error(transparent)]
    Decode(#[from] StreamError),

    #[error("request cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// Trait: RelayTransport (dependency injection point)
// ---------------------------------------------------------------------------

pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, ClientError>> + Send>>;

/// Status and body of a relay response, before the body is read.
pub struct RelayReply {
    pub status: StatusCode,
    pub body: Option<BodyStream>,
}

impl RelayReply {
    pub fn streaming(status: StatusCode, chunks: Vec<Result<Bytes, ClientError>>) -> Self {
        Self {
            status,
            body: Some(Box::pin(futures_util::stream::iter(chunks))),
        }
    }
}

/// Carries one query to the relay. Swapping the transport must not change
/// the callback semantics of [`StreamingClient`].
#[async_trait]
pub trait RelayTransport: Send + Sync {
    async fn post_query(&self, query: &str) -> Result<RelayReply, ClientError>;
}

pub struct HttpRelayTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRelayTransport {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl RelayTransport for HttpRelayTransport {
    async fn post_query(&self, query: &str) -> Result<RelayReply, ClientError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(RelayReply { status, body: None });
        }
        let body = resp
            .bytes_stream()
            .map_err(|e| ClientError::Stream(e.to_string()));
        Ok(RelayReply {
            status,
            body: Some(Box::pin(body)),
        })
    }
}

// ---------------------------------------------------------------------------
// Pull-based response stream
// ---------------------------------------------------------------------------

/// Decoded text chunks of one relay response.
///
/// Yields at most one error, after which it ends. Chunks that decode to
/// nothing (a character split across reads) are skipped.
pub struct ResponseStream {
    body: BodyStream,
    decoder: Utf8StreamDecoder,
    done: bool,
}

impl ResponseStream {
    pub fn new(body: BodyStream) -> Self {
        Self {
            body,
            decoder: Utf8StreamDecoder::new(),
            done: false,
        }
    }

    /// Drain the stream into one string.
    pub async fn collect_text(mut self) -> Result<String, ClientError> {
        let mut full = String::new();
        while let Some(chunk) = self.next().await {
            full.push_str(&chunk?);
        }
        Ok(full)
    }
}

impl Stream for ResponseStream {
    type Item = Result<String, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        loop {
            let next = match this.body.as_mut().poll_next(cx) {
                Poll::Ready(next) => next,
                Poll::Pending => return Poll::Pending,
            };

            match next {
                Some(Ok(bytes)) => match this.decoder.decode(&bytes) {
                    Ok(text) if text.is_empty() => continue,
                    Ok(text) => return Poll::Ready(Some(Ok(text))),
                    Err(e) => {
                        this.done = true;
                        return Poll::Ready(Some(Err(e.into())));
                    }
                },
                Some(Err(e)) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(e)));
                }
                None => {
                    this.done = true;
                    return match this.decoder.finish() {
                        Ok(()) => Poll::Ready(None),
                        Err(e) => Poll::Ready(Some(Err(e.into()))),
                    };
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Callback contract
// ---------------------------------------------------------------------------

/// Receiver of one streamed answer.
///
/// `on_chunk` is called for each decoded chunk in order. Then exactly one of
/// `on_complete` (with all chunk text concatenated) or `on_error` is called.
pub trait StreamingCallbacks {
    fn on_chunk(&mut self, chunk: &str);
    fn on_error(&mut self, error: ClientError);
    fn on_complete(&mut self, full_response: String);
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct StreamingClient {
    transport: Arc<dyn RelayTransport>,
}

impl StreamingClient {
    pub fn new(transport: Arc<dyn RelayTransport>) -> Self {
        Self { transport }
    }

    /// Client over HTTP against a relay endpoint URL.
    pub fn http(endpoint: impl Into<String>) -> Self {
        Self::new(Arc::new(HttpRelayTransport::new(
            reqwest::Client::new(),
            endpoint,
        )))
    }

    /// Send a query and return its answer as a lazy stream of text chunks.
    pub async fn open_query(&self, query: &str) -> Result<ResponseStream, ClientError> {
        let reply = self.transport.post_query(query).await?;
        if !reply.status.is_success() {
            tracing::debug!(status = reply.status.as_u16(), "relay rejected query");
            return Err(ClientError::Status(reply.status.as_u16()));
        }
        let body = reply.body.ok_or(ClientError::MissingBody)?;
        Ok(ResponseStream::new(body))
    }

    /// Send a query, reporting progress through `callbacks`. Never fails:
    /// every error ends up in `on_error`.
    pub async fn send_query<C>(&self, query: &str, callbacks: &mut C)
    where
        C: StreamingCallbacks + Send + ?Sized,
    {
        self.send_query_cancellable(query, callbacks, &CancellationToken::new())
            .await
    }

    /// Like [`send_query`](Self::send_query), but stops reading when `cancel`
    /// fires and reports [`ClientError::Cancelled`].
    pub async fn send_query_cancellable<C>(
        &self,
        query: &str,
        callbacks: &mut C,
        cancel: &CancellationToken,
    ) where
        C: StreamingCallbacks + Send + ?Sized,
    {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            result = self.read_answer(query, callbacks) => result,
        };

        match outcome {
            Ok(full) => {
                tracing::debug!(bytes = full.len(), "query completed");
                callbacks.on_complete(full);
            }
            Err(e) => {
                tracing::warn!(error = %e, "query failed");
                callbacks.on_error(e);
            }
        }
    }

    async fn read_answer<C>(&self, query: &str, callbacks: &mut C) -> Result<String, ClientError>
    where
        C: StreamingCallbacks + Send + ?Sized,
    {
        let mut stream = self.open_query(query).await?;
        let mut full = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            callbacks.on_chunk(&chunk);
            full.push_str(&chunk);
        }
        Ok(full)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
