// Copyright 2026 The SlipShark Project
// SPDX-License-Identifier: Apache-2.0

// Relay stream
//
// Drives an SseFrameParser over an upstream byte stream and yields the
// flattened content as raw bytes. Pull-driven: the upstream is only read
// when the consumer asks for the next item, so outbound backpressure
// reaches the upstream connection and nothing queues unboundedly.

use super::frame::SseFrameParser;
use super::types::StreamError;
use bytes::Bytes;
use futures_util::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use std::fmt::Display;
use std::time::Instant;

struct RelayState<S> {
    input: S,
    parser: SseFrameParser,
    ready: VecDeque<String>,
    done: bool,
    failed: bool,
    request_id: String,
    started: Instant,
    units: usize,
    bytes: usize,
}

impl<S> RelayState<S> {
    fn log_end(&self) {
        tracing::info!(
            request_id = %self.request_id,
            chunks = self.units,
            bytes = self.bytes,
            latency_ms = self.started.elapsed().as_secs_f64() * 1000.0,
            "relay stream finished"
        );
    }
}

/// Turn an SSE byte stream into a stream of content bytes.
///
/// Each `data: ` payload becomes one item, emitted as soon as the message
/// containing it is complete. The first error (upstream read failure or
/// malformed UTF-8) is yielded once and ends the stream.
pub fn relay_content<S, E>(
    input: S,
    request_id: impl Into<String>,
) -> impl Stream<Item = Result<Bytes, StreamError>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: Display,
{
    let state = RelayState {
        input,
        parser: SseFrameParser::new(),
        ready: VecDeque::new(),
        done: false,
        failed: false,
        request_id: request_id.into(),
        started: Instant::now(),
        units: 0,
        bytes: 0,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(unit) = state.ready.pop_front() {
                state.units += 1;
                state.bytes += unit.len();
                return Some((Ok(Bytes::from(unit)), state));
            }
            if state.done {
                if !state.failed {
                    state.log_end();
                }
                return None;
            }

            match state.input.next().await {
                Some(Ok(chunk)) => match state.parser.push(&chunk) {
                    Ok(units) => state.ready.extend(units),
                    Err(e) => return Some((fail(&mut state, e), state)),
                },
                Some(Err(e)) => {
                    let err = StreamError::Upstream(e.to_string());
                    return Some((fail(&mut state, err), state));
                }
                None => {
                    state.done = true;
                    match state.parser.finish() {
                        Ok(Some(residual)) => {
                            tracing::debug!(
                                request_id = %state.request_id,
                                "flushing unterminated trailing message"
                            );
                            state.ready.push_back(residual);
                        }
                        Ok(None) => {}
                        Err(e) => return Some((fail(&mut state, e), state)),
                    }
                }
            }
        }
    })
}

fn fail<S>(state: &mut RelayState<S>, err: StreamError) -> Result<Bytes, StreamError> {
    state.done = true;
    state.failed = true;
    state.ready.clear();
    tracing::error!(
        request_id = %state.request_id,
        error = %err,
        chunks = state.units,
        bytes = state.bytes,
        "relay stream failed"
    );
    Err(err)
}
