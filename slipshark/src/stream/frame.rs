// Copyright 2026 The SlipShark Project
// SPDX-License-Identifier: Apache-2.0

// SSE frame parser
//
// Reassembles complete SSE messages from arbitrarily chunked bytes and
// extracts the content carried by their `data: ` lines.

use super::decode::Utf8StreamDecoder;
use super::types::{is_forwardable, StreamError, DATA_PREFIX, MESSAGE_DELIMITER};

/// Stateful parser for one upstream response.
///
/// The buffer always holds zero or more unprocessed bytes of at most one
/// incomplete trailing message; every complete message is consumed by the
/// `push` call that completed it.
#[derive(Debug, Default)]
pub struct SseFrameParser {
    decoder: Utf8StreamDecoder,
    buffer: String,
    /// Bytes of `buffer` already searched for a delimiter.
    scanned: usize,
}

impl SseFrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return the content units it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, StreamError> {
        let text = self.decoder.decode(chunk)?;
        if text.is_empty() {
            return Ok(Vec::new());
        }
        self.buffer.push_str(&text);

        let mut units = Vec::new();
        // A delimiter may straddle the previous chunk and this one.
        let mut from = self.scanned.saturating_sub(MESSAGE_DELIMITER.len() - 1);
        while let Some(pos) = find_delimiter(&self.buffer.as_bytes()[from..]).map(|p| p + from) {
            let rest = self.buffer.split_off(pos + MESSAGE_DELIMITER.len());
            let message = std::mem::replace(&mut self.buffer, rest);
            extract_content(&message[..pos], &mut units);
            from = 0;
        }
        self.scanned = self.buffer.len();

        Ok(units)
    }

    /// Finalize after the upstream closed.
    ///
    /// A non-blank residual (a message the upstream never terminated) is
    /// returned trimmed as one last unit, unless it carries the sentinel.
    pub fn finish(&mut self) -> Result<Option<String>, StreamError> {
        self.decoder.finish()?;
        let residual = std::mem::take(&mut self.buffer);
        self.scanned = 0;

        let content = residual.trim();
        if is_forwardable(content) {
            Ok(Some(content.to_string()))
        } else {
            Ok(None)
        }
    }

    /// Bytes currently buffered for an incomplete message.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

fn find_delimiter(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(MESSAGE_DELIMITER.len())
        .position(|window| window == MESSAGE_DELIMITER.as_bytes())
}

/// Push every forwardable `data: ` payload of `message` onto `units`.
/// Lines with any other shape are dropped.
fn extract_content(message: &str, units: &mut Vec<String>) {
    for line in message.split('\n') {
        if let Some(content) = line.strip_prefix(DATA_PREFIX) {
            if is_forwardable(content) {
                units.push(content.to_string());
            }
        }
    }
}
