// Copyright 2026 The SlipShark Project
// SPDX-License-Identifier: Apache-2.0

// Stream types
//
// Framing constants shared by the frame parser and the relay stream, and
// the error type every stage of the stream pipeline reports.

/// Separates complete SSE messages.
pub const MESSAGE_DELIMITER: &str = "\n\n";

/// Field prefix marking a content-carrying line inside a message.
pub const DATA_PREFIX: &str = "data: ";

/// Termination marker emitted by the upstream. Never forwarded as content.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Whether a content unit may be forwarded to the caller.
///
/// Empty units and anything carrying the termination marker are dropped.
pub fn is_forwardable(content: &str) -> bool {
    !content.is_empty() && !content.contains(DONE_SENTINEL)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while turning an upstream byte stream into content.
///
/// All variants are terminal: the stream that produced one yields nothing
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("invalid UTF-8 in stream at byte {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("stream ended inside a multi-byte UTF-8 sequence ({pending} bytes pending)")]
    TruncatedUtf8 { pending: usize },

    #[error("upstream stream failed: {0}")]
    Upstream(String),
}
