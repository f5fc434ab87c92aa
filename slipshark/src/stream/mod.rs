// Copyright 2026 The SlipShark Project
// SPDX-License-Identifier: Apache-2.0

// SSE relay streaming
//
// Responsibilities:
// - Decode chunked upstream bytes as UTF-8 without splitting characters
// - Reassemble SSE messages split across network chunks
// - Extract `data: ` payloads, dropping the [DONE] sentinel
// - Flush an unterminated trailing message when the upstream closes
// - Re-emit content as a flat byte stream, pull-driven

mod decode;
mod frame;
mod relay;
mod types;

pub use decode::Utf8StreamDecoder;
pub use frame::SseFrameParser;
pub use relay::relay_content;
pub use types::{is_forwardable, StreamError, DATA_PREFIX, DONE_SENTINEL, MESSAGE_DELIMITER};
