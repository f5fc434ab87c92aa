// Copyright 2026 The SlipShark Project
// SPDX-License-Identifier: Apache-2.0

/// Platform tag sent upstream so the research API can tell callers apart.
pub const DEFAULT_PLATFORM: &str = "web";

/// Relay endpoint path.
pub const DEFAULT_RELAY_PATH: &str = "/api/research";

/// Largest accepted relay request body. Queries are short.
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

/// Upstream research endpoint used when the config names none.
pub const DEFAULT_UPSTREAM_URL: &str = "https://api.slipshark.com/research";
