use std::fmt;
use std::time::Duration;

use super::defaults::{DEFAULT_MAX_BODY_BYTES, DEFAULT_PLATFORM, DEFAULT_RELAY_PATH};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Parsed and validated relay config.
#[derive(Debug, Clone)]
pub struct Config {
    /// Config format version. Always "v1".
    pub version: String,
    /// Research API the relay forwards to.
    pub upstream: UpstreamConfig,
    /// Inbound endpoint settings.
    pub relay: RelayConfig,
    /// Environment label (e.g. "local", "production").
    pub environment: String,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Full URL of the research endpoint.
    pub url: String,
    /// Credential sent as `X-API-Key`. Never leaves the relay.
    pub api_key: SecretString,
    /// Bound on the wait for upstream response headers. Streaming bodies
    /// are not subject to it.
    pub timeout: Option<Duration>,
}

/// Inbound endpoint settings, shared with the relay handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Route the relay handler is mounted on.
    pub path: String,
    /// Request bodies larger than this are rejected.
    pub max_body_bytes: usize,
    /// Platform tag sent upstream with every query.
    pub platform: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_RELAY_PATH.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            platform: DEFAULT_PLATFORM.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Secrets
// ---------------------------------------------------------------------------

/// A string that must never appear in logs. `Debug` and `Display` redact it.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(***)")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}
