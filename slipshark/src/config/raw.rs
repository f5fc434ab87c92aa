// Raw YAML deserialization types (internal)
// Kept apart from the public Config structs so variable interpolation and
// validation happen between parsing and the typed result.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RawConfig {
    pub slipshark: String,
    pub upstream: Option<RawUpstreamConfig>,
    pub relay: Option<RawRelayConfig>,
    pub environment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawUpstreamConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct RawRelayConfig {
    pub path: Option<String>,
    pub max_body_bytes: Option<usize>,
    pub platform: Option<String>,
}
