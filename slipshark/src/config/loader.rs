// Copyright 2026 The SlipShark Project
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use super::defaults::DEFAULT_UPSTREAM_URL;
use super::error::ConfigError;
use super::interpolation::resolve_variables;
use super::raw;
use super::source::ConfigSource;
use super::types::*;

/// Load and validate a relay config from the given source.
///
/// Steps:
/// 1. Read raw YAML from source
/// 2. Parse YAML into raw deserialization types
/// 3. Validate the version tag
/// 4. Resolve `${VAR}` interpolation in string fields
/// 5. Validate values and fill defaults
pub fn load_config(source: &dyn ConfigSource) -> Result<Config, ConfigError> {
    let raw_yaml = source.load()?;
    let raw: raw::RawConfig = serde_yaml::from_str(&raw_yaml)?;

    if raw.slipshark != "v1" {
        return Err(ConfigError::Validation(format!(
            "unsupported config version \"{}\", expected \"v1\"",
            raw.slipshark
        )));
    }

    let upstream = build_upstream_config(raw.upstream)?;
    let relay = build_relay_config(raw.relay)?;
    let environment = match raw.environment {
        Some(env) => resolve_variables(&env)?,
        None => String::new(),
    };

    Ok(Config {
        version: raw.slipshark,
        upstream,
        relay,
        environment,
    })
}

fn build_upstream_config(
    raw: Option<raw::RawUpstreamConfig>,
) -> Result<UpstreamConfig, ConfigError> {
    let Some(raw) = raw else {
        return Err(ConfigError::Validation(
            "missing \"upstream\" section (needs at least api_key)".to_string(),
        ));
    };

    let url = match raw.url {
        Some(url) => resolve_variables(&url)?,
        None => DEFAULT_UPSTREAM_URL.to_string(),
    };
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::Validation(format!(
            "upstream.url must be an http(s) URL, got \"{url}\""
        )));
    }

    let api_key = match raw.api_key {
        Some(key) => SecretString::new(resolve_variables(&key)?.trim()),
        None => {
            return Err(ConfigError::Validation(
                "upstream.api_key is required".to_string(),
            ))
        }
    };
    if api_key.is_empty() {
        return Err(ConfigError::Validation(
            "upstream.api_key resolved to an empty value".to_string(),
        ));
    }

    let timeout = match raw.timeout_ms {
        Some(0) => {
            return Err(ConfigError::Validation(
                "upstream.timeout_ms must be greater than 0".to_string(),
            ))
        }
        Some(ms) => Some(Duration::from_millis(ms)),
        None => None,
    };

    Ok(UpstreamConfig {
        url,
        api_key,
        timeout,
    })
}

fn build_relay_config(raw: Option<raw::RawRelayConfig>) -> Result<RelayConfig, ConfigError> {
    let mut relay = RelayConfig::default();
    let Some(raw) = raw else {
        return Ok(relay);
    };

    if let Some(path) = raw.path {
        if !path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "relay.path must start with '/', got \"{path}\""
            )));
        }
        relay.path = path;
    }

    if let Some(max) = raw.max_body_bytes {
        if max == 0 {
            return Err(ConfigError::Validation(
                "relay.max_body_bytes must be greater than 0".to_string(),
            ));
        }
        relay.max_body_bytes = max;
    }

    if let Some(platform) = raw.platform {
        let platform = resolve_variables(&platform)?;
        if platform.trim().is_empty() {
            return Err(ConfigError::Validation(
                "relay.platform must not be empty".to_string(),
            ));
        }
        relay.platform = platform;
    }

    Ok(relay)
}
