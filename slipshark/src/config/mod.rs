// Copyright 2026 The SlipShark Project
// SPDX-License-Identifier: Apache-2.0

// Config loader and validator
//
// Loads slipshark.yaml, resolves variable interpolation (the upstream
// credential normally comes from ${SLIPSHARK_API_KEY}), validates values
// and fills defaults.

mod defaults;
mod error;
mod interpolation;
mod loader;
mod raw;
mod source;
mod types;

pub use defaults::{
    DEFAULT_MAX_BODY_BYTES, DEFAULT_PLATFORM, DEFAULT_RELAY_PATH, DEFAULT_UPSTREAM_URL,
};
pub use error::ConfigError;
pub use interpolation::resolve_variables;
pub use loader::load_config;
pub use source::{ConfigSource, FileSource, StringSource};
pub use types::{Config, RelayConfig, SecretString, UpstreamConfig};
