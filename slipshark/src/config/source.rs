// Copyright 2026 The SlipShark Project
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use super::error::ConfigError;

/// Where config YAML comes from.
pub trait ConfigSource {
    fn load(&self) -> Result<String, ConfigError>;

    /// Human-readable origin, used in logs and error messages.
    fn origin(&self) -> String;
}

/// Reads config from a file on disk.
pub struct FileSource {
    pub path: PathBuf,
}

impl ConfigSource for FileSource {
    fn load(&self) -> Result<String, ConfigError> {
        std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            origin: self.origin(),
            source,
        })
    }

    fn origin(&self) -> String {
        self.path.display().to_string()
    }
}

/// Config content held in memory. Used by tests and embedded defaults.
pub struct StringSource {
    pub content: String,
}

impl ConfigSource for StringSource {
    fn load(&self) -> Result<String, ConfigError> {
        Ok(self.content.clone())
    }

    fn origin(&self) -> String {
        "<inline>".to_string()
    }
}
