// Copyright 2026 The SlipShark Project
// SPDX-License-Identifier: Apache-2.0

use super::error::ConfigError;

/// Expand `${VAR}` and `${VAR:-fallback}` references from the environment.
///
/// A reference without a fallback to an unset variable is an error.
/// An unterminated `${` is kept literally.
pub fn resolve_variables(input: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            result.push_str(&rest[start..]);
            return Ok(result);
        };

        let reference = &after[..end];
        let (name, fallback) = match reference.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (reference, None),
        };

        if name.is_empty() {
            result.push_str(&rest[start..start + 3 + end]);
        } else {
            match std::env::var(name) {
                Ok(value) if !value.is_empty() || fallback.is_none() => result.push_str(&value),
                Ok(_) | Err(_) => match fallback {
                    Some(fallback) => result.push_str(fallback),
                    None => {
                        return Err(ConfigError::UndefinedVariable {
                            name: name.to_string(),
                        })
                    }
                },
            }
        }
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}
