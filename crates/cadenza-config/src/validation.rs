// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation.
//!
//! Checks constraints serde cannot express. All problems are collected
//! rather than stopping at the first.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::CadenzaConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

pub fn validate_config(config: &CadenzaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let level = config.runtime.log_level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "runtime.log_level `{}` is not one of {}",
            config.runtime.log_level,
            LOG_LEVELS.join(", ")
        )));
    }

    let timeout = config.runtime.action_timeout_ms;
    if !(1..=10_000).contains(&timeout) {
        errors.push(ConfigError::validation(format!(
            "runtime.action_timeout_ms must be between 1 and 10000, got {timeout}"
        )));
    }

    let volume = config.playback.default_volume;
    if !(0.0..=1.0).contains(&volume) {
        errors.push(ConfigError::validation(format!(
            "playback.default_volume must be within 0.0..=1.0, got {volume}"
        )));
    }

    let mut seen = HashSet::new();
    for (i, id) in config.plugins.enabled.iter().enumerate() {
        if id.trim().is_empty() {
            errors.push(ConfigError::validation(format!(
                "plugins.enabled[{i}] must not be empty"
            )));
        } else if !seen.insert(id.as_str()) {
            errors.push(ConfigError::validation(format!(
                "plugin `{id}` is listed twice in plugins.enabled"
            )));
        }
    }

    if let Some(dir) = &config.library.music_dir
        && dir.trim().is_empty()
    {
        errors.push(ConfigError::validation(
            "library.music_dir must not be empty when set",
        ));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
