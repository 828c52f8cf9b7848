// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered config loading with figment.
//!
//! `./cadenza.toml` > `~/.config/cadenza/cadenza.toml` > `/etc/cadenza/cadenza.toml`,
//! with `CADENZA_*` environment variables on top.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::CadenzaConfig;

const SECTIONS: &[&str] = &["runtime", "plugins", "playback", "library"];

/// Config file locations, lowest precedence first.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/cadenza/cadenza.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("cadenza/cadenza.toml"));
    }
    paths.push(PathBuf::from("cadenza.toml"));
    paths
}

/// Build the full figment: defaults, every config file, then env vars.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(CadenzaConfig::default()));
    for path in config_paths() {
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(env_provider())
}

/// Load from the standard locations with env overrides.
pub fn load_config() -> Result<CadenzaConfig, figment::Error> {
    build_figment().extract()
}

/// Load from a TOML string only. No files, no env.
pub fn load_config_from_str(toml_content: &str) -> Result<CadenzaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CadenzaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load from one explicit file with env overrides.
pub fn load_config_from_path(path: &Path) -> Result<CadenzaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CadenzaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// `CADENZA_PLAYBACK_DEFAULT_VOLUME` -> `playback.default_volume`.
///
/// Only the section prefix is turned into a dot; keys keep their
/// underscores.
fn env_provider() -> Env {
    Env::prefixed("CADENZA_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_only_at_the_section() {
        assert_eq!(map_env_key("runtime_log_level"), "runtime.log_level");
        assert_eq!(
            map_env_key("playback_restart_threshold_secs"),
            "playback.restart_threshold_secs"
        );
        assert_eq!(map_env_key("library_music_dir"), "library.music_dir");
        assert_eq!(map_env_key("RUNTIME_ACTION_TIMEOUT_MS"), "runtime.action_timeout_ms");
        assert_eq!(map_env_key("unknown_key"), "unknown_key");
    }

    #[test]
    fn local_file_has_highest_file_precedence() {
        let paths = config_paths();
        assert_eq!(paths.first(), Some(&PathBuf::from("/etc/cadenza/cadenza.toml")));
        assert_eq!(paths.last(), Some(&PathBuf::from("cadenza.toml")));
    }
}
