// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model.
//!
//! Every struct uses `#[serde(deny_unknown_fields)]` so a misspelled key is
//! an error at startup rather than a silently ignored setting.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-plugin settings table, passed to the plugin loader as overrides.
pub type PluginSettings = serde_json::Map<String, serde_json::Value>;

/// Top-level Cadenza configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CadenzaConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub plugins: PluginsConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub library: LibraryConfig,
}

/// Process-wide settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// How long action requests collect responses, in milliseconds.
    #[serde(default = "default_action_timeout_ms")]
    pub action_timeout_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            action_timeout_ms: default_action_timeout_ms(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_action_timeout_ms() -> u64 {
    100
}

/// Which plugins load at startup, and their settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PluginsConfig {
    /// Plugin ids to load, in order.
    #[serde(default = "default_enabled")]
    pub enabled: Vec<String>,

    /// `[plugins.settings.<id>]` tables.
    #[serde(default)]
    pub settings: BTreeMap<String, PluginSettings>,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            settings: BTreeMap::new(),
        }
    }
}

fn default_enabled() -> Vec<String> {
    vec!["local-library".to_string()]
}

impl PluginsConfig {
    /// Settings for `plugin_id`, empty if none are configured.
    pub fn settings_for(&self, plugin_id: &str) -> PluginSettings {
        self.settings.get(plugin_id).cloned().unwrap_or_default()
    }
}

/// Playback behavior.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlaybackConfig {
    /// "Previous" restarts the current track below this position.
    #[serde(default = "default_restart_threshold_secs")]
    pub restart_threshold_secs: u64,

    /// Initial volume, `0.0..=1.0`.
    #[serde(default = "default_volume")]
    pub default_volume: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            restart_threshold_secs: default_restart_threshold_secs(),
            default_volume: default_volume(),
        }
    }
}

fn default_restart_threshold_secs() -> u64 {
    3
}

fn default_volume() -> f32 {
    1.0
}

/// Local files.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LibraryConfig {
    /// Music folder served by the local library plugin.
    #[serde(default)]
    pub music_dir: Option<String>,

    /// Scan subfolders of `music_dir`.
    #[serde(default = "default_recursive")]
    pub recursive: bool,

    /// JSON index of downloaded tracks (`track id -> file path`).
    #[serde(default = "default_downloads")]
    pub downloads: Option<String>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            music_dir: None,
            recursive: default_recursive(),
            downloads: default_downloads(),
        }
    }
}

fn default_recursive() -> bool {
    true
}

fn default_downloads() -> Option<String> {
    dirs::data_dir().map(|d| d.join("cadenza/downloads.json").display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_settings_tables_deserialize() {
        let config: CadenzaConfig = toml::from_str(
            r#"
[plugins]
enabled = ["local-library", "lastfm"]

[plugins.settings.lastfm]
api_key = "secret"
scrobble_threshold = 50
"#,
        )
        .unwrap();
        assert_eq!(config.plugins.enabled, vec!["local-library", "lastfm"]);
        let lastfm = config.plugins.settings_for("lastfm");
        assert_eq!(lastfm["api_key"], "secret");
        assert_eq!(lastfm["scrobble_threshold"], 50);
        assert!(config.plugins.settings_for("local-library").is_empty());
    }

    #[test]
    fn sections_deny_unknown_fields() {
        let result = toml::from_str::<CadenzaConfig>(
            r#"
[playback]
restart_treshold_secs = 5
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn library_defaults() {
        let library = LibraryConfig::default();
        assert!(library.music_dir.is_none());
        assert!(library.recursive);
    }
}
