// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for configuration loading and diagnostics.

use cadenza_config::diagnostic::ConfigError;
use cadenza_config::model::CadenzaConfig;
use cadenza_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};
use figment::Figment;
use figment::providers::{Format, Serialized, Toml};

#[test]
fn full_config_deserializes() {
    let toml = r#"
[runtime]
log_level = "debug"
action_timeout_ms = 250

[plugins]
enabled = ["local-library", "lastfm"]

[plugins.settings.lastfm]
api_key = "k"

[playback]
restart_threshold_secs = 5
default_volume = 0.6

[library]
music_dir = "/srv/music"
recursive = false
downloads = "/var/lib/cadenza/downloads.json"
"#;

    let config = load_config_from_str(toml).unwrap();
    assert_eq!(config.runtime.log_level, "debug");
    assert_eq!(config.runtime.action_timeout_ms, 250);
    assert_eq!(config.plugins.enabled, vec!["local-library", "lastfm"]);
    assert_eq!(config.plugins.settings_for("lastfm")["api_key"], "k");
    assert_eq!(config.playback.restart_threshold_secs, 5);
    assert!((config.playback.default_volume - 0.6).abs() < f32::EPSILON);
    assert_eq!(config.library.music_dir.as_deref(), Some("/srv/music"));
    assert!(!config.library.recursive);
    assert_eq!(
        config.library.downloads.as_deref(),
        Some("/var/lib/cadenza/downloads.json")
    );
}

#[test]
fn empty_config_uses_defaults() {
    let config = load_config_from_str("").unwrap();
    assert_eq!(config.runtime.log_level, "info");
    assert_eq!(config.runtime.action_timeout_ms, 100);
    assert_eq!(config.plugins.enabled, vec!["local-library"]);
    assert!(config.plugins.settings.is_empty());
    assert_eq!(config.playback.restart_threshold_secs, 3);
    assert_eq!(config.playback.default_volume, 1.0);
    assert!(config.library.music_dir.is_none());
    assert!(config.library.recursive);
}

#[test]
fn dotted_overrides_reach_underscored_keys() {
    let config: CadenzaConfig = Figment::new()
        .merge(Serialized::defaults(CadenzaConfig::default()))
        .merge(Toml::string("[playback]\nrestart_threshold_secs = 10\n"))
        .merge(("playback.restart_threshold_secs", 1))
        .merge(("library.music_dir", "/from/env"))
        .extract()
        .unwrap();
    assert_eq!(config.playback.restart_threshold_secs, 1);
    assert_eq!(config.library.music_dir.as_deref(), Some("/from/env"));
}

#[test]
fn missing_files_are_skipped() {
    let config: CadenzaConfig = Figment::new()
        .merge(Serialized::defaults(CadenzaConfig::default()))
        .merge(Toml::file("/nonexistent/cadenza.toml"))
        .extract()
        .unwrap();
    assert_eq!(config, CadenzaConfig::default());
}

#[test]
fn unknown_top_level_section_is_rejected() {
    let err = load_config_from_str("[logging]\nlevel = \"debug\"\n").unwrap_err();
    let message = err.to_string();
    assert!(
        message.contains("unknown field") || message.contains("logging"),
        "got: {message}"
    );
}

#[test]
fn unknown_key_suggests_correction_and_lists_valid_keys() {
    let errors = load_and_validate_str("[runtime]\nlog_levle = \"debug\"\n").unwrap_err();
    let found = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, hint, .. }
            if key == "log_levle"
                && suggestion.as_deref() == Some("log_level")
                && hint.contains("action_timeout_ms"))
    });
    assert!(found, "got: {errors:?}");
}

#[test]
fn invalid_type_names_the_key() {
    let errors = load_and_validate_str("[playback]\nrestart_threshold_secs = \"soon\"\n")
        .unwrap_err();
    assert!(
        errors.iter().any(|e| matches!(
            e,
            ConfigError::InvalidType { key, .. } if key == "playback.restart_threshold_secs"
        )),
        "got: {errors:?}"
    );
}

#[test]
fn validation_runs_after_deserialization() {
    let errors = load_and_validate_str("[playback]\ndefault_volume = 2.0\n").unwrap_err();
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("default_volume"))
    ));
}

#[test]
fn file_errors_point_at_the_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cadenza.toml");
    std::fs::write(&path, "[library]\nmusic_dri = \"/srv/music\"\n").unwrap();

    let errors = load_and_validate_path(&path).unwrap_err();
    match &errors[0] {
        ConfigError::UnknownKey {
            key,
            suggestion,
            span,
            src,
            ..
        } => {
            assert_eq!(key, "music_dri");
            assert_eq!(suggestion.as_deref(), Some("music_dir"));
            // Spans depend on figment attaching the file as metadata.
            if let Some(span) = span {
                assert_eq!(span.offset(), "[library]\n".len());
                assert!(src.is_some());
            }
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn valid_file_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cadenza.toml");
    std::fs::write(&path, "[runtime]\nlog_level = \"warn\"\n").unwrap();
    let config = load_and_validate_path(&path).unwrap();
    assert_eq!(config.runtime.log_level, "warn");
}

#[test]
fn diagnostics_render_with_help() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "log_levle".to_string(),
        suggestion: Some("log_level".to_string()),
        hint: "did you mean `log_level`? Accepted keys: log_level, action_timeout_ms".to_string(),
        span: None,
        src: None,
    };
    assert!(error.code().is_some());
    assert!(error.help().unwrap().to_string().contains("did you mean `log_level`"));

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .unwrap();
    assert!(buf.contains("log_levle"));
}
