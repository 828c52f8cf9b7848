// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Manifests of the plugins compiled into the Cadenza binary.

use cadenza_core::{ConfigField, ConfigFieldKind, PluginCategory, PluginManifest};
use serde_json::json;

pub const LOCAL_LIBRARY_ID: &str = "local-library";

/// Manifest of the built-in local library plugin.
pub fn local_library_manifest() -> PluginManifest {
    let mut manifest = PluginManifest::new(
        LOCAL_LIBRARY_ID,
        "Local Library",
        PluginCategory::MetadataProvider,
    )
    .with_version(env!("CARGO_PKG_VERSION"))
    .with_description("Tracks from a music folder on this device")
    .with_capabilities(["search", "lookup", "stream", "offline"])
    .with_config_field(
        ConfigField::new("music_dir", ConfigFieldKind::String).required(),
    )
    .with_config_field(
        ConfigField::new("recursive", ConfigFieldKind::Boolean).with_default(json!(true)),
    );
    manifest.author = Some("Cadenza Contributors".to_string());
    manifest
}
