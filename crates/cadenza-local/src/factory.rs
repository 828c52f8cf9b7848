// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Factory and manifest entry for the local library.

use std::sync::Arc;

use async_trait::async_trait;
use cadenza_core::{CadenzaError, Plugin, PluginConfig};
use cadenza_plugin::{ManifestEntry, PluginFactory, local_library_manifest};
use serde_json::Value;

use crate::library::LocalLibrary;

/// Creates [`LocalLibrary`] instances. The folder is read from the merged
/// config when the plugin is initialized.
#[derive(Debug, Default)]
pub struct LocalLibraryFactory;

#[async_trait]
impl PluginFactory for LocalLibraryFactory {
    /// Defaults `music_dir` to the platform audio folder when there is one.
    fn default_config(&self) -> PluginConfig {
        let mut config = PluginConfig::new();
        if let Some(dir) = dirs::audio_dir() {
            config.insert(
                "music_dir".to_string(),
                Value::String(dir.display().to_string()),
            );
        }
        config
    }

    async fn create(&self, _config: PluginConfig) -> Result<Arc<dyn Plugin>, CadenzaError> {
        Ok(Arc::new(LocalLibrary::new()))
    }
}

/// Built-in manifest registry entry for the local library.
pub fn manifest_entry() -> ManifestEntry {
    ManifestEntry::new(local_library_manifest(), Arc::new(LocalLibraryFactory))
        .built_in()
        .auto_activate()
}
