// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wires configuration, plugins, and services into one running instance.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use cadenza_actions::{attach_action_provider, ActionBinding, ActionResolver};
use cadenza_bus::EventBus;
use cadenza_config::CadenzaConfig;
use cadenza_core::{CadenzaError, PluginConfig, Track};
use cadenza_playback::{DownloadIndex, InMemoryPlayerState, PlaybackService, PlaybackSettings};
use cadenza_plugin::{
    ManifestRegistry, PluginLoader, PluginRegistry, Providers, StaticSettings, LOCAL_LIBRARY_ID,
};
use serde_json::Value;
use tracing::{debug, info, warn};

/// A started runtime. Call [`Runtime::shutdown`] before dropping.
pub struct Runtime {
    pub registry: Arc<PluginRegistry>,
    pub loader: PluginLoader,
    pub providers: Providers,
    pub playback: Arc<PlaybackService>,
    pub actions: ActionResolver,
    bindings: Vec<ActionBinding>,
}

impl Runtime {
    /// Load the enabled plugins and start the services.
    ///
    /// Plugins that fail to load are logged and skipped; the runtime still
    /// starts with whatever did load.
    pub async fn start(config: &CadenzaConfig) -> Self {
        let bus = EventBus::new();
        let registry = Arc::new(PluginRegistry::new(bus.clone()));

        let mut manifests = ManifestRegistry::new();
        if let Err(e) = manifests.register(cadenza_local::manifest_entry()) {
            warn!(error = %e, "failed to register built-in plugin");
        }

        let loader = PluginLoader::new(
            Arc::clone(&registry),
            manifests,
            Arc::new(plugin_settings(config)),
        );
        let report = loader.load_enabled_plugins().await;
        for failure in &report.failed {
            warn!(plugin_id = %failure.plugin_id, error = %failure.error, "plugin failed to load");
        }
        info!(loaded = report.loaded.len(), failed = report.failed.len(), "plugins loaded");

        let providers = Providers::new(Arc::clone(&registry));
        let bindings = providers
            .actions
            .get_all()
            .await
            .into_iter()
            .map(|provider| attach_action_provider(&bus, provider))
            .collect();

        let downloads = match config.library.downloads.as_deref() {
            Some(path) => load_downloads(Path::new(path)),
            None => DownloadIndex::new(),
        };
        let state = InMemoryPlayerState::with_volume(config.playback.default_volume);
        let playback = PlaybackService::new(
            Arc::clone(&registry),
            Arc::new(state),
            Arc::new(downloads),
            PlaybackSettings {
                restart_threshold: Duration::from_secs(config.playback.restart_threshold_secs),
            },
        );
        playback.watch_engines().await;

        let actions = ActionResolver::with_window(
            bus,
            Duration::from_millis(config.runtime.action_timeout_ms),
        );

        Self {
            registry,
            loader,
            providers,
            playback,
            actions,
            bindings,
        }
    }

    /// Find `track_id` through the metadata providers, highest priority first.
    ///
    /// Falls back to a bare track carrying only the id, which is still enough
    /// for sources that recognize the id scheme.
    pub async fn lookup_track(&self, track_id: &str) -> Track {
        for provider in self.providers.metadata.get_all().await {
            match provider.get_track(track_id).await {
                Ok(Some(track)) => return track,
                Ok(None) => {}
                Err(e) => debug!(provider = %provider.id(), track_id, error = %e, "lookup failed"),
            }
        }
        Track::new(track_id, track_id)
    }

    /// Search every metadata provider and concatenate the results.
    pub async fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<Track>, CadenzaError> {
        let providers = self.providers.metadata.get_all().await;
        if providers.is_empty() {
            return Err(CadenzaError::provider("no metadata provider is loaded"));
        }
        let mut tracks = Vec::new();
        for provider in providers {
            match provider.search_tracks(query, limit).await {
                Ok(found) => tracks.extend(found),
                Err(e) => warn!(provider = %provider.id(), error = %e, "search failed"),
            }
        }
        tracks.truncate(limit);
        Ok(tracks)
    }

    /// Refresh action bindings after plugins were loaded at runtime.
    pub async fn rebind_actions(&mut self) {
        for binding in self.bindings.drain(..) {
            binding.detach();
        }
        let bus = self.registry.bus().clone();
        self.bindings = self
            .providers
            .actions
            .get_all()
            .await
            .into_iter()
            .map(|provider| attach_action_provider(&bus, provider))
            .collect();
    }

    pub async fn shutdown(self) {
        for binding in self.bindings {
            binding.detach();
        }
        if let Err(e) = self.playback.stop().await {
            debug!(error = %e, "nothing to stop on shutdown");
        }
        self.registry.dispose().await;
    }
}

/// Enabled ids and per-plugin settings from the config file.
///
/// The `[library]` section seeds the local library's settings; an explicit
/// `[plugins.settings.local-library]` table still wins.
fn plugin_settings(config: &CadenzaConfig) -> StaticSettings {
    let mut configs: HashMap<String, PluginConfig> = config
        .plugins
        .settings
        .iter()
        .map(|(id, settings)| (id.clone(), settings.clone()))
        .collect();

    let mut library = PluginConfig::new();
    if let Some(dir) = &config.library.music_dir {
        library.insert("music_dir".to_string(), Value::String(dir.clone()));
    }
    library.insert("recursive".to_string(), Value::Bool(config.library.recursive));
    let overrides = configs.remove(LOCAL_LIBRARY_ID).unwrap_or_default();
    configs.insert(
        LOCAL_LIBRARY_ID.to_string(),
        cadenza_core::merge_config(&library, &overrides),
    );

    StaticSettings::new(config.plugins.enabled.clone(), configs)
}

fn load_downloads(path: &Path) -> DownloadIndex {
    match DownloadIndex::load(path) {
        Ok(index) => {
            debug!(path = %path.display(), entries = index.len(), "download index loaded");
            index
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable download index");
            DownloadIndex::new()
        }
    }
}
