// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin loader: turns manifest entries into registered, initialized plugins.
//!
//! Loading never raises; every attempt ends in a [`LoadResult`] so that one
//! broken plugin cannot stop the rest of a batch.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use cadenza_core::{merge_config, validate_config, CadenzaError, PluginConfig};
use tracing::{debug, info, warn};

use crate::manifest_registry::{ManifestEntry, ManifestRegistry};
use crate::registry::{PluginRegistry, RegisterOptions};

/// Source of the user's plugin settings.
pub trait PluginSettingsStore: Send + Sync {
    /// Ids of the plugins the user has enabled, in load order.
    fn enabled_plugins(&self) -> Vec<String>;

    /// User overrides for `plugin_id`. Empty when none are stored.
    fn plugin_config(&self, plugin_id: &str) -> PluginConfig;
}

/// Settings fixed at construction, typically read from the config file.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings {
    enabled: Vec<String>,
    configs: HashMap<String, PluginConfig>,
}

impl StaticSettings {
    pub fn new(enabled: Vec<String>, configs: HashMap<String, PluginConfig>) -> Self {
        Self { enabled, configs }
    }
}

impl PluginSettingsStore for StaticSettings {
    fn enabled_plugins(&self) -> Vec<String> {
        self.enabled.clone()
    }

    fn plugin_config(&self, plugin_id: &str) -> PluginConfig {
        self.configs.get(plugin_id).cloned().unwrap_or_default()
    }
}

/// Outcome of loading one plugin.
#[derive(Debug)]
pub struct LoadResult {
    pub plugin_id: String,
    pub error: Option<CadenzaError>,
}

impl LoadResult {
    fn ok(plugin_id: &str) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            error: None,
        }
    }

    fn failed(plugin_id: &str, error: CadenzaError) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug)]
pub struct LoadFailure {
    pub plugin_id: String,
    pub error: CadenzaError,
}

/// Summary of a batch load.
#[derive(Debug, Default)]
pub struct BatchLoadReport {
    pub loaded: Vec<String>,
    pub failed: Vec<LoadFailure>,
}

impl BatchLoadReport {
    fn push(&mut self, result: LoadResult) {
        match result.error {
            None => self.loaded.push(result.plugin_id),
            Some(error) => self.failed.push(LoadFailure {
                plugin_id: result.plugin_id,
                error,
            }),
        }
    }
}

/// Loads plugins from a [`ManifestRegistry`] into a [`PluginRegistry`].
pub struct PluginLoader {
    registry: Arc<PluginRegistry>,
    manifests: ManifestRegistry,
    settings: Arc<dyn PluginSettingsStore>,
}

impl PluginLoader {
    pub fn new(
        registry: Arc<PluginRegistry>,
        manifests: ManifestRegistry,
        settings: Arc<dyn PluginSettingsStore>,
    ) -> Self {
        Self {
            registry,
            manifests,
            settings,
        }
    }

    pub fn manifests(&self) -> &ManifestRegistry {
        &self.manifests
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Load one plugin, merging `overrides` over its default config.
    ///
    /// A plugin that is already registered counts as loaded.
    pub async fn load_plugin(&self, plugin_id: &str, overrides: PluginConfig) -> LoadResult {
        match self.try_load(plugin_id, overrides).await {
            Ok(()) => LoadResult::ok(plugin_id),
            Err(e) => {
                warn!(plugin_id = %plugin_id, error = %e, "failed to load plugin");
                LoadResult::failed(plugin_id, e)
            }
        }
    }

    /// Load `plugin_ids` with their stored settings.
    ///
    /// Ids are reordered so that a plugin's dependencies within the batch
    /// load before it; otherwise the given order is kept.
    pub async fn load_plugins(&self, plugin_ids: &[String]) -> BatchLoadReport {
        let mut report = BatchLoadReport::default();
        for id in load_order(plugin_ids, &self.manifests) {
            let overrides = self.settings.plugin_config(&id);
            report.push(self.load_plugin(&id, overrides).await);
        }
        info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "plugin batch loaded"
        );
        report
    }

    /// Load every plugin the settings store marks as enabled.
    pub async fn load_enabled_plugins(&self) -> BatchLoadReport {
        let enabled = self.settings.enabled_plugins();
        self.load_plugins(&enabled).await
    }

    /// Load every plugin in the manifest registry.
    pub async fn load_all_plugins(&self) -> BatchLoadReport {
        let ids: Vec<String> = self
            .manifests
            .list_all()
            .iter()
            .map(|e| e.manifest.id.clone())
            .collect();
        self.load_plugins(&ids).await
    }

    /// Unregister a loaded plugin.
    pub async fn unload_plugin(&self, plugin_id: &str) -> Result<(), CadenzaError> {
        self.registry.unregister(plugin_id).await
    }

    /// Unload then load again with the stored settings.
    ///
    /// A failed destroy hook still removes the plugin, so reloading proceeds
    /// after logging it.
    pub async fn reload_plugin(&self, plugin_id: &str) -> LoadResult {
        if self.registry.is_registered(plugin_id).await {
            match self.unload_plugin(plugin_id).await {
                Ok(()) => {}
                Err(e @ CadenzaError::DestroyFailed { .. }) => {
                    warn!(plugin_id = %plugin_id, error = %e, "reloading after failed destroy");
                }
                Err(e) => return LoadResult::failed(plugin_id, e),
            }
        }
        let overrides = self.settings.plugin_config(plugin_id);
        self.load_plugin(plugin_id, overrides).await
    }

    async fn try_load(&self, plugin_id: &str, overrides: PluginConfig) -> Result<(), CadenzaError> {
        if self.registry.is_registered(plugin_id).await {
            debug!(plugin_id = %plugin_id, "plugin already loaded");
            return Ok(());
        }

        let entry = self
            .manifests
            .get(plugin_id)
            .ok_or_else(|| CadenzaError::ManifestNotFound {
                id: plugin_id.to_string(),
            })?;

        entry
            .factory
            .validate()
            .map_err(|reason| CadenzaError::ValidationFailed {
                plugin_id: plugin_id.to_string(),
                reason,
            })?;

        for dependency in &entry.manifest.dependencies {
            if !self.registry.is_registered(dependency).await {
                return Err(CadenzaError::MissingDependency {
                    plugin_id: plugin_id.to_string(),
                    dependency: dependency.clone(),
                });
            }
        }

        let config = resolve_config(entry, &overrides);
        validate_config(&entry.manifest, &config)?;

        let plugin = entry.factory.create(config.clone()).await?;
        if plugin.id() != plugin_id {
            return Err(CadenzaError::InvalidManifest(format!(
                "factory for `{plugin_id}` produced plugin `{}`",
                plugin.id()
            )));
        }

        let options = RegisterOptions {
            priority: entry.priority,
            auto_activate: entry.auto_activate,
            config,
        };
        self.registry.register(plugin, options).await?;
        self.registry.initialize(plugin_id).await?;
        info!(plugin_id = %plugin_id, built_in = entry.is_built_in, "plugin loaded");
        Ok(())
    }
}

impl std::fmt::Debug for PluginLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginLoader")
            .field("manifests", &self.manifests.len())
            .finish_non_exhaustive()
    }
}

/// Schema defaults, then factory defaults, then user overrides.
fn resolve_config(entry: &ManifestEntry, overrides: &PluginConfig) -> PluginConfig {
    let defaults = merge_config(&entry.manifest.schema_defaults(), &entry.factory.default_config());
    merge_config(&defaults, overrides)
}

/// Order `ids` so in-batch dependencies come first, keeping the given order
/// otherwise. Cycles are broken at the point they are detected; the loader
/// then reports the unmet dependency.
fn load_order(ids: &[String], manifests: &ManifestRegistry) -> Vec<String> {
    fn visit(
        id: &str,
        batch: &HashSet<&str>,
        manifests: &ManifestRegistry,
        visiting: &mut HashSet<String>,
        done: &mut HashSet<String>,
        out: &mut Vec<String>,
    ) {
        if done.contains(id) || !visiting.insert(id.to_string()) {
            return;
        }
        if let Some(entry) = manifests.get(id) {
            for dep in &entry.manifest.dependencies {
                if batch.contains(dep.as_str()) {
                    visit(dep, batch, manifests, visiting, done, out);
                }
            }
        }
        visiting.remove(id);
        done.insert(id.to_string());
        out.push(id.to_string());
    }

    let batch: HashSet<&str> = ids.iter().map(String::as_str).collect();
    let mut visiting = HashSet::new();
    let mut done = HashSet::new();
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        visit(id, &batch, manifests, &mut visiting, &mut done, &mut out);
    }
    out
}
