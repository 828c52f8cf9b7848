// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry of installable plugins: manifests paired with factories.
//!
//! The `ManifestRegistry` knows which plugins could be loaded; the
//! [`PluginRegistry`](crate::PluginRegistry) holds the ones that are.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use cadenza_core::{CadenzaError, Plugin, PluginCategory, PluginConfig, PluginManifest};

/// Factory trait for creating plugin instances from configuration.
#[async_trait]
pub trait PluginFactory: Send + Sync {
    /// Check the environment before any side effect. `Err` carries the reason.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    /// Configuration used when the user supplied none.
    fn default_config(&self) -> PluginConfig {
        PluginConfig::new()
    }

    /// Create a new plugin instance from the merged configuration.
    async fn create(&self, config: PluginConfig) -> Result<Arc<dyn Plugin>, CadenzaError>;
}

/// Case-insensitive match over id, name, and description. `query_lower`
/// must already be lowercase.
fn matches_query(manifest: &PluginManifest, query_lower: &str) -> bool {
    manifest.id.to_lowercase().contains(query_lower)
        || manifest.name.to_lowercase().contains(query_lower)
        || manifest.description.to_lowercase().contains(query_lower)
}

/// A single entry in the manifest registry.
#[derive(Clone)]
pub struct ManifestEntry {
    /// Plugin manifest with metadata.
    pub manifest: PluginManifest,
    pub factory: Arc<dyn PluginFactory>,
    /// Compiled into the binary rather than installed.
    pub is_built_in: bool,
    /// Priority the plugin is registered with.
    pub priority: i32,
    /// Activate as soon as it is initialized.
    pub auto_activate: bool,
}

impl ManifestEntry {
    pub fn new(manifest: PluginManifest, factory: Arc<dyn PluginFactory>) -> Self {
        Self {
            manifest,
            factory,
            is_built_in: false,
            priority: 0,
            auto_activate: false,
        }
    }

    pub fn built_in(mut self) -> Self {
        self.is_built_in = true;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn auto_activate(mut self) -> Self {
        self.auto_activate = true;
        self
    }

    pub fn id(&self) -> &str {
        &self.manifest.id
    }
}

impl std::fmt::Debug for ManifestEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestEntry")
            .field("manifest", &self.manifest)
            .field("is_built_in", &self.is_built_in)
            .field("priority", &self.priority)
            .field("auto_activate", &self.auto_activate)
            .finish()
    }
}

/// Manifests of every plugin that can be loaded, keyed by id.
#[derive(Debug, Default)]
pub struct ManifestRegistry {
    entries: HashMap<String, ManifestEntry>,
}

impl ManifestRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. Fails if its id is already present.
    pub fn register(&mut self, entry: ManifestEntry) -> Result<(), CadenzaError> {
        entry.manifest.check_identity()?;
        let id = entry.manifest.id.clone();
        if self.entries.contains_key(&id) {
            return Err(CadenzaError::DuplicateId { id });
        }
        self.entries.insert(id, entry);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<ManifestEntry> {
        self.entries.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&ManifestEntry> {
        self.entries.get(id)
    }

    /// List all entries, sorted by id.
    pub fn list_all(&self) -> Vec<&ManifestEntry> {
        let mut entries: Vec<&ManifestEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| a.manifest.id.cmp(&b.manifest.id));
        entries
    }

    /// Entries of `category`, sorted by id.
    pub fn by_category(&self, category: PluginCategory) -> Vec<&ManifestEntry> {
        self.list_all()
            .into_iter()
            .filter(|e| e.manifest.category == category)
            .collect()
    }

    /// Case-insensitive search over id, name, and description, sorted by id.
    pub fn search(&self, query: &str) -> Vec<&ManifestEntry> {
        let query_lower = query.to_lowercase();
        self.list_all()
            .into_iter()
            .filter(|e| matches_query(&e.manifest, &query_lower))
            .collect()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
