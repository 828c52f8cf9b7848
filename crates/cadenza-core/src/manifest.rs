// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin manifests: the static identity and capability descriptor of a plugin.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CadenzaError;
use crate::types::{PluginCategory, PluginConfig};

/// Immutable descriptor of a plugin. Two manifests with the same `id` are the
/// same logical plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    /// Globally unique id (e.g., "local-library", "lastfm").
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Semantic version string.
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// The role this plugin fills.
    pub category: PluginCategory,
    /// Declared capabilities (e.g., ["search", "lyrics"]).
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Ids of plugins that must be loaded first.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Settings the plugin understands.
    #[serde(default)]
    pub config_schema: Vec<ConfigField>,
}

impl PluginManifest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: PluginCategory) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: "0.1.0".to_string(),
            description: String::new(),
            author: None,
            category,
            capabilities: Vec::new(),
            dependencies: Vec::new(),
            config_schema: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_dependency(mut self, plugin_id: impl Into<String>) -> Self {
        self.dependencies.push(plugin_id.into());
        self
    }

    pub fn with_config_field(mut self, field: ConfigField) -> Self {
        self.config_schema.push(field);
        self
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }

    /// Reject manifests missing their identity fields.
    pub fn check_identity(&self) -> Result<(), CadenzaError> {
        if self.id.trim().is_empty() {
            return Err(CadenzaError::InvalidManifest(
                "manifest id must not be empty".to_string(),
            ));
        }
        if self.name.trim().is_empty() {
            return Err(CadenzaError::InvalidManifest(format!(
                "manifest `{}`: name must not be empty",
                self.id
            )));
        }
        Ok(())
    }

    /// Parse the version string as semver.
    pub fn parsed_version(&self) -> Result<semver::Version, CadenzaError> {
        semver::Version::parse(&self.version).map_err(|e| {
            CadenzaError::InvalidManifest(format!(
                "manifest `{}`: invalid version `{}`: {e}",
                self.id, self.version
            ))
        })
    }

    /// Defaults declared in the config schema.
    pub fn schema_defaults(&self) -> PluginConfig {
        self.config_schema
            .iter()
            .filter_map(|f| f.default.clone().map(|v| (f.key.clone(), v)))
            .collect()
    }
}

/// Type of a configurable setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFieldKind {
    String,
    Number,
    Boolean,
    /// One of `options`.
    Select,
}

/// One entry of a manifest's config schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigField {
    pub key: String,
    #[serde(default)]
    pub label: String,
    pub kind: ConfigFieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl ConfigField {
    pub fn new(key: impl Into<String>, kind: ConfigFieldKind) -> Self {
        let key = key.into();
        Self {
            label: key.clone(),
            key,
            kind,
            required: false,
            default: None,
            options: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    fn accepts(&self, value: &Value) -> bool {
        match self.kind {
            ConfigFieldKind::String => value.is_string(),
            ConfigFieldKind::Number => value.is_number(),
            ConfigFieldKind::Boolean => value.is_boolean(),
            ConfigFieldKind::Select => value
                .as_str()
                .is_some_and(|s| self.options.iter().any(|o| o == s)),
        }
    }
}

/// Merge `overrides` onto `defaults`, key by key. Overrides win.
pub fn merge_config(defaults: &PluginConfig, overrides: &PluginConfig) -> PluginConfig {
    let mut merged = defaults.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Check `config` against the manifest's schema.
///
/// Required keys must be present and non-null; present keys declared in the
/// schema must match their kind. Keys not in the schema are passed through.
pub fn validate_config(manifest: &PluginManifest, config: &PluginConfig) -> Result<(), CadenzaError> {
    let mut problems = Vec::new();

    for field in &manifest.config_schema {
        match config.get(&field.key) {
            None | Some(Value::Null) if field.required => {
                problems.push(format!("`{}` is required", field.key));
            }
            None | Some(Value::Null) => {}
            Some(value) if !field.accepts(value) => {
                let expected = match field.kind {
                    ConfigFieldKind::Select => format!("one of [{}]", field.options.join(", ")),
                    kind => format!("{kind:?}").to_lowercase(),
                };
                problems.push(format!("`{}` must be {expected}", field.key));
            }
            Some(_) => {}
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(CadenzaError::ValidationFailed {
            plugin_id: manifest.id.clone(),
            reason: problems.join("; "),
        })
    }
}
