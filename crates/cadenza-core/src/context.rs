// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The context handed to a plugin when it is initialized.

use cadenza_bus::ScopedBus;
use serde_json::Value;

use crate::types::PluginConfig;

/// Everything a plugin receives from the registry at initialization.
///
/// The bus is scoped to `plugin:{id}`; use [`ScopedBus::global`] to reach
/// the shared channels (actions, registry events).
#[derive(Debug, Clone)]
pub struct PluginContext {
    pub plugin_id: String,
    pub bus: ScopedBus,
    pub config: PluginConfig,
    /// Span that plugin work should be recorded under.
    pub span: tracing::Span,
}

impl PluginContext {
    pub fn new(plugin_id: impl Into<String>, bus: ScopedBus, config: PluginConfig) -> Self {
        let plugin_id = plugin_id.into();
        let span = tracing::info_span!("plugin", plugin_id = %plugin_id);
        Self {
            plugin_id,
            bus,
            config,
            span,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.config.get(key).and_then(Value::as_bool)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.config.get(key).and_then(Value::as_u64)
    }
}
