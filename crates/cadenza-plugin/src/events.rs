// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle events published by the plugin registry.

use cadenza_bus::{EventBus, Subscription};
use cadenza_core::PluginCategory;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// A registry lifecycle event.
///
/// Each variant is published on the bus under its own event name (see
/// [`RegistryEvent::name`]) with the serialized event as payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RegistryEvent {
    #[serde(rename_all = "camelCase")]
    PluginRegistered {
        plugin_id: String,
        category: PluginCategory,
    },
    #[serde(rename_all = "camelCase")]
    PluginInitialized { plugin_id: String },
    #[serde(rename_all = "camelCase")]
    PluginActivated {
        plugin_id: String,
        category: PluginCategory,
    },
    #[serde(rename_all = "camelCase")]
    PluginDeactivated {
        plugin_id: String,
        category: PluginCategory,
    },
    #[serde(rename_all = "camelCase")]
    PluginUnregistered { plugin_id: String },
    #[serde(rename_all = "camelCase")]
    PluginError {
        plugin_id: String,
        hook: String,
        message: String,
    },
}

impl RegistryEvent {
    /// Every bus event name the registry publishes on.
    pub const NAMES: [&'static str; 6] = [
        "plugin-registered",
        "plugin-initialized",
        "plugin-activated",
        "plugin-deactivated",
        "plugin-unregistered",
        "plugin-error",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::PluginRegistered { .. } => "plugin-registered",
            Self::PluginInitialized { .. } => "plugin-initialized",
            Self::PluginActivated { .. } => "plugin-activated",
            Self::PluginDeactivated { .. } => "plugin-deactivated",
            Self::PluginUnregistered { .. } => "plugin-unregistered",
            Self::PluginError { .. } => "plugin-error",
        }
    }

    pub fn plugin_id(&self) -> &str {
        match self {
            Self::PluginRegistered { plugin_id, .. }
            | Self::PluginInitialized { plugin_id }
            | Self::PluginActivated { plugin_id, .. }
            | Self::PluginDeactivated { plugin_id, .. }
            | Self::PluginUnregistered { plugin_id }
            | Self::PluginError { plugin_id, .. } => plugin_id,
        }
    }
}

/// Handle for a registry event listener. Covers every registry event name.
#[derive(Debug)]
pub struct RegistrySubscription {
    subscriptions: Vec<Subscription>,
}

impl RegistrySubscription {
    pub(crate) fn listen<F>(bus: &EventBus, handler: F) -> Self
    where
        F: Fn(&RegistryEvent) + Send + Sync + 'static,
    {
        let handler = std::sync::Arc::new(handler);
        let subscriptions = RegistryEvent::NAMES
            .iter()
            .map(|name| {
                let handler = std::sync::Arc::clone(&handler);
                bus.on(name, move |value: &Value| {
                    match serde_json::from_value::<RegistryEvent>(value.clone()) {
                        Ok(event) => handler(&event),
                        Err(e) => debug!(error = %e, "ignoring malformed registry event"),
                    }
                })
            })
            .collect();
        Self { subscriptions }
    }

    /// Stop receiving events.
    pub fn unsubscribe(self) {
        for subscription in self.subscriptions {
            subscription.unsubscribe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_carries_type_tag_and_camel_case_fields() {
        let event = RegistryEvent::PluginActivated {
            plugin_id: "yt".into(),
            category: PluginCategory::MetadataProvider,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"type": "plugin-activated", "pluginId": "yt", "category": "metadata-provider"})
        );
        assert_eq!(event.name(), "plugin-activated");
        assert_eq!(value["type"], event.name());
    }

    #[test]
    fn names_cover_every_variant() {
        let events = [
            RegistryEvent::PluginRegistered {
                plugin_id: "a".into(),
                category: PluginCategory::SyncProvider,
            },
            RegistryEvent::PluginInitialized { plugin_id: "a".into() },
            RegistryEvent::PluginActivated {
                plugin_id: "a".into(),
                category: PluginCategory::SyncProvider,
            },
            RegistryEvent::PluginDeactivated {
                plugin_id: "a".into(),
                category: PluginCategory::SyncProvider,
            },
            RegistryEvent::PluginUnregistered { plugin_id: "a".into() },
            RegistryEvent::PluginError {
                plugin_id: "a".into(),
                hook: "destroy".into(),
                message: "boom".into(),
            },
        ];
        for (event, name) in events.iter().zip(RegistryEvent::NAMES) {
            assert_eq!(event.name(), name);
            assert_eq!(event.plugin_id(), "a");
        }
    }

    #[test]
    fn subscription_decodes_and_unsubscribes() {
        let bus = EventBus::new();
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = std::sync::Arc::clone(&seen);
        let sub = RegistrySubscription::listen(&bus, move |e| {
            sink.lock().unwrap().push(e.clone());
        });

        bus.emit_json(
            "plugin-initialized",
            &RegistryEvent::PluginInitialized { plugin_id: "x".into() },
        )
        .unwrap();
        bus.emit("plugin-error", json!({"garbage": true}));
        assert_eq!(seen.lock().unwrap().len(), 1);

        sub.unsubscribe();
        for name in RegistryEvent::NAMES {
            assert_eq!(bus.listener_count(name), 0);
        }
    }
}
