// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Cadenza plugin runtime.

use cadenza_bus::BusError;
use strum::Display;
use thiserror::Error;

use crate::types::PluginStatus;

/// Plugin lifecycle hooks driven by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum LifecycleHook {
    Initialize,
    Activate,
    Deactivate,
    Destroy,
}

/// The error type used across the registry, loader, and services.
#[derive(Debug, Error)]
pub enum CadenzaError {
    /// A plugin with the same manifest id is already registered.
    #[error("plugin `{id}` is already registered")]
    DuplicateId { id: String },

    /// The manifest is missing required identity fields or is malformed.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// No plugin with this id is registered.
    #[error("plugin `{id}` is not registered")]
    NotRegistered { id: String },

    /// A plugin lifecycle hook returned an error. The original error is kept as the source.
    #[error("plugin `{plugin_id}` failed to {hook}: {source}")]
    HookFailure {
        plugin_id: String,
        hook: LifecycleHook,
        source: Box<CadenzaError>,
    },

    /// The destroy hook failed while unregistering.
    #[error("plugin `{plugin_id}` failed to release its resources: {source}")]
    DestroyFailed {
        plugin_id: String,
        source: Box<CadenzaError>,
    },

    /// Every audio source was tried and none produced a stream.
    #[error("no audio source could resolve track `{track_id}`")]
    NoAudioSource { track_id: String },

    /// No playback engine is registered.
    #[error("no playback provider is registered")]
    NoPlaybackProvider,

    /// A playback control was issued with no engine selected.
    #[error("no playback provider is active")]
    NoActiveProvider,

    /// The manifest registry has no entry for this id.
    #[error("no manifest registered for plugin `{id}`")]
    ManifestNotFound { id: String },

    /// A plugin module or its configuration failed validation.
    #[error("plugin `{plugin_id}` failed validation: {reason}")]
    ValidationFailed { plugin_id: String, reason: String },

    /// The plugin is in a state that does not allow the requested transition.
    #[error("plugin `{id}` is {status} and cannot be activated")]
    PluginUnavailable { id: String, status: PluginStatus },

    /// A declared dependency is not registered.
    #[error("plugin `{plugin_id}` depends on `{dependency}`, which is not loaded")]
    MissingDependency {
        plugin_id: String,
        dependency: String,
    },

    /// Errors raised by provider implementations (stream resolution, engine control).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Event bus errors.
    #[error(transparent)]
    Bus(#[from] BusError),

    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A short user-facing message with an optional detail line.
///
/// This is what the presentation layer receives instead of raw error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserNotice {
    pub message: String,
    pub description: Option<String>,
}

impl UserNotice {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl CadenzaError {
    /// Shorthand for a provider error without an underlying cause.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            source: None,
        }
    }

    /// The id of the plugin this error concerns, if any.
    pub fn plugin_id(&self) -> Option<&str> {
        match self {
            Self::DuplicateId { id }
            | Self::NotRegistered { id }
            | Self::ManifestNotFound { id }
            | Self::PluginUnavailable { id, .. } => Some(id),
            Self::HookFailure { plugin_id, .. }
            | Self::DestroyFailed { plugin_id, .. }
            | Self::ValidationFailed { plugin_id, .. }
            | Self::MissingDependency { plugin_id, .. } => Some(plugin_id),
            _ => None,
        }
    }

    /// Translate into the message shown to the user.
    pub fn user_notice(&self) -> UserNotice {
        match self {
            Self::NoAudioSource { .. } => UserNotice::new("Couldn't play this track")
                .with_description("No audio source could provide a stream for it."),
            Self::NoPlaybackProvider => UserNotice::new("Playback unavailable")
                .with_description("No playback engine is installed."),
            Self::NoActiveProvider => UserNotice::new("Nothing is playing"),
            Self::HookFailure { plugin_id, .. } | Self::DestroyFailed { plugin_id, .. } => {
                UserNotice::new(format!("Plugin \"{plugin_id}\" ran into a problem"))
                    .with_description(self.to_string())
            }
            Self::ManifestNotFound { id } => UserNotice::new(format!("Plugin \"{id}\" is not installed")),
            Self::ValidationFailed { plugin_id, reason } => {
                UserNotice::new(format!("Plugin \"{plugin_id}\" is misconfigured"))
                    .with_description(reason.clone())
            }
            Self::MissingDependency {
                plugin_id,
                dependency,
            } => UserNotice::new(format!("Plugin \"{plugin_id}\" couldn't start"))
                .with_description(format!("It requires \"{dependency}\".")),
            Self::Provider { message, .. } => {
                UserNotice::new("Something went wrong").with_description(message.clone())
            }
            _ => UserNotice::new("Something went wrong").with_description(self.to_string()),
        }
    }
}
