// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Cadenza plugin runtime.
//!
//! This crate provides the plugin and provider trait definitions, the error
//! taxonomy, plugin manifests, and the media types (tracks, streams, actions)
//! shared by every other crate in the workspace. Plugins implement the traits
//! defined here; the registry and services only ever see them through these
//! interfaces.

pub mod context;
pub mod error;
pub mod manifest;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use context::PluginContext;
pub use error::{CadenzaError, LifecycleHook, UserNotice};
pub use manifest::{
    merge_config, validate_config, ConfigField, ConfigFieldKind, PluginManifest,
};
pub use types::{
    ActionContext, AudioStream, PlaybackEvent, PlaybackStatus, PluginCategory, PluginConfig,
    PluginStatus, StreamQuality, SyncReport, Track, TrackAction,
};

pub use traits::{
    ActionProvider, AudioSourceProvider, MetadataProvider, PlaybackProvider, Plugin,
    SyncProvider,
};
