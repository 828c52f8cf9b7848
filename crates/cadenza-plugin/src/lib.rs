// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin registry, provider accessors, manifest registry, and plugin loader.
//!
//! The [`PluginRegistry`] owns every live plugin instance and drives its
//! lifecycle (`register -> initialize -> activate`), keeping at most one
//! active plugin per category. [`ProviderAccessor`] gives typed access to the
//! plugins of one category. The [`PluginLoader`] turns entries of the
//! [`ManifestRegistry`] into registered, initialized plugins.

pub mod accessor;
pub mod catalog;
pub mod events;
pub mod loader;
pub mod manifest_registry;
pub mod registry;

pub use accessor::{
    ActionCategory, AudioSourceCategory, MetadataCategory, PlaybackCategory, ProviderAccessor,
    ProviderCategory, Providers, SyncCategory,
};
pub use catalog::{local_library_manifest, LOCAL_LIBRARY_ID};
pub use events::{RegistryEvent, RegistrySubscription};
pub use loader::{
    BatchLoadReport, LoadFailure, LoadResult, PluginLoader, PluginSettingsStore, StaticSettings,
};
pub use manifest_registry::{ManifestEntry, ManifestRegistry, PluginFactory};
pub use registry::{PluginRegistry, RegisterOptions, RegisteredPlugin};
