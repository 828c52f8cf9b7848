// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base plugin trait that every capability module implements.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::PluginContext;
use crate::error::CadenzaError;
use crate::manifest::PluginManifest;
use crate::traits::{
    ActionProvider, AudioSourceProvider, MetadataProvider, PlaybackProvider, SyncProvider,
};

/// The base trait for all Cadenza plugins.
///
/// Provides identity and the lifecycle hooks driven by the registry. The
/// `as_*` methods declare which provider roles the plugin can fill; a plugin
/// implementing [`AudioSourceProvider`] overrides `as_audio_source` to return
/// `Some(self)`. Callers only ever reach provider methods through these
/// projections.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Returns the manifest this plugin was built from.
    fn manifest(&self) -> &PluginManifest;

    /// Shorthand for `manifest().id`.
    fn id(&self) -> &str {
        &self.manifest().id
    }

    /// Acquire resources. Called once, before any activation.
    async fn initialize(&self, ctx: PluginContext) -> Result<(), CadenzaError>;

    /// Called when the plugin becomes the active provider of its category.
    async fn on_activate(&self) -> Result<(), CadenzaError> {
        Ok(())
    }

    /// Called when the plugin stops being the active provider.
    async fn on_deactivate(&self) -> Result<(), CadenzaError> {
        Ok(())
    }

    /// Release all resources. Called on unregister.
    async fn destroy(&self) -> Result<(), CadenzaError>;

    fn as_metadata_provider(self: Arc<Self>) -> Option<Arc<dyn MetadataProvider>> {
        None
    }

    fn as_audio_source(self: Arc<Self>) -> Option<Arc<dyn AudioSourceProvider>> {
        None
    }

    fn as_playback_provider(self: Arc<Self>) -> Option<Arc<dyn PlaybackProvider>> {
        None
    }

    fn as_sync_provider(self: Arc<Self>) -> Option<Arc<dyn SyncProvider>> {
        None
    }

    fn as_action_provider(self: Arc<Self>) -> Option<Arc<dyn ActionProvider>> {
        None
    }
}
