// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed access to the providers of one category.
//!
//! A [`ProviderCategory`] pairs a category tag with the provider trait it
//! yields and the projection from `dyn Plugin` to that trait. A
//! [`ProviderAccessor`] is the registry viewed through one such category.

use std::marker::PhantomData;
use std::sync::Arc;

use cadenza_core::{
    ActionProvider, AudioSourceProvider, CadenzaError, MetadataProvider, PlaybackProvider,
    Plugin, PluginCategory, PluginStatus, SyncProvider,
};

use crate::registry::{PluginRegistry, RegisterOptions};

/// Configuration of one provider role.
pub trait ProviderCategory: Send + Sync + 'static {
    /// The provider trait object this category yields.
    type Provider: ?Sized + Send + Sync + 'static;

    const CATEGORY: PluginCategory;

    /// Project a plugin onto this role, `None` if it does not fill it.
    fn project(plugin: &Arc<dyn Plugin>) -> Option<Arc<Self::Provider>>;
}

#[derive(Debug, Clone, Copy)]
pub struct MetadataCategory;

impl ProviderCategory for MetadataCategory {
    type Provider = dyn MetadataProvider;
    const CATEGORY: PluginCategory = PluginCategory::MetadataProvider;

    fn project(plugin: &Arc<dyn Plugin>) -> Option<Arc<Self::Provider>> {
        Arc::clone(plugin).as_metadata_provider()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PlaybackCategory;

impl ProviderCategory for PlaybackCategory {
    type Provider = dyn PlaybackProvider;
    const CATEGORY: PluginCategory = PluginCategory::PlaybackProvider;

    fn project(plugin: &Arc<dyn Plugin>) -> Option<Arc<Self::Provider>> {
        Arc::clone(plugin).as_playback_provider()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AudioSourceCategory;

impl ProviderCategory for AudioSourceCategory {
    type Provider = dyn AudioSourceProvider;
    const CATEGORY: PluginCategory = PluginCategory::AudioSource;

    fn project(plugin: &Arc<dyn Plugin>) -> Option<Arc<Self::Provider>> {
        Arc::clone(plugin).as_audio_source()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SyncCategory;

impl ProviderCategory for SyncCategory {
    type Provider = dyn SyncProvider;
    const CATEGORY: PluginCategory = PluginCategory::SyncProvider;

    fn project(plugin: &Arc<dyn Plugin>) -> Option<Arc<Self::Provider>> {
        Arc::clone(plugin).as_sync_provider()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ActionCategory;

impl ProviderCategory for ActionCategory {
    type Provider = dyn ActionProvider;
    const CATEGORY: PluginCategory = PluginCategory::ActionProvider;

    fn project(plugin: &Arc<dyn Plugin>) -> Option<Arc<Self::Provider>> {
        Arc::clone(plugin).as_action_provider()
    }
}

/// The registry seen through one provider category.
pub struct ProviderAccessor<C: ProviderCategory> {
    registry: Arc<PluginRegistry>,
    _category: PhantomData<fn() -> C>,
}

impl<C: ProviderCategory> ProviderAccessor<C> {
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self {
            registry,
            _category: PhantomData,
        }
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// The active provider of this category.
    pub async fn get_active(&self) -> Option<Arc<C::Provider>> {
        self.registry
            .active_plugin(C::CATEGORY)
            .await
            .and_then(|entry| C::project(&entry.plugin))
    }

    /// Every usable plugin that fills this role, highest priority first.
    ///
    /// A plugin qualifies by implementing the role, regardless of its
    /// manifest category, so a library plugin can act as metadata provider
    /// and audio source at once. Plugins in `error` or `disabled` status are
    /// left out.
    pub async fn get_all(&self) -> Vec<Arc<C::Provider>> {
        self.registry
            .plugins_by_priority()
            .await
            .into_iter()
            .filter(|e| !matches!(e.status, PluginStatus::Error | PluginStatus::Disabled))
            .filter_map(|e| C::project(&e.plugin))
            .collect()
    }

    /// Register, initialize, and activate `plugin` in one step.
    ///
    /// Stops at the first failing step and returns its error.
    pub async fn register(
        &self,
        plugin: Arc<dyn Plugin>,
        options: RegisterOptions,
    ) -> Result<(), CadenzaError> {
        if C::project(&plugin).is_none() {
            return Err(CadenzaError::InvalidManifest(format!(
                "plugin `{}` does not implement the {} role",
                plugin.id(),
                C::CATEGORY
            )));
        }
        let id = plugin.id().to_string();
        self.registry.register(plugin, options).await?;
        self.registry.initialize(&id).await?;
        self.registry.activate(&id).await
    }
}

impl<C: ProviderCategory> Clone for ProviderAccessor<C> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.registry))
    }
}

impl<C: ProviderCategory> std::fmt::Debug for ProviderAccessor<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderAccessor")
            .field("category", &C::CATEGORY)
            .finish()
    }
}

/// One accessor per category, for handing to services.
#[derive(Debug, Clone)]
pub struct Providers {
    pub metadata: ProviderAccessor<MetadataCategory>,
    pub playback: ProviderAccessor<PlaybackCategory>,
    pub audio_sources: ProviderAccessor<AudioSourceCategory>,
    pub sync: ProviderAccessor<SyncCategory>,
    pub actions: ProviderAccessor<ActionCategory>,
}

impl Providers {
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self {
            metadata: ProviderAccessor::new(Arc::clone(&registry)),
            playback: ProviderAccessor::new(Arc::clone(&registry)),
            audio_sources: ProviderAccessor::new(Arc::clone(&registry)),
            sync: ProviderAccessor::new(Arc::clone(&registry)),
            actions: ProviderAccessor::new(registry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadenza_bus::EventBus;
    use cadenza_core::LifecycleHook;
    use cadenza_test_utils::{MockAudioSource, MockMetadata, MockPlaybackEngine, MockPlugin};

    fn registry() -> Arc<PluginRegistry> {
        Arc::new(PluginRegistry::new(EventBus::new()))
    }

    #[tokio::test]
    async fn register_runs_full_lifecycle() {
        let registry = registry();
        let providers = Providers::new(Arc::clone(&registry));

        providers
            .metadata
            .register(Arc::new(MockMetadata::new("yt", vec![])), RegisterOptions::default())
            .await
            .unwrap();

        assert_eq!(registry.status("yt").await, Some(PluginStatus::Active));
        let active = providers.metadata.get_active().await.unwrap();
        assert_eq!(active.id(), "yt");
        assert!(providers.playback.get_active().await.is_none());
    }

    #[tokio::test]
    async fn register_rejects_plugins_outside_the_role() {
        let registry = registry();
        let accessor = ProviderAccessor::<PlaybackCategory>::new(Arc::clone(&registry));
        let err = accessor
            .register(
                Arc::new(MockPlugin::new("plain", PluginCategory::PlaybackProvider)),
                RegisterOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CadenzaError::InvalidManifest(_)));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn register_short_circuits_on_initialize_failure() {
        let registry = registry();
        let accessor = ProviderAccessor::<MetadataCategory>::new(Arc::clone(&registry));
        let plugin = Arc::new(MockMetadata::new("bad", vec![]).failing_on(LifecycleHook::Initialize));

        let err = accessor
            .register(plugin.clone(), RegisterOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CadenzaError::HookFailure {
                hook: LifecycleHook::Initialize,
                ..
            }
        ));
        assert_eq!(registry.status("bad").await, Some(PluginStatus::Error));
        assert!(plugin.hooks().log().matching("bad:activate").is_empty());
    }

    #[tokio::test]
    async fn get_all_orders_by_priority_and_skips_errored() {
        let registry = registry();
        for (id, priority) in [("low", 1), ("high", 10), ("mid", 5)] {
            registry
                .register(
                    Arc::new(MockAudioSource::new(id)),
                    RegisterOptions::default().with_priority(priority),
                )
                .await
                .unwrap();
        }
        let broken = MockAudioSource::new("broken");
        broken.hooks().set_failing(LifecycleHook::Initialize, true);
        registry
            .register(Arc::new(broken), RegisterOptions::default().with_priority(100))
            .await
            .unwrap();
        let _ = registry.initialize("broken").await;
        registry
            .register(Arc::new(MockPlaybackEngine::new("engine")), RegisterOptions::default())
            .await
            .unwrap();

        let sources = ProviderAccessor::<AudioSourceCategory>::new(registry)
            .get_all()
            .await;
        let ids: Vec<&str> = sources.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);
    }
}
