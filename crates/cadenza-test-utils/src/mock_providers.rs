// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock metadata, audio-source, and action providers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use cadenza_core::{
    ActionContext, ActionProvider, AudioSourceProvider, AudioStream, CadenzaError,
    LifecycleHook, MetadataProvider, Plugin, PluginCategory, PluginContext, PluginManifest,
    StreamQuality, Track, TrackAction,
};

use crate::mock_plugin::MockHooks;
use crate::CallLog;

/// Audio source that claims tracks by id prefix.
///
/// Resolves to `https://{id}.test/{track id}` unless set to fail. Every
/// resolve attempt is logged as `"{id}:resolve:{track id}"`.
#[derive(Debug)]
pub struct MockAudioSource {
    hooks: MockHooks,
    claims: Vec<String>,
    failing: AtomicBool,
    scheme: String,
}

impl MockAudioSource {
    pub fn new(id: &str) -> Self {
        Self {
            hooks: MockHooks::new(PluginManifest::new(
                id,
                format!("Mock source {id}"),
                PluginCategory::AudioSource,
            )),
            claims: Vec::new(),
            failing: AtomicBool::new(false),
            scheme: "https".to_string(),
        }
    }

    pub fn with_log(mut self, log: &CallLog) -> Self {
        self.hooks.set_log(log.clone());
        self
    }

    /// Claim tracks whose id starts with `prefix`.
    pub fn claiming(mut self, prefix: &str) -> Self {
        self.claims.push(prefix.to_string());
        self
    }

    /// Use `scheme` for produced URLs (e.g. `rtmp`).
    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_string();
        self
    }

    pub fn failing(self) -> Self {
        self.set_failing(true);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn hooks(&self) -> &MockHooks {
        &self.hooks
    }

    /// Ids of tracks this source was asked to resolve, in order.
    pub fn resolved(&self) -> Vec<String> {
        let prefix = format!("{}:resolve:", self.hooks.manifest().id);
        self.hooks
            .log()
            .matching(&prefix)
            .into_iter()
            .map(|e| e[prefix.len()..].to_string())
            .collect()
    }

    pub fn url_for(&self, track: &Track) -> String {
        format!("{}://{}.test/{}", self.scheme, self.hooks.manifest().id, track.id)
    }
}

#[async_trait]
impl Plugin for MockAudioSource {
    fn manifest(&self) -> &PluginManifest {
        self.hooks.manifest()
    }

    async fn initialize(&self, ctx: PluginContext) -> Result<(), CadenzaError> {
        self.hooks.initialize(ctx).await
    }

    async fn on_activate(&self) -> Result<(), CadenzaError> {
        self.hooks.run(LifecycleHook::Activate).await
    }

    async fn on_deactivate(&self) -> Result<(), CadenzaError> {
        self.hooks.run(LifecycleHook::Deactivate).await
    }

    async fn destroy(&self) -> Result<(), CadenzaError> {
        self.hooks.run(LifecycleHook::Destroy).await
    }

    fn as_audio_source(self: Arc<Self>) -> Option<Arc<dyn AudioSourceProvider>> {
        Some(self)
    }
}

#[async_trait]
impl AudioSourceProvider for MockAudioSource {
    fn supports_track(&self, track: &Track) -> bool {
        self.claims.iter().any(|p| track.id.starts_with(p.as_str()))
    }

    async fn resolve_stream(&self, track: &Track) -> Result<AudioStream, CadenzaError> {
        self.hooks.record(format!("resolve:{}", track.id));
        if self.failing.load(Ordering::SeqCst) {
            return Err(CadenzaError::provider(format!(
                "{} cannot resolve {}",
                self.hooks.manifest().id,
                track.id
            )));
        }
        Ok(AudioStream::new(self.url_for(track), "opus", StreamQuality::High).with_bitrate(160))
    }
}

/// In-memory metadata provider.
#[derive(Debug)]
pub struct MockMetadata {
    hooks: MockHooks,
    tracks: Vec<Track>,
}

impl MockMetadata {
    pub fn new(id: &str, tracks: Vec<Track>) -> Self {
        Self {
            hooks: MockHooks::new(
                PluginManifest::new(id, format!("Mock metadata {id}"), PluginCategory::MetadataProvider)
                    .with_capabilities(["search"]),
            ),
            tracks,
        }
    }

    pub fn with_log(mut self, log: &CallLog) -> Self {
        self.hooks.set_log(log.clone());
        self
    }

    pub fn failing_on(self, hook: LifecycleHook) -> Self {
        self.hooks.set_failing(hook, true);
        self
    }

    pub fn hooks(&self) -> &MockHooks {
        &self.hooks
    }
}

#[async_trait]
impl Plugin for MockMetadata {
    fn manifest(&self) -> &PluginManifest {
        self.hooks.manifest()
    }

    async fn initialize(&self, ctx: PluginContext) -> Result<(), CadenzaError> {
        self.hooks.initialize(ctx).await
    }

    async fn on_activate(&self) -> Result<(), CadenzaError> {
        self.hooks.run(LifecycleHook::Activate).await
    }

    async fn on_deactivate(&self) -> Result<(), CadenzaError> {
        self.hooks.run(LifecycleHook::Deactivate).await
    }

    async fn destroy(&self) -> Result<(), CadenzaError> {
        self.hooks.run(LifecycleHook::Destroy).await
    }

    fn as_metadata_provider(self: Arc<Self>) -> Option<Arc<dyn MetadataProvider>> {
        Some(self)
    }
}

#[async_trait]
impl MetadataProvider for MockMetadata {
    async fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<Track>, CadenzaError> {
        let query = query.to_lowercase();
        Ok(self
            .tracks
            .iter()
            .filter(|t| t.title.to_lowercase().contains(&query))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_track(&self, id: &str) -> Result<Option<Track>, CadenzaError> {
        Ok(self.tracks.iter().find(|t| t.id == id).cloned())
    }
}

/// Action contributor answering with a fixed action list.
#[derive(Debug)]
pub struct MockActionProvider {
    hooks: MockHooks,
    actions: Vec<TrackAction>,
    handles: AtomicBool,
    fail_execute: AtomicBool,
    delay: Option<Duration>,
}

impl MockActionProvider {
    /// `actions` are `(action id, label, order)` triples.
    pub fn new(id: &str, actions: &[(&str, &str, i32)]) -> Self {
        let actions = actions
            .iter()
            .map(|(action_id, label, order)| {
                TrackAction::new(*action_id, id, *label).with_order(*order)
            })
            .collect();
        Self {
            hooks: MockHooks::new(PluginManifest::new(
                id,
                format!("Mock actions {id}"),
                PluginCategory::ActionProvider,
            )),
            actions,
            handles: AtomicBool::new(true),
            fail_execute: AtomicBool::new(false),
            delay: None,
        }
    }

    pub fn with_log(mut self, log: &CallLog) -> Self {
        self.hooks.set_log(log.clone());
        self
    }

    /// Delay every response by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answer execute requests with `handled = false`.
    pub fn declining(self) -> Self {
        self.handles.store(false, Ordering::SeqCst);
        self
    }

    /// Return an error from `execute_action`.
    pub fn failing_execute(self) -> Self {
        self.fail_execute.store(true, Ordering::SeqCst);
        self
    }

    pub fn hooks(&self) -> &MockHooks {
        &self.hooks
    }

    /// Action ids this provider executed, in order.
    pub fn executed(&self) -> Vec<String> {
        let prefix = format!("{}:execute:", self.hooks.manifest().id);
        self.hooks
            .log()
            .matching(&prefix)
            .into_iter()
            .map(|e| e[prefix.len()..].to_string())
            .collect()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Plugin for MockActionProvider {
    fn manifest(&self) -> &PluginManifest {
        self.hooks.manifest()
    }

    async fn initialize(&self, ctx: PluginContext) -> Result<(), CadenzaError> {
        self.hooks.initialize(ctx).await
    }

    async fn on_activate(&self) -> Result<(), CadenzaError> {
        self.hooks.run(LifecycleHook::Activate).await
    }

    async fn on_deactivate(&self) -> Result<(), CadenzaError> {
        self.hooks.run(LifecycleHook::Deactivate).await
    }

    async fn destroy(&self) -> Result<(), CadenzaError> {
        self.hooks.run(LifecycleHook::Destroy).await
    }

    fn as_action_provider(self: Arc<Self>) -> Option<Arc<dyn ActionProvider>> {
        Some(self)
    }
}

#[async_trait]
impl ActionProvider for MockActionProvider {
    async fn actions_for(
        &self,
        _track: &Track,
        _context: ActionContext,
    ) -> Result<Vec<TrackAction>, CadenzaError> {
        self.pause().await;
        Ok(self.actions.clone())
    }

    async fn execute_action(&self, action_id: &str, _track: &Track) -> Result<bool, CadenzaError> {
        self.pause().await;
        self.hooks.record(format!("execute:{action_id}"));
        if self.fail_execute.load(Ordering::SeqCst) {
            return Err(CadenzaError::provider(format!("{action_id} exploded")));
        }
        Ok(self.handles.load(Ordering::SeqCst))
    }
}
