// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock playback engine.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use cadenza_core::{
    CadenzaError, LifecycleHook, PlaybackEvent, PlaybackProvider, Plugin, PluginCategory,
    PluginContext, PluginManifest, Track,
};

use crate::mock_plugin::MockHooks;
use crate::CallLog;

#[derive(Debug, Default)]
struct EngineState {
    now_playing: Option<String>,
    url: Option<String>,
    headers: BTreeMap<String, String>,
    paused: bool,
    volume: Option<f32>,
    position: Option<Duration>,
}

/// A playback engine that records control calls and lets the test inject
/// engine events with [`MockPlaybackEngine::emit`].
///
/// Calls are logged as `"{id}:play:{track id}"`, `"{id}:stop"`, and so on.
#[derive(Debug)]
pub struct MockPlaybackEngine {
    hooks: MockHooks,
    prefixes: Vec<String>,
    fail_play: AtomicBool,
    fail_stop: AtomicBool,
    play_delay: Option<Duration>,
    stop_event: Option<PlaybackEvent>,
    stop_delay: Option<Duration>,
    state: Mutex<EngineState>,
    events: broadcast::Sender<PlaybackEvent>,
}

impl MockPlaybackEngine {
    pub fn new(id: &str) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            hooks: MockHooks::new(PluginManifest::new(
                id,
                format!("Mock engine {id}"),
                PluginCategory::PlaybackProvider,
            )),
            prefixes: Vec::new(),
            fail_play: AtomicBool::new(false),
            fail_stop: AtomicBool::new(false),
            play_delay: None,
            stop_event: None,
            stop_delay: None,
            state: Mutex::new(EngineState::default()),
            events,
        }
    }

    pub fn with_log(mut self, log: &CallLog) -> Self {
        self.hooks.set_log(log.clone());
        self
    }

    /// Report `can_handle` for URLs starting with `prefix`.
    pub fn handling(mut self, prefix: &str) -> Self {
        self.prefixes.push(prefix.to_string());
        self
    }

    /// Sleep inside `play` before starting.
    pub fn with_play_delay(mut self, delay: Duration) -> Self {
        self.play_delay = Some(delay);
        self
    }

    /// Emit `event` as soon as `stop` is called, the way a real engine
    /// reports the end of the track it was playing.
    pub fn emitting_on_stop(mut self, event: PlaybackEvent) -> Self {
        self.stop_event = Some(event);
        self
    }

    /// Sleep inside `stop` before it returns.
    pub fn with_stop_delay(mut self, delay: Duration) -> Self {
        self.stop_delay = Some(delay);
        self
    }

    pub fn failing_play(self) -> Self {
        self.fail_play.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_stop(self) -> Self {
        self.fail_stop.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_on(self, hook: LifecycleHook) -> Self {
        self.hooks.set_failing(hook, true);
        self
    }

    pub fn hooks(&self) -> &MockHooks {
        &self.hooks
    }

    pub fn calls(&self) -> Vec<String> {
        self.hooks.log().matching(&format!("{}:", self.hooks.manifest().id))
    }

    /// Push an event to subscribers. Returns the number of receivers.
    pub fn emit(&self, event: PlaybackEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }

    /// Id of the track currently loaded, if playing or paused.
    pub fn now_playing(&self) -> Option<String> {
        self.lock().now_playing.clone()
    }

    pub fn current_url(&self) -> Option<String> {
        self.lock().url.clone()
    }

    pub fn current_headers(&self) -> BTreeMap<String, String> {
        self.lock().headers.clone()
    }

    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    pub fn volume(&self) -> Option<f32> {
        self.lock().volume
    }

    pub fn position(&self) -> Option<Duration> {
        self.lock().position
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Plugin for MockPlaybackEngine {
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

    fn as_playback_provider(self: Arc<Self>) -> Option<Arc<dyn PlaybackProvider>> {
        Some(self)
    }
}

#[async_trait]
impl PlaybackProvider for MockPlaybackEngine {
    fn can_handle(&self, url: &str) -> bool {
        self.prefixes.iter().any(|p| url.starts_with(p.as_str()))
    }

    async fn play(
        &self,
        track: &Track,
        url: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<(), CadenzaError> {
        if let Some(delay) = self.play_delay {
            tokio::time::sleep(delay).await;
        }
        self.hooks.record(format!("play:{}", track.id));
        if self.fail_play.load(Ordering::SeqCst) {
            return Err(CadenzaError::provider(format!("cannot open {url}")));
        }
        let mut state = self.lock();
        state.now_playing = Some(track.id.clone());
        state.url = Some(url.to_string());
        state.headers = headers.clone();
        state.paused = false;
        state.position = Some(Duration::ZERO);
        Ok(())
    }

    async fn pause(&self) -> Result<(), CadenzaError> {
        self.hooks.record("pause");
        self.lock().paused = true;
        Ok(())
    }

    async fn resume(&self) -> Result<(), CadenzaError> {
        self.hooks.record("resume");
        self.lock().paused = false;
        Ok(())
    }

    async fn stop(&self) -> Result<(), CadenzaError> {
        self.hooks.record("stop");
        if let Some(event) = &self.stop_event {
            self.emit(event.clone());
        }
        if let Some(delay) = self.stop_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(CadenzaError::provider("device busy"));
        }
        let mut state = self.lock();
        state.now_playing = None;
        state.url = None;
        state.paused = false;
        Ok(())
    }

    async fn seek(&self, position: Duration) -> Result<(), CadenzaError> {
        self.hooks.record(format!("seek:{}", position.as_millis()));
        self.lock().position = Some(position);
        Ok(())
    }

    async fn set_volume(&self, volume: f32) -> Result<(), CadenzaError> {
        self.hooks.record(format!("volume:{volume}"));
        self.lock().volume = Some(volume);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }
}
