// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The playback service.
//!
//! A single service owns "what is playing". Every `play` runs under a FIFO
//! async lock: the previous engine is stopped before a new stream is
//! resolved, so two overlapping calls leave exactly one engine playing the
//! track of whichever call took the lock last.
//!
//! Each started play gets a generation number. Engine events are tagged with
//! the generation they were subscribed for, and only events of the current
//! generation are mirrored.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use cadenza_core::{
    AudioStream, CadenzaError, PlaybackEvent, PlaybackProvider, PlaybackStatus, StreamQuality,
    Track,
};
use cadenza_plugin::{AudioSourceCategory, PlaybackCategory, PluginRegistry, ProviderAccessor};
use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::offline::OfflineLookup;
use crate::state::PlayerStateStore;

/// Tunables for [`PlaybackService`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSettings {
    /// "Previous" restarts the current track while the position is below this.
    pub restart_threshold: Duration,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            restart_threshold: Duration::from_secs(3),
        }
    }
}

#[derive(Clone)]
struct CurrentEngine {
    id: String,
    generation: u64,
    engine: Arc<dyn PlaybackProvider>,
}

/// The event task subscribed to one engine.
struct Watcher {
    token: u64,
    task: JoinHandle<()>,
}

/// Resolves tracks to streams, selects an engine, and mirrors engine events
/// into the player state.
pub struct PlaybackService {
    this: Weak<PlaybackService>,
    sources: ProviderAccessor<AudioSourceCategory>,
    engines: ProviderAccessor<PlaybackCategory>,
    state: Arc<dyn PlayerStateStore>,
    offline: Arc<dyn OfflineLookup>,
    settings: PlaybackSettings,
    play_lock: tokio::sync::Mutex<()>,
    current: Mutex<Option<CurrentEngine>>,
    watchers: Mutex<HashMap<String, Watcher>>,
    next_token: AtomicU64,
}

impl PlaybackService {
    pub fn new(
        registry: Arc<PluginRegistry>,
        state: Arc<dyn PlayerStateStore>,
        offline: Arc<dyn OfflineLookup>,
        settings: PlaybackSettings,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            sources: ProviderAccessor::new(Arc::clone(&registry)),
            engines: ProviderAccessor::new(registry),
            state,
            offline,
            settings,
            play_lock: tokio::sync::Mutex::new(()),
            current: Mutex::new(None),
            watchers: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
        })
    }

    pub fn state(&self) -> &Arc<dyn PlayerStateStore> {
        &self.state
    }

    pub fn settings(&self) -> &PlaybackSettings {
        &self.settings
    }

    /// Id of the engine currently selected, if any.
    pub fn current_engine(&self) -> Option<String> {
        self.current_lock().as_ref().map(|c| c.id.clone())
    }

    /// Subscribe to the events of every registered engine not yet watched.
    ///
    /// Engines are also watched on every play, so calling this is only
    /// needed to see remote-control events while nothing is playing.
    pub async fn watch_engines(&self) {
        let engines = self.engines.get_all().await;
        let mut watchers = self.watchers_lock();
        for engine in engines {
            let id = engine.id().to_string();
            if watchers.get(&id).is_some_and(|w| !w.task.is_finished()) {
                continue;
            }
            let watcher = self.spawn_watcher(&engine, None);
            watchers.insert(id, watcher);
        }
    }

    /// Play `track`, replacing whatever is playing.
    pub async fn play(&self, track: &Track) -> Result<(), CadenzaError> {
        let _guard = self.play_lock.lock().await;
        self.play_locked(track).await
    }

    async fn play_locked(&self, track: &Track) -> Result<(), CadenzaError> {
        info!(track_id = %track.id, "play requested");
        self.stop_current().await;
        self.state.set_current_track(track);
        self.state.set_error(None);
        self.state.set_status(PlaybackStatus::Loading);

        match self.start(track).await {
            Ok(engine_id) => {
                self.state.set_status(PlaybackStatus::Playing);
                info!(track_id = %track.id, engine = %engine_id, "playback started");
                Ok(())
            }
            Err(e) => {
                warn!(track_id = %track.id, error = %e, "playback failed");
                self.state.set_error(Some(e.user_notice().message));
                self.state.set_status(PlaybackStatus::Error);
                Err(e)
            }
        }
    }

    async fn start(&self, track: &Track) -> Result<String, CadenzaError> {
        let stream = self.resolve_stream(track).await?;
        let candidates = self.select_engines(&stream.url).await?;

        let mut last_error = CadenzaError::NoPlaybackProvider;
        for engine in candidates {
            let engine_id = engine.id().to_string();
            let generation = self.watch(&engine);
            if let Err(e) = engine.set_volume(self.state.snapshot().volume).await {
                debug!(engine = %engine_id, error = %e, "engine rejected volume");
            }
            match engine.play(track, &stream.url, &stream.headers).await {
                Ok(()) => {
                    *self.current_lock() = Some(CurrentEngine {
                        id: engine_id.clone(),
                        generation,
                        engine,
                    });
                    return Ok(engine_id);
                }
                Err(e) => {
                    warn!(engine = %engine_id, error = %e, "engine failed to start, trying next");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    /// Engines that declare support for `url` in priority order, or the
    /// lowest-priority engine when none do.
    async fn select_engines(
        &self,
        url: &str,
    ) -> Result<Vec<Arc<dyn PlaybackProvider>>, CadenzaError> {
        let mut engines = self.engines.get_all().await;
        let capable: Vec<_> = engines
            .iter()
            .filter(|e| e.can_handle(url))
            .cloned()
            .collect();
        if !capable.is_empty() {
            return Ok(capable);
        }
        let fallback = engines.pop().ok_or(CadenzaError::NoPlaybackProvider)?;
        debug!(engine = %fallback.id(), url = %url, "no engine claims url, using fallback");
        Ok(vec![fallback])
    }

    /// Find a stream for `track`.
    ///
    /// Order: downloaded copy, then sources that claim the track, then every
    /// other source. Each in priority order; the first success wins.
    pub async fn resolve_stream(&self, track: &Track) -> Result<AudioStream, CadenzaError> {
        if let Some(path) = self.offline.local_path(&track.id) {
            debug!(track_id = %track.id, path = %path.display(), "using offline copy");
            return Ok(offline_stream(&path));
        }

        let (preferred, others): (Vec<_>, Vec<_>) = self
            .sources
            .get_all()
            .await
            .into_iter()
            .partition(|s| s.supports_track(track));

        let now = Utc::now();
        for source in preferred.into_iter().chain(others) {
            match source.resolve_stream(track).await {
                Ok(stream) if stream.is_expired(now) => {
                    warn!(source = %source.id(), track_id = %track.id, "source returned an expired stream");
                }
                Ok(stream) => {
                    debug!(source = %source.id(), track_id = %track.id, "stream resolved");
                    return Ok(stream);
                }
                Err(e) => {
                    debug!(source = %source.id(), track_id = %track.id, error = %e, "source failed");
                }
            }
        }

        Err(CadenzaError::NoAudioSource {
            track_id: track.id.clone(),
        })
    }

    pub async fn pause(&self) -> Result<(), CadenzaError> {
        self.current_or_err()?.engine.pause().await?;
        self.state.set_status(PlaybackStatus::Paused);
        Ok(())
    }

    pub async fn resume(&self) -> Result<(), CadenzaError> {
        self.current_or_err()?.engine.resume().await?;
        self.state.set_status(PlaybackStatus::Playing);
        Ok(())
    }

    /// Deselect the current engine and stop it.
    ///
    /// The engine is deselected first, so nothing it emits while stopping is
    /// mirrored. A failing engine stop is still reported, but playback counts
    /// as stopped either way.
    pub async fn stop(&self) -> Result<(), CadenzaError> {
        let _guard = self.play_lock.lock().await;
        let current = self
            .current_lock()
            .take()
            .ok_or(CadenzaError::NoActiveProvider)?;
        let stopped = current.engine.stop().await;
        self.state.set_status(PlaybackStatus::Stopped);
        self.state.set_position(Duration::ZERO);
        stopped
    }

    pub async fn seek_to(&self, position: Duration) -> Result<(), CadenzaError> {
        self.current_or_err()?.engine.seek(position).await?;
        self.state.set_position(position);
        Ok(())
    }

    /// Set volume, clamped to `0.0..=1.0`.
    pub async fn set_volume(&self, volume: f32) -> Result<(), CadenzaError> {
        let volume = volume.clamp(0.0, 1.0);
        self.current_or_err()?.engine.set_volume(volume).await?;
        self.state.set_volume(volume);
        Ok(())
    }

    /// Advance the queue and play the new track.
    ///
    /// At the end of the queue nothing changes and `None` is returned.
    pub async fn skip_to_next(&self) -> Result<Option<Track>, CadenzaError> {
        let _guard = self.play_lock.lock().await;
        let Some(track) = self.state.skip_to_next() else {
            debug!("already at end of queue");
            return Ok(None);
        };
        self.play_locked(&track).await?;
        Ok(Some(track))
    }

    /// Go back in the queue, or restart the current track.
    ///
    /// With at most one queued track, or while the position is still below
    /// the restart threshold, the current track restarts from zero.
    pub async fn skip_to_previous(&self) -> Result<Option<Track>, CadenzaError> {
        let _guard = self.play_lock.lock().await;
        let snapshot = self.state.snapshot();
        let near_start = snapshot.position < self.settings.restart_threshold;
        if snapshot.queue.len() <= 1 || near_start {
            let Some(track) = snapshot.current_track else {
                return Ok(None);
            };
            self.restart(&track).await?;
            return Ok(Some(track));
        }

        match self.state.skip_to_previous() {
            Some(track) => {
                self.play_locked(&track).await?;
                Ok(Some(track))
            }
            None => {
                let Some(track) = snapshot.current_track else {
                    return Ok(None);
                };
                self.restart(&track).await?;
                Ok(Some(track))
            }
        }
    }

    /// Replace the queue and play the track at `start`, if there is one.
    pub async fn set_queue(&self, tracks: Vec<Track>, start: usize) -> Result<(), CadenzaError> {
        let _guard = self.play_lock.lock().await;
        self.state.set_queue(tracks, start);
        match self.state.snapshot().current_track {
            Some(track) => self.play_locked(&track).await,
            None => Ok(()),
        }
    }

    /// Seek to zero, or play `track` again if no engine is selected.
    /// Callers hold `play_lock`.
    async fn restart(&self, track: &Track) -> Result<(), CadenzaError> {
        if self.current_lock().is_some() {
            self.seek_to(Duration::ZERO).await
        } else {
            self.play_locked(track).await
        }
    }

    async fn stop_current(&self) {
        let previous = self.current_lock().take();
        if let Some(previous) = previous {
            if let Err(e) = previous.engine.stop().await {
                warn!(engine = %previous.id, error = %e, "failed to stop previous engine");
            }
        }
    }

    fn current_or_err(&self) -> Result<CurrentEngine, CadenzaError> {
        self.current_lock()
            .clone()
            .ok_or(CadenzaError::NoActiveProvider)
    }

    fn current_lock(&self) -> std::sync::MutexGuard<'_, Option<CurrentEngine>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn watchers_lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Watcher>> {
        self.watchers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to `engine` for a new play and return its generation.
    ///
    /// The new task replaces the engine's previous one, which exits on its
    /// next event. Events still queued for an earlier play never reach it.
    fn watch(&self, engine: &Arc<dyn PlaybackProvider>) -> u64 {
        let generation = self.next_token.fetch_add(1, Ordering::Relaxed);
        let watcher = self.spawn_watcher(engine, Some(generation));
        self.watchers_lock().insert(engine.id().to_string(), watcher);
        generation
    }

    /// Untagged watchers only pass remote controls through.
    fn spawn_watcher(&self, engine: &Arc<dyn PlaybackProvider>, generation: Option<u64>) -> Watcher {
        let token = generation.unwrap_or_else(|| self.next_token.fetch_add(1, Ordering::Relaxed));
        let tag = EventTag {
            engine_id: engine.id().to_string(),
            token,
            generation,
        };
        let task = tokio::spawn(forward_events(self.this.clone(), tag, engine.subscribe()));
        Watcher { token, task }
    }

    fn is_watching(&self, tag: &EventTag) -> bool {
        self.watchers_lock()
            .get(&tag.engine_id)
            .is_some_and(|w| w.token == tag.token)
    }

    async fn on_engine_event(&self, tag: &EventTag, event: PlaybackEvent) {
        let engine_id = tag.engine_id.as_str();
        let (is_current, idle) = {
            let current = self.current_lock();
            let is_current = current
                .as_ref()
                .is_some_and(|c| c.id == engine_id && Some(c.generation) == tag.generation);
            (is_current, current.is_none())
        };
        let remote = matches!(event, PlaybackEvent::RemoteNext | PlaybackEvent::RemotePrevious);
        if !is_current && !(remote && idle) {
            debug!(engine = %engine_id, ?event, "ignoring event from inactive play");
            return;
        }
        match event {
            PlaybackEvent::StatusChanged(status) => self.state.set_status(status),
            PlaybackEvent::PositionChanged(position) => self.state.set_position(position),
            PlaybackEvent::DurationChanged(duration) => self.state.set_duration(Some(duration)),
            PlaybackEvent::Error(message) => {
                warn!(engine = %engine_id, error = %message, "engine reported an error");
                self.state.set_error(Some(message));
                self.state.set_status(PlaybackStatus::Error);
            }
            PlaybackEvent::Ended => {
                // Let the engine finish its own bookkeeping for the ended track.
                tokio::task::yield_now().await;
                if let Some(generation) = tag.generation {
                    self.on_track_ended(generation).await;
                }
            }
            PlaybackEvent::RemoteNext => {
                if let Err(e) = self.skip_to_next().await {
                    warn!(error = %e, "remote next failed");
                }
            }
            PlaybackEvent::RemotePrevious => {
                if let Err(e) = self.skip_to_previous().await {
                    warn!(error = %e, "remote previous failed");
                }
            }
        }
    }

    /// Advance past the play of `generation`, unless a stop or another play
    /// replaced it while the event was in flight.
    async fn on_track_ended(&self, generation: u64) {
        let _guard = self.play_lock.lock().await;
        let still_current = self
            .current_lock()
            .as_ref()
            .is_some_and(|c| c.generation == generation);
        if !still_current {
            debug!(generation, "ignoring end of a replaced play");
            return;
        }
        match self.state.skip_to_next() {
            Some(track) => match self.play_locked(&track).await {
                Ok(()) => debug!(track_id = %track.id, "advanced to next track"),
                Err(e) => warn!(error = %e, "failed to advance after track ended"),
            },
            None => {
                self.current_lock().take();
                self.state.set_status(PlaybackStatus::Stopped);
                info!("queue finished");
            }
        }
    }
}

impl Drop for PlaybackService {
    fn drop(&mut self) {
        let watchers = self.watchers.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, watcher) in watchers.drain() {
            watcher.task.abort();
        }
    }
}

impl std::fmt::Debug for PlaybackService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackService")
            .field("current_engine", &self.current_engine())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Where a forwarded event came from.
struct EventTag {
    engine_id: String,
    token: u64,
    /// The play this subscription was made for, if any.
    generation: Option<u64>,
}

/// Event loop of one subscription. Ends when the engine's channel closes,
/// the service is dropped, or a newer subscription replaced this one.
async fn forward_events(
    service: Weak<PlaybackService>,
    tag: EventTag,
    mut events: broadcast::Receiver<PlaybackEvent>,
) {
    loop {
        let received = events.recv().await;
        let Some(service) = service.upgrade() else {
            return;
        };
        if !service.is_watching(&tag) {
            return;
        }
        match received {
            Ok(event) => service.on_engine_event(&tag, event).await,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(engine = %tag.engine_id, skipped, "playback events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!(engine = %tag.engine_id, "engine event stream closed");
                return;
            }
        }
    }
}

fn offline_stream(path: &Path) -> AudioStream {
    let format = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "unknown".to_string());
    AudioStream::new(
        format!("file://{}", path.display()),
        format,
        StreamQuality::Original,
    )
}
