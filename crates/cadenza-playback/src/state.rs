// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Player state contract consumed by the playback service.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use cadenza_core::{PlaybackStatus, Track};

/// Point-in-time view of the player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub queue: Vec<Track>,
    /// Index of the current track in `queue`, when it came from the queue.
    pub index: Option<usize>,
    pub current_track: Option<Track>,
    pub status: PlaybackStatus,
    pub position: Duration,
    pub duration: Option<Duration>,
    /// `0.0..=1.0`.
    pub volume: f32,
    pub error: Option<String>,
}

impl Default for PlayerSnapshot {
    fn default() -> Self {
        Self {
            queue: Vec::new(),
            index: None,
            current_track: None,
            status: PlaybackStatus::Idle,
            position: Duration::ZERO,
            duration: None,
            volume: 1.0,
            error: None,
        }
    }
}

/// External player state. Implementations are expected to persist or
/// publish changes; the playback service only reads and writes through
/// this interface.
pub trait PlayerStateStore: Send + Sync {
    fn snapshot(&self) -> PlayerSnapshot;

    /// Replace the queue and select `start` (no selection if out of range).
    fn set_queue(&self, tracks: Vec<Track>, start: usize);

    /// Mark `track` as the current track, selecting it in the queue if present.
    fn set_current_track(&self, track: &Track);

    /// Advance the queue. Returns the new current track, `None` at the end.
    fn skip_to_next(&self) -> Option<Track>;

    /// Step back in the queue. Returns the new current track, `None` at the start.
    fn skip_to_previous(&self) -> Option<Track>;

    fn set_status(&self, status: PlaybackStatus);

    fn set_position(&self, position: Duration);

    fn set_duration(&self, duration: Option<Duration>);

    fn set_volume(&self, volume: f32);

    fn set_error(&self, error: Option<String>);
}

/// A [`PlayerStateStore`] held in memory.
#[derive(Debug, Default)]
pub struct InMemoryPlayerState {
    inner: Mutex<PlayerSnapshot>,
}

impl InMemoryPlayerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_volume(volume: f32) -> Self {
        let state = Self::default();
        state.set_volume(volume);
        state
    }

    fn update<R>(&self, f: impl FnOnce(&mut PlayerSnapshot) -> R) -> R {
        f(&mut self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn select(snapshot: &mut PlayerSnapshot, index: usize) -> Option<Track> {
        let track = snapshot.queue.get(index)?.clone();
        snapshot.index = Some(index);
        snapshot.current_track = Some(track.clone());
        snapshot.position = Duration::ZERO;
        snapshot.duration = track.duration();
        Some(track)
    }
}

impl PlayerStateStore for InMemoryPlayerState {
    fn snapshot(&self) -> PlayerSnapshot {
        self.update(|s| s.clone())
    }

    fn set_queue(&self, tracks: Vec<Track>, start: usize) {
        self.update(|s| {
            s.queue = tracks;
            s.index = None;
            s.current_track = None;
            Self::select(s, start);
        });
    }

    fn set_current_track(&self, track: &Track) {
        self.update(|s| {
            s.index = s.queue.iter().position(|t| t.id == track.id);
            s.current_track = Some(track.clone());
            s.position = Duration::ZERO;
            s.duration = track.duration();
        });
    }

    fn skip_to_next(&self) -> Option<Track> {
        self.update(|s| {
            let next = s.index.map_or(0, |i| i + 1);
            Self::select(s, next)
        })
    }

    fn skip_to_previous(&self) -> Option<Track> {
        self.update(|s| {
            let previous = s.index?.checked_sub(1)?;
            Self::select(s, previous)
        })
    }

    fn set_status(&self, status: PlaybackStatus) {
        self.update(|s| s.status = status);
    }

    fn set_position(&self, position: Duration) {
        self.update(|s| s.position = position);
    }

    fn set_duration(&self, duration: Option<Duration>) {
        self.update(|s| s.duration = duration);
    }

    fn set_volume(&self, volume: f32) {
        self.update(|s| s.volume = volume.clamp(0.0, 1.0));
    }

    fn set_error(&self, error: Option<String>) {
        self.update(|s| s.error = error);
    }
}
