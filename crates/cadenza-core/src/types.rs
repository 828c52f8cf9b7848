// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by plugins, the registry, and core services.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Free-form per-plugin configuration.
pub type PluginConfig = serde_json::Map<String, serde_json::Value>;

/// The closed set of plugin roles. Each category has at most one active plugin.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PluginCategory {
    MetadataProvider,
    PlaybackProvider,
    AudioSource,
    SyncProvider,
    ActionProvider,
}

impl PluginCategory {
    /// All variants, for iteration.
    pub const ALL: [PluginCategory; 5] = [
        Self::MetadataProvider,
        Self::PlaybackProvider,
        Self::AudioSource,
        Self::SyncProvider,
        Self::ActionProvider,
    ];
}

/// Lifecycle status of a registered plugin.
///
/// `uninitialized -> initializing -> ready -> active`, with `error` and
/// `disabled` reachable from failed or refused transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PluginStatus {
    Uninitialized,
    Initializing,
    Ready,
    Active,
    Error,
    Disabled,
}

/// A playable item as seen by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Plugin that produced this track, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_plugin: Option<String>,
    /// Provider-specific locator (file path, remote id, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: None,
            album: None,
            duration_ms: None,
            source_plugin: None,
            uri: None,
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_source_plugin(mut self, plugin_id: impl Into<String>) -> Self {
        self.source_plugin = Some(plugin_id.into());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration_ms.map(Duration::from_millis)
    }
}

/// Quality tier of a resolved stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StreamQuality {
    Low,
    Medium,
    High,
    Lossless,
    /// The file as stored on disk, no transcoding.
    Original,
}

/// A resolved playable source. Immutable: replaced, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioStream {
    pub url: String,
    pub format: String,
    pub quality: StreamQuality,
    /// Kilobits per second.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Headers the engine must send when fetching `url`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl AudioStream {
    pub fn new(url: impl Into<String>, format: impl Into<String>, quality: StreamQuality) -> Self {
        Self {
            url: url.into(),
            format: format.into(),
            quality,
            bitrate: None,
            sample_rate: None,
            channels: None,
            content_length: None,
            expires_at: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn with_bitrate(mut self, kbps: u32) -> Self {
        self.bitrate = Some(kbps);
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Whether a signed URL has passed its expiry at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn is_local(&self) -> bool {
        self.url.starts_with("file://")
    }
}

/// Player status, shared by engines and the external player state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Loading,
    Buffering,
    Playing,
    Paused,
    Stopped,
    Error,
}

/// Events published by a playback engine.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    StatusChanged(PlaybackStatus),
    PositionChanged(Duration),
    DurationChanged(Duration),
    /// The current track finished. May be fired from the engine's own thread.
    Ended,
    Error(String),
    /// Remote-control (media keys, lock screen) next.
    RemoteNext,
    /// Remote-control previous.
    RemotePrevious,
}

/// Where a track action is being offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ActionContext {
    #[default]
    Track,
    Queue,
    NowPlaying,
}

/// An action a plugin contributes to a track's menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackAction {
    pub id: String,
    pub plugin_id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Lower values sort first.
    #[serde(default)]
    pub order: i32,
}

impl TrackAction {
    pub fn new(
        id: impl Into<String>,
        plugin_id: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            plugin_id: plugin_id.into(),
            label: label.into(),
            icon: None,
            order: 0,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

/// Outcome of a sync backend run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub pushed: usize,
    pub pulled: usize,
    pub finished_at: DateTime<Utc>,
}
