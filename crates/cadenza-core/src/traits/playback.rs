// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Playback engine trait.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::CadenzaError;
use crate::traits::plugin::Plugin;
use crate::types::{PlaybackEvent, Track};

/// An engine that plays a resolved URL.
///
/// Engines report progress through [`PlaybackEvent`]s on a broadcast channel.
/// Events may originate from the engine's own threads.
#[async_trait]
pub trait PlaybackProvider: Plugin {
    /// Whether this engine can play `url` (scheme, container, codec).
    fn can_handle(&self, _url: &str) -> bool {
        false
    }

    /// Start playing `url` for `track`, sending `headers` with any fetch.
    async fn play(
        &self,
        track: &Track,
        url: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<(), CadenzaError>;

    async fn pause(&self) -> Result<(), CadenzaError>;

    async fn resume(&self) -> Result<(), CadenzaError>;

    async fn stop(&self) -> Result<(), CadenzaError>;

    async fn seek(&self, position: Duration) -> Result<(), CadenzaError>;

    /// Set output volume in `0.0..=1.0`.
    async fn set_volume(&self, volume: f32) -> Result<(), CadenzaError>;

    /// Subscribe to this engine's events.
    fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent>;
}
