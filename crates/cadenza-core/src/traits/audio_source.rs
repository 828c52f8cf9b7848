// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audio source trait: turns a track into a playable stream.

use async_trait::async_trait;

use crate::error::CadenzaError;
use crate::traits::plugin::Plugin;
use crate::types::{AudioStream, Track};

/// Resolves tracks to [`AudioStream`]s.
///
/// Several audio sources may be registered at once; playback tries the ones
/// that claim a track first and falls back to the rest.
#[async_trait]
pub trait AudioSourceProvider: Plugin {
    /// Whether this source believes it can resolve `track`. A hint only.
    fn supports_track(&self, track: &Track) -> bool;

    /// Produce a stream for `track`.
    async fn resolve_stream(&self, track: &Track) -> Result<AudioStream, CadenzaError>;
}
