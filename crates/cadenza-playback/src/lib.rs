// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Playback orchestration for Cadenza.
//!
//! [`PlaybackService`] resolves a track to a stream (offline copy first,
//! then audio-source plugins with fallback), picks a playback engine for
//! the stream URL, and keeps exactly one engine playing. Engine events are
//! mirrored into a [`PlayerStateStore`].

pub mod offline;
pub mod service;
pub mod state;

pub use offline::{DownloadIndex, OfflineLookup};
pub use service::{PlaybackService, PlaybackSettings};
pub use state::{InMemoryPlayerState, PlayerSnapshot, PlayerStateStore};
