// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin and provider trait definitions.
//!
//! Every plugin implements [`Plugin`]. A plugin that fills a provider role
//! also implements the matching provider trait and overrides the projection
//! method on [`Plugin`] that exposes it.

pub mod action;
pub mod audio_source;
pub mod metadata;
pub mod playback;
pub mod plugin;
pub mod sync;

pub use action::ActionProvider;
pub use audio_source::AudioSourceProvider;
pub use metadata::MetadataProvider;
pub use playback::PlaybackProvider;
pub use plugin::Plugin;
pub use sync::SyncProvider;
