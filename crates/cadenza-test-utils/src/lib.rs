// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Cadenza crates.
//!
//! Provides mock plugins and providers with scripted failures and a shared
//! call log, so tests can assert on hook order across several plugins.
//!
//! # Components
//!
//! - [`CallLog`] - Shared, ordered record of hook and provider calls
//! - [`MockPlugin`] - Plain plugin with failing-hook injection
//! - [`MockAudioSource`] - Audio source with claim prefixes and failure injection
//! - [`MockPlaybackEngine`] - Playback engine with an event channel the test drives
//! - [`MockMetadata`] - In-memory metadata provider
//! - [`MockActionProvider`] - Track action contributor
//! - [`music_dir`] - Temporary directory populated with empty audio files

pub mod call_log;
pub mod fixtures;
pub mod mock_engine;
pub mod mock_plugin;
pub mod mock_providers;

pub use call_log::CallLog;
pub use fixtures::music_dir;
pub use mock_engine::MockPlaybackEngine;
pub use mock_plugin::{MockHooks, MockPlugin};
pub use mock_providers::{MockActionProvider, MockAudioSource, MockMetadata};
