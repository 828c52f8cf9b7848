// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local music library plugin.
//!
//! Scans a music folder on initialize and serves the files found as both a
//! metadata provider (search, lookup) and an audio source (`file://`
//! streams). Track ids have the form `local:{relative/path}`.

pub mod factory;
pub mod library;
pub mod scan;

pub use factory::{LocalLibraryFactory, manifest_entry};
pub use library::LocalLibrary;
pub use scan::{AUDIO_EXTENSIONS, LOCAL_ID_PREFIX, LibraryFile};
