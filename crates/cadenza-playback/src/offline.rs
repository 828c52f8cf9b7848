// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lookup of downloaded (offline) copies of tracks.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use cadenza_core::CadenzaError;
use tracing::debug;

/// Maps a track id to a local file, if one was downloaded.
pub trait OfflineLookup: Send + Sync {
    fn local_path(&self, track_id: &str) -> Option<PathBuf>;
}

/// Download index backed by a JSON object of `track id -> file path`.
///
/// Entries whose file no longer exists are treated as absent.
#[derive(Debug, Default)]
pub struct DownloadIndex {
    entries: RwLock<HashMap<String, PathBuf>>,
}

impl DownloadIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read an index file. A missing file yields an empty index.
    pub fn load(path: &Path) -> Result<Self, CadenzaError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no download index, starting empty");
                return Ok(Self::new());
            }
            Err(e) => {
                return Err(CadenzaError::Config(format!(
                    "cannot read download index {}: {e}",
                    path.display()
                )));
            }
        };
        let entries: HashMap<String, PathBuf> = serde_json::from_str(&content).map_err(|e| {
            CadenzaError::Config(format!("invalid download index {}: {e}", path.display()))
        })?;
        Ok(Self {
            entries: RwLock::new(entries),
        })
    }

    pub fn insert(&self, track_id: impl Into<String>, path: impl Into<PathBuf>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(track_id.into(), path.into());
    }

    pub fn remove(&self, track_id: &str) -> Option<PathBuf> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(track_id)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OfflineLookup for DownloadIndex {
    fn local_path(&self, track_id: &str) -> Option<PathBuf> {
        let path = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(track_id)
            .cloned()?;
        path.is_file().then_some(path)
    }
}
