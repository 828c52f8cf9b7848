// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The local library plugin.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use cadenza_core::{
    AudioSourceProvider, AudioStream, CadenzaError, MetadataProvider, Plugin, PluginContext,
    PluginManifest, StreamQuality, Track,
};
use cadenza_plugin::local_library_manifest;
use tokio::sync::RwLock;
use tracing::{Instrument, debug, info};

use crate::scan::{LOCAL_ID_PREFIX, LibraryFile, audio_extension, scan};

#[derive(Debug, Default)]
struct Index {
    root: Option<PathBuf>,
    recursive: bool,
    files: BTreeMap<String, LibraryFile>,
}

/// Metadata provider and audio source over a music folder.
#[derive(Debug)]
pub struct LocalLibrary {
    manifest: PluginManifest,
    index: RwLock<Index>,
}

impl LocalLibrary {
    pub fn new() -> Self {
        Self {
            manifest: local_library_manifest(),
            index: RwLock::new(Index::default()),
        }
    }

    /// Scan the configured folder again. Returns the number of tracks.
    pub async fn rescan(&self) -> Result<usize, CadenzaError> {
        let (root, recursive) = {
            let index = self.index.read().await;
            let root = index
                .root
                .clone()
                .ok_or_else(|| CadenzaError::provider("local library is not initialized"))?;
            (root, index.recursive)
        };
        let files = scan_blocking(root.clone(), recursive).await?;
        let count = files.len();
        let mut index = self.index.write().await;
        index.files = files
            .into_iter()
            .map(|file| (file.track.id.clone(), file))
            .collect();
        info!(root = %root.display(), tracks = count, "local library scanned");
        Ok(count)
    }

    pub async fn track_count(&self) -> usize {
        self.index.read().await.files.len()
    }

    pub async fn root(&self) -> Option<PathBuf> {
        self.index.read().await.root.clone()
    }
}

impl Default for LocalLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Expand a leading `~/` to the home directory.
pub(crate) fn expand_home(raw: &str) -> PathBuf {
    match raw.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(raw)),
        None => PathBuf::from(raw),
    }
}

async fn scan_blocking(root: PathBuf, recursive: bool) -> Result<Vec<LibraryFile>, CadenzaError> {
    if !root.is_dir() {
        return Err(CadenzaError::provider(format!(
            "music folder {} does not exist",
            root.display()
        )));
    }
    tokio::task::spawn_blocking(move || scan(&root, recursive))
        .await
        .map_err(|e| CadenzaError::Internal(format!("library scan panicked: {e}")))
}

fn matches(track: &Track, query: &str) -> bool {
    let hit = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(query));
    hit(Some(&track.title)) || hit(track.artist.as_deref()) || hit(track.album.as_deref())
}

#[async_trait]
impl Plugin for LocalLibrary {
    fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    async fn initialize(&self, ctx: PluginContext) -> Result<(), CadenzaError> {
        let raw = ctx
            .get_str("music_dir")
            .ok_or_else(|| CadenzaError::provider("`music_dir` is not configured"))?;
        let root = expand_home(raw);
        let recursive = ctx.get_bool("recursive").unwrap_or(true);
        {
            let mut index = self.index.write().await;
            index.root = Some(root);
            index.recursive = recursive;
        }
        self.rescan().instrument(ctx.span.clone()).await?;
        Ok(())
    }

    async fn destroy(&self) -> Result<(), CadenzaError> {
        let mut index = self.index.write().await;
        debug!(tracks = index.files.len(), "dropping local library index");
        *index = Index::default();
        Ok(())
    }

    fn as_metadata_provider(self: Arc<Self>) -> Option<Arc<dyn MetadataProvider>> {
        Some(self)
    }

    fn as_audio_source(self: Arc<Self>) -> Option<Arc<dyn AudioSourceProvider>> {
        Some(self)
    }
}

#[async_trait]
impl MetadataProvider for LocalLibrary {
    /// Case-insensitive substring match over title, artist, and album.
    /// An empty query lists the library in id order.
    async fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<Track>, CadenzaError> {
        let query = query.trim().to_lowercase();
        let index = self.index.read().await;
        Ok(index
            .files
            .values()
            .map(|file| &file.track)
            .filter(|track| query.is_empty() || matches(track, &query))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_track(&self, id: &str) -> Result<Option<Track>, CadenzaError> {
        Ok(self
            .index
            .read()
            .await
            .files
            .get(id)
            .map(|file| file.track.clone()))
    }
}

#[async_trait]
impl AudioSourceProvider for LocalLibrary {
    fn supports_track(&self, track: &Track) -> bool {
        track.id.starts_with(LOCAL_ID_PREFIX)
    }

    async fn resolve_stream(&self, track: &Track) -> Result<AudioStream, CadenzaError> {
        let path = self
            .index
            .read()
            .await
            .files
            .get(&track.id)
            .map(|file| file.path.clone())
            .ok_or_else(|| {
                CadenzaError::provider(format!("`{}` is not in the local library", track.id))
            })?;
        file_stream(&path).await
    }
}

async fn file_stream(path: &Path) -> Result<AudioStream, CadenzaError> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| CadenzaError::Provider {
        message: format!("cannot read {}", path.display()),
        source: Some(Box::new(e)),
    })?;
    let format = audio_extension(path).unwrap_or_else(|| "unknown".to_string());
    let mut stream = AudioStream::new(
        format!("file://{}", path.display()),
        format,
        StreamQuality::Original,
    );
    stream.content_length = Some(metadata.len());
    Ok(stream)
}
