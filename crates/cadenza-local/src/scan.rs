// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Directory scanning and path-derived track metadata.

use std::path::{Component, Path, PathBuf};

use cadenza_core::Track;
use tracing::debug;
use walkdir::WalkDir;

use cadenza_plugin::LOCAL_LIBRARY_ID;

/// File extensions treated as audio, lowercase.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "opus", "m4a", "wav"];

/// Prefix of every track id this library produces.
pub const LOCAL_ID_PREFIX: &str = "local:";

/// One audio file found under the music folder.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryFile {
    pub path: PathBuf,
    pub track: Track,
}

/// Lowercase audio extension of `path`, if it is an audio file.
pub fn audio_extension(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    AUDIO_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Walk `root` and collect audio files, sorted by track id.
///
/// Hidden entries are skipped. Unreadable entries are logged and skipped.
pub fn scan(root: &Path, recursive: bool) -> Vec<LibraryFile> {
    let walker = WalkDir::new(root)
        .follow_links(true)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() || audio_extension(entry.path()).is_none() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        files.push(LibraryFile {
            track: track_for(relative, entry.path()),
            path: entry.path().to_path_buf(),
        });
    }
    files.sort_by(|a, b| a.track.id.cmp(&b.track.id));
    files
}

/// Build a track from a file's path relative to the library root.
///
/// `Artist/Album/Title.ext` gives all three fields. Without an artist
/// folder, a `Artist - Title` file stem is split instead.
pub fn track_for(relative: &Path, absolute: &Path) -> Track {
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    let stem = relative
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let folders = &parts[..parts.len().saturating_sub(1)];

    let (mut artist, album) = match folders {
        [.., artist, album] => (Some(artist.clone()), Some(album.clone())),
        [artist] => (Some(artist.clone()), None),
        [] => (None, None),
    };
    let title = match stem.split_once(" - ") {
        Some((stem_artist, title)) if artist.is_none() => {
            artist = Some(stem_artist.trim().to_string());
            title.trim().to_string()
        }
        _ => stem.clone(),
    };

    let mut track = Track::new(format!("{LOCAL_ID_PREFIX}{}", parts.join("/")), title)
        .with_source_plugin(LOCAL_LIBRARY_ID)
        .with_uri(absolute.display().to_string());
    track.artist = artist;
    track.album = album;
    track
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(relative: &str) -> Track {
        track_for(Path::new(relative), &Path::new("/music").join(relative))
    }

    #[test]
    fn artist_and_album_come_from_folders() {
        let t = track("Radiohead/OK Computer/Airbag.flac");
        assert_eq!(t.id, "local:Radiohead/OK Computer/Airbag.flac");
        assert_eq!(t.title, "Airbag");
        assert_eq!(t.artist.as_deref(), Some("Radiohead"));
        assert_eq!(t.album.as_deref(), Some("OK Computer"));
        assert_eq!(t.uri.as_deref(), Some("/music/Radiohead/OK Computer/Airbag.flac"));
        assert_eq!(t.source_plugin.as_deref(), Some(LOCAL_LIBRARY_ID));
    }

    #[test]
    fn loose_files_split_artist_from_stem() {
        let t = track("Daft Punk - One More Time.mp3");
        assert_eq!(t.artist.as_deref(), Some("Daft Punk"));
        assert_eq!(t.title, "One More Time");
        assert!(t.album.is_none());

        let t = track("intro.wav");
        assert_eq!(t.title, "intro");
        assert!(t.artist.is_none());
    }

    #[test]
    fn artist_folder_keeps_dashes_in_title() {
        let t = track("Artist/Live - 1999.ogg");
        assert_eq!(t.artist.as_deref(), Some("Artist"));
        assert_eq!(t.title, "Live - 1999");
    }

    #[test]
    fn extensions_are_case_insensitive() {
        assert_eq!(audio_extension(Path::new("a.FLAC")).as_deref(), Some("flac"));
        assert_eq!(audio_extension(Path::new("cover.jpg")), None);
        assert_eq!(audio_extension(Path::new("README")), None);
    }
}
