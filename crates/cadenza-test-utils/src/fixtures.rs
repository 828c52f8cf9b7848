// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filesystem fixtures.

use std::fs;
use std::io;

use tempfile::TempDir;

/// Create a temporary directory containing empty files at `relative_paths`.
///
/// Parent directories are created as needed. The directory is removed when
/// the returned guard is dropped.
pub fn music_dir(relative_paths: &[&str]) -> io::Result<TempDir> {
    let dir = tempfile::tempdir()?;
    for rel in relative_paths {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, b"")?;
    }
    Ok(dir)
}
