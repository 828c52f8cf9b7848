// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metadata provider trait for catalog lookups.

use async_trait::async_trait;

use crate::error::CadenzaError;
use crate::traits::plugin::Plugin;
use crate::types::Track;

/// Source of track metadata (search, lookup by id).
#[async_trait]
pub trait MetadataProvider: Plugin {
    /// Search for tracks matching `query`, returning at most `limit` results.
    async fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<Track>, CadenzaError>;

    /// Look up a single track. `Ok(None)` when the id is unknown to this provider.
    async fn get_track(&self, id: &str) -> Result<Option<Track>, CadenzaError>;
}
