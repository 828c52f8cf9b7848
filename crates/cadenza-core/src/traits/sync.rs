// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sync backend trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CadenzaError;
use crate::traits::plugin::Plugin;
use crate::types::SyncReport;

/// Pushes and pulls library state to an external service.
#[async_trait]
pub trait SyncProvider: Plugin {
    async fn sync(&self) -> Result<SyncReport, CadenzaError>;

    fn last_synced_at(&self) -> Option<DateTime<Utc>>;
}
