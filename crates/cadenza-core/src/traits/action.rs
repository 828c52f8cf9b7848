// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Track action contributor trait.

use async_trait::async_trait;

use crate::error::CadenzaError;
use crate::traits::plugin::Plugin;
use crate::types::{ActionContext, Track, TrackAction};

/// Contributes entries to track menus and executes them.
#[async_trait]
pub trait ActionProvider: Plugin {
    /// Actions this plugin offers for `track` in `context`.
    async fn actions_for(
        &self,
        track: &Track,
        context: ActionContext,
    ) -> Result<Vec<TrackAction>, CadenzaError>;

    /// Run one of this plugin's actions. Returns whether it was handled.
    async fn execute_action(&self, action_id: &str, track: &Track) -> Result<bool, CadenzaError>;
}
