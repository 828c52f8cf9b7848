// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller side of the action protocol.

use std::collections::HashSet;
use std::time::Duration;

use cadenza_bus::{EventBus, RequestChannel};
use cadenza_core::{ActionContext, CadenzaError, Track, TrackAction, UserNotice};
use tracing::{debug, info};

use crate::protocol::{
    ActionExecuted, ExecuteActionRequest, ExecuteActionResponse, RequestActions,
    ACTION_EXECUTED,
};

/// Result of [`ActionResolver::execute_action`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub handled: bool,
    /// The plugin whose handler won.
    pub plugin_id: Option<String>,
    /// Message for the user when nothing handled the action.
    pub notice: Option<UserNotice>,
}

/// Lists and executes track actions contributed by plugins.
#[derive(Debug, Clone)]
pub struct ActionResolver {
    channel: RequestChannel,
}

impl ActionResolver {
    /// A resolver using the default 100 ms response window.
    pub fn new(bus: EventBus) -> Self {
        Self {
            channel: RequestChannel::new(bus),
        }
    }

    pub fn with_window(bus: EventBus, window: Duration) -> Self {
        Self {
            channel: RequestChannel::with_window(bus, window),
        }
    }

    /// Collect every action offered for `track` within the window.
    ///
    /// Duplicates (same plugin and action id) are dropped; the rest are
    /// sorted by `order`, then label.
    pub async fn get_actions(
        &self,
        track: &Track,
        context: ActionContext,
    ) -> Result<Vec<TrackAction>, CadenzaError> {
        let request = RequestActions {
            track: track.clone(),
            context,
        };
        let responses = self.channel.collect(request).await?;

        let mut seen = HashSet::new();
        let mut actions: Vec<TrackAction> = responses
            .into_iter()
            .flat_map(|list| list.actions)
            .filter(|a| seen.insert((a.plugin_id.clone(), a.id.clone())))
            .collect();
        actions.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.label.cmp(&b.label)));

        debug!(track_id = %track.id, %context, actions = actions.len(), "actions collected");
        Ok(actions)
    }

    /// Ask the owning plugin to run `action` on `track`.
    ///
    /// The first response with `handled = true` wins and later ones are
    /// ignored. `action-executed` is broadcast once per handled call.
    pub async fn execute_action(
        &self,
        action: &TrackAction,
        track: &Track,
    ) -> Result<ActionOutcome, CadenzaError> {
        let request = ExecuteActionRequest {
            action_id: action.id.clone(),
            plugin_id: action.plugin_id.clone(),
            track: track.clone(),
        };
        let winner = self
            .channel
            .first(request, |r: &ExecuteActionResponse| r.handled)
            .await?;

        let Some(winner) = winner else {
            debug!(action_id = %action.id, plugin_id = %action.plugin_id, "action not handled");
            return Ok(ActionOutcome {
                handled: false,
                plugin_id: None,
                notice: Some(
                    UserNotice::new(format!("Couldn't run \"{}\"", action.label))
                        .with_description("The plugin providing it did not respond."),
                ),
            });
        };

        info!(action_id = %action.id, plugin_id = %winner.plugin_id, track_id = %track.id, "action executed");
        self.channel.bus().emit_json(
            ACTION_EXECUTED,
            &ActionExecuted {
                action_id: action.id.clone(),
                plugin_id: winner.plugin_id.clone(),
                track_id: track.id.clone(),
            },
        )?;
        Ok(ActionOutcome {
            handled: true,
            plugin_id: Some(winner.plugin_id),
            notice: None,
        })
    }
}
