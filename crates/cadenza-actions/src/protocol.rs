// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payloads of the action channels.

use cadenza_bus::Request;
use cadenza_core::{ActionContext, Track, TrackAction};
use serde::{Deserialize, Serialize};

/// Broadcast after an execute request was handled.
pub const ACTION_EXECUTED: &str = "action-executed";

/// Ask every action contributor what it offers for `track`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestActions {
    pub track: Track,
    #[serde(default)]
    pub context: ActionContext,
}

/// One contributor's answer to [`RequestActions`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionList {
    pub plugin_id: String,
    pub actions: Vec<TrackAction>,
}

impl Request for RequestActions {
    type Response = ActionList;
    const REQUEST_EVENT: &'static str = "request-actions";
    const RESPONSE_EVENT: &'static str = "respond-actions";
}

/// Ask the owner of `action_id` to run it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteActionRequest {
    pub action_id: String,
    pub plugin_id: String,
    pub track: Track,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteActionResponse {
    pub plugin_id: String,
    pub action_id: String,
    pub handled: bool,
}

impl Request for ExecuteActionRequest {
    type Response = ExecuteActionResponse;
    const REQUEST_EVENT: &'static str = "execute-action-request";
    const RESPONSE_EVENT: &'static str = "execute-action-response";
}

/// Payload of [`ACTION_EXECUTED`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionExecuted {
    pub action_id: String,
    pub plugin_id: String,
    pub track_id: String,
}
