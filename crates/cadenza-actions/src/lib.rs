// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Track action resolution over the event bus.
//!
//! Core services never hold references to the plugins contributing track
//! actions. They broadcast a request and collect whatever answers arrive
//! within a short window:
//!
//! - `request-actions` / `respond-actions`: list the actions offered for a track
//! - `execute-action-request` / `execute-action-response`: run one action
//! - `action-executed`: broadcast once an execute request was handled
//!
//! [`ActionResolver`] is the caller side; [`attach_action_provider`] wires an
//! [`ActionProvider`](cadenza_core::ActionProvider) plugin to the responder side.

pub mod binding;
pub mod protocol;
pub mod resolver;

pub use binding::{attach_action_provider, ActionBinding};
pub use protocol::{
    ActionExecuted, ActionList, ExecuteActionRequest, ExecuteActionResponse, RequestActions,
    ACTION_EXECUTED,
};
pub use resolver::{ActionOutcome, ActionResolver};
