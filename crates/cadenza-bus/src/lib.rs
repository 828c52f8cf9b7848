// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Internal event bus for the Cadenza runtime.
//!
//! The bus is a namespaced publish/subscribe mechanism carrying JSON payloads.
//! Plugins receive a [`ScopedBus`] whose event names are transparently prefixed,
//! while the unscoped [`EventBus`] remains reachable for cross-plugin broadcast.
//!
//! The [`request`] module layers correlated request/response semantics on top
//! of the fire-and-forget bus: a caller broadcasts a request, every subscribed
//! responder may answer, and the caller collects answers for a fixed window.

pub mod bus;
pub mod error;
pub mod request;

pub use bus::{EventBus, Handler, ListenerId, ScopedBus, Subscription, WeakEventBus};
pub use error::BusError;
pub use request::{
    new_request_id, respond, Correlated, Request, RequestChannel, DEFAULT_RESPONSE_WINDOW,
};
