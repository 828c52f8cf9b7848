// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for bus operations.

use thiserror::Error;

/// Errors raised while publishing typed payloads on the bus.
#[derive(Debug, Error)]
pub enum BusError {
    /// A payload could not be serialized into the JSON envelope.
    #[error("failed to encode payload for `{event}`: {source}")]
    Encode {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}
