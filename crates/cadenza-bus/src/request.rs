// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Correlated request/response over the event bus.
//!
//! The bus has no notion of replies, and the number of responders to a
//! broadcast is not known in advance. A request therefore carries a
//! `requestId`; responders echo it back on the response event, and the
//! caller collects matching responses for a fixed window before
//! unsubscribing. Responses arriving after the window closes are dropped.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::bus::{EventBus, Subscription};
use crate::error::BusError;

/// How long a caller waits for responses to a broadcast request.
pub const DEFAULT_RESPONSE_WINDOW: Duration = Duration::from_millis(100);

/// Binds a request payload to its channel names and response type.
///
/// Request and response types must serialize as JSON objects, since the
/// correlation id is flattened into them.
pub trait Request: Serialize + DeserializeOwned + Send + 'static {
    type Response: Serialize + DeserializeOwned + Send + 'static;

    const REQUEST_EVENT: &'static str;
    const RESPONSE_EVENT: &'static str;
}

/// A payload tagged with the id of the request it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correlated<T> {
    pub request_id: String,
    #[serde(flatten)]
    pub body: T,
}

/// Generate a correlation id: unix millis plus a random suffix.
///
/// Uniqueness is statistical, which is all the protocol needs.
pub fn new_request_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}",
        chrono::Utc::now().timestamp_millis(),
        &suffix[..10]
    )
}

/// Issues requests on a bus and gathers the correlated responses.
#[derive(Debug, Clone)]
pub struct RequestChannel {
    bus: EventBus,
    window: Duration,
}

impl RequestChannel {
    /// Create a channel using [`DEFAULT_RESPONSE_WINDOW`].
    pub fn new(bus: EventBus) -> Self {
        Self::with_window(bus, DEFAULT_RESPONSE_WINDOW)
    }

    pub fn with_window(bus: EventBus, window: Duration) -> Self {
        Self { bus, window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Broadcast `request` and return every response received within the window.
    ///
    /// Always waits out the full window: the number of responders is unknown.
    pub async fn collect<R: Request>(&self, request: R) -> Result<Vec<R::Response>, BusError> {
        let (mut rx, subscription) = self.dispatch(request)?;
        tokio::time::sleep(self.window).await;
        subscription.unsubscribe();

        let mut responses = Vec::new();
        while let Ok(response) = rx.try_recv() {
            responses.push(response);
        }
        debug!(
            event = R::REQUEST_EVENT,
            responses = responses.len(),
            "request window closed"
        );
        Ok(responses)
    }

    /// Broadcast `request` and return the first response satisfying `accept`.
    ///
    /// Returns as soon as an accepted response arrives; later responses for
    /// the same request are ignored. Returns `None` if the window closes first.
    pub async fn first<R, F>(&self, request: R, accept: F) -> Result<Option<R::Response>, BusError>
    where
        R: Request,
        F: Fn(&R::Response) -> bool,
    {
        let deadline = Instant::now() + self.window;
        let (mut rx, subscription) = self.dispatch(request)?;

        let winner = loop {
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Some(response)) if accept(&response) => break Some(response),
                Ok(Some(_)) => continue,
                Ok(None) | Err(_) => break None,
            }
        };
        subscription.unsubscribe();
        Ok(winner)
    }

    fn dispatch<R: Request>(
        &self,
        request: R,
    ) -> Result<(mpsc::UnboundedReceiver<R::Response>, Subscription), BusError> {
        let request_id = new_request_id();
        let payload = serde_json::to_value(Correlated {
            request_id: request_id.clone(),
            body: request,
        })
        .map_err(|source| BusError::Encode {
            event: R::REQUEST_EVENT.to_string(),
            source,
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        let expected = request_id.clone();
        let subscription = self.bus.on(R::RESPONSE_EVENT, move |value: &Value| {
            if value.get("requestId").and_then(Value::as_str) != Some(expected.as_str()) {
                return;
            }
            match serde_json::from_value::<Correlated<R::Response>>(value.clone()) {
                Ok(correlated) => {
                    let _ = tx.send(correlated.body);
                }
                Err(e) => debug!(
                    event = R::RESPONSE_EVENT,
                    error = %e,
                    "dropping malformed response"
                ),
            }
        });

        let handlers = self.bus.emit(R::REQUEST_EVENT, payload);
        debug!(
            event = R::REQUEST_EVENT,
            request_id = %request_id,
            handlers,
            "request dispatched"
        );
        Ok((rx, subscription))
    }
}

/// Answer requests of type `R` arriving on `bus`.
///
/// Each request runs `handler` on a spawned task; a `Some` result is emitted
/// as the correlated response, `None` stays silent. Must be called from
/// within a Tokio runtime context when requests are delivered.
pub fn respond<R, F, Fut>(bus: &EventBus, handler: F) -> Subscription
where
    R: Request,
    F: Fn(R) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<R::Response>> + Send + 'static,
{
    let handler = Arc::new(handler);
    let weak = bus.downgrade();

    bus.on(R::REQUEST_EVENT, move |value: &Value| {
        let request = match serde_json::from_value::<Correlated<R>>(value.clone()) {
            Ok(request) => request,
            Err(e) => {
                debug!(event = R::REQUEST_EVENT, error = %e, "ignoring malformed request");
                return;
            }
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(event = R::REQUEST_EVENT, "request delivered outside a runtime");
            return;
        };

        let handler = Arc::clone(&handler);
        let weak = weak.clone();
        runtime.spawn(async move {
            let Correlated { request_id, body } = request;
            let Some(response) = handler(body).await else {
                return;
            };
            let Some(bus) = weak.upgrade() else {
                return;
            };
            let correlated = Correlated {
                request_id,
                body: response,
            };
            if let Err(e) = bus.emit_json(R::RESPONSE_EVENT, &correlated) {
                warn!(event = R::RESPONSE_EVENT, error = %e, "failed to send response");
            }
        });
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    struct Ping {
        text: String,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Pong {
        from: String,
        handled: bool,
    }

    impl Request for Ping {
        type Response = Pong;
        const REQUEST_EVENT: &'static str = "test-ping";
        const RESPONSE_EVENT: &'static str = "test-pong";
    }

    fn ping() -> Ping {
        Ping {
            text: "hello".into(),
        }
    }

    fn responder(bus: &EventBus, name: &'static str, delay: Duration, handled: bool) {
        respond::<Ping, _, _>(bus, move |_req| async move {
            tokio::time::sleep(delay).await;
            Some(Pong {
                from: name.to_string(),
                handled,
            })
        });
    }

    #[test]
    fn request_ids_are_distinct() {
        assert_ne!(new_request_id(), new_request_id());
    }

    #[tokio::test(start_paused = true)]
    async fn collect_gathers_every_responder() {
        let bus = EventBus::new();
        responder(&bus, "a", Duration::from_millis(5), true);
        responder(&bus, "b", Duration::from_millis(20), false);

        let channel = RequestChannel::new(bus.clone());
        let mut responses = channel.collect(ping()).await.unwrap();
        responses.sort_by(|x, y| x.from.cmp(&y.from));

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].from, "a");
        assert_eq!(responses[1].from, "b");
        assert_eq!(bus.listener_count("test-pong"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn collect_resolves_at_window_with_no_responders() {
        let channel = RequestChannel::new(EventBus::new());
        let started = Instant::now();
        let responses = channel.collect(ping()).await.unwrap();

        assert!(responses.is_empty());
        assert_eq!(started.elapsed(), DEFAULT_RESPONSE_WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn late_responses_are_excluded() {
        let bus = EventBus::new();
        responder(&bus, "fast", Duration::from_millis(10), true);
        responder(&bus, "slow", Duration::from_millis(500), true);

        let started = Instant::now();
        let responses = RequestChannel::new(bus).collect(ping()).await.unwrap();

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].from, "fast");
        assert!(started.elapsed() < Duration::from_millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn responses_to_other_requests_are_filtered() {
        let bus = EventBus::new();
        let stray = bus.clone();
        bus.on("test-ping", move |_| {
            stray.emit(
                "test-pong",
                serde_json::json!({"requestId": "someone-else", "from": "x", "handled": true}),
            );
        });

        let responses = RequestChannel::new(bus).collect(ping()).await.unwrap();
        assert!(responses.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn silent_and_failing_responders_do_not_block() {
        let bus = EventBus::new();
        respond::<Ping, _, _>(&bus, |_req| async { None });
        bus.on("test-ping", |_| {});

        let started = Instant::now();
        let responses = RequestChannel::new(bus).collect(ping()).await.unwrap();
        assert!(responses.is_empty());
        assert_eq!(started.elapsed(), DEFAULT_RESPONSE_WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn first_returns_earliest_accepted_response() {
        let bus = EventBus::new();
        responder(&bus, "declines", Duration::from_millis(5), false);
        responder(&bus, "winner", Duration::from_millis(10), true);
        responder(&bus, "runner-up", Duration::from_millis(30), true);

        let started = Instant::now();
        let winner = RequestChannel::new(bus)
            .first(ping(), |pong: &Pong| pong.handled)
            .await
            .unwrap();

        assert_eq!(winner.unwrap().from, "winner");
        assert!(started.elapsed() < Duration::from_millis(30));
    }

    #[tokio::test(start_paused = true)]
    async fn first_returns_none_when_window_closes() {
        let bus = EventBus::new();
        responder(&bus, "declines", Duration::from_millis(5), false);

        let winner = RequestChannel::new(bus)
            .first(ping(), |pong: &Pong| pong.handled)
            .await
            .unwrap();
        assert!(winner.is_none());
    }
}
