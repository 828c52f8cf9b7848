// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Namespaced publish/subscribe bus.
//!
//! Handlers are synchronous callbacks invoked in subscription order. The
//! listener list is snapshotted before dispatch, so a handler may subscribe
//! or unsubscribe (including itself) without deadlocking the bus. Handlers
//! that need to do async work spawn it onto the runtime.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockWriteGuard, Weak};

use serde::Serialize;
use serde_json::Value;
use tracing::trace;

use crate::error::BusError;

/// A subscribed event handler.
pub type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Identifies a single listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener {
    id: ListenerId,
    handler: Handler,
    once: bool,
}

#[derive(Default)]
struct BusInner {
    listeners: RwLock<HashMap<String, Vec<Listener>>>,
    next_id: AtomicU64,
}

static GLOBAL_BUS: OnceLock<EventBus> = OnceLock::new();

/// Cloneable handle to a shared event bus.
///
/// Clones share the same listener set.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Create a new bus with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide shared bus instance.
    ///
    /// Services should prefer an explicitly constructed bus; the global one
    /// exists for cross-plugin broadcast where no handle was injected.
    pub fn global() -> &'static EventBus {
        GLOBAL_BUS.get_or_init(EventBus::new)
    }

    /// Publish `payload` to every listener of `event`.
    ///
    /// Returns the number of handlers invoked.
    pub fn emit(&self, event: &str, payload: Value) -> usize {
        let handlers: Vec<Handler> = {
            let mut listeners = self.write();
            let Some(entries) = listeners.get_mut(event) else {
                trace!(event, "no listeners");
                return 0;
            };
            let handlers = entries.iter().map(|l| Arc::clone(&l.handler)).collect();
            entries.retain(|l| !l.once);
            if entries.is_empty() {
                listeners.remove(event);
            }
            handlers
        };

        for handler in &handlers {
            handler(&payload);
        }
        trace!(event, handlers = handlers.len(), "event emitted");
        handlers.len()
    }

    /// Serialize `payload` and publish it to every listener of `event`.
    pub fn emit_json<T: Serialize>(&self, event: &str, payload: &T) -> Result<usize, BusError> {
        let value = serde_json::to_value(payload).map_err(|source| BusError::Encode {
            event: event.to_string(),
            source,
        })?;
        Ok(self.emit(event, value))
    }

    /// Subscribe `handler` to `event`.
    pub fn on<F>(&self, event: &str, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.add_listener(event, Arc::new(handler), false)
    }

    /// Subscribe `handler` for a single delivery of `event`.
    pub fn once<F>(&self, event: &str, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.add_listener(event, Arc::new(handler), true)
    }

    /// Remove a listener. Returns `false` if it was not subscribed.
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        let mut listeners = self.write();
        let Some(entries) = listeners.get_mut(event) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|l| l.id != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            listeners.remove(event);
        }
        removed
    }

    /// Drop every listener on every event.
    pub fn remove_all_listeners(&self) {
        self.write().clear();
    }

    /// Number of listeners currently subscribed to `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .map_or(0, Vec::len)
    }

    /// A view of this bus whose event names are prefixed with `"{prefix}:"`.
    pub fn scope(&self, prefix: &str) -> ScopedBus {
        ScopedBus {
            bus: self.clone(),
            prefix: prefix.to_string(),
        }
    }

    /// A handle that does not keep the bus alive.
    pub fn downgrade(&self) -> WeakEventBus {
        WeakEventBus(Arc::downgrade(&self.inner))
    }

    fn add_listener(&self, event: &str, handler: Handler, once: bool) -> Subscription {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.write()
            .entry(event.to_string())
            .or_default()
            .push(Listener { id, handler, once });
        Subscription {
            bus: self.downgrade(),
            event: event.to_string(),
            id,
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<Listener>>> {
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let events = self
            .inner
            .listeners
            .read()
            .map(|l| l.len())
            .unwrap_or_default();
        f.debug_struct("EventBus").field("events", &events).finish()
    }
}

/// Weak counterpart of [`EventBus`], used by handlers stored inside the bus.
#[derive(Clone)]
pub struct WeakEventBus(Weak<BusInner>);

impl WeakEventBus {
    /// Upgrade to a strong handle if the bus is still alive.
    pub fn upgrade(&self) -> Option<EventBus> {
        self.0.upgrade().map(|inner| EventBus { inner })
    }
}

/// Handle returned by `on`/`once`, used to remove the listener later.
///
/// Dropping a subscription does not unsubscribe.
#[derive(Clone)]
pub struct Subscription {
    bus: WeakEventBus,
    event: String,
    id: ListenerId,
}

impl Subscription {
    /// Remove the listener. Returns `false` if it was already gone.
    pub fn unsubscribe(&self) -> bool {
        self.bus
            .upgrade()
            .is_some_and(|bus| bus.off(&self.event, self.id))
    }

    /// Fully qualified event name this subscription listens on.
    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.event)
            .field("id", &self.id)
            .finish()
    }
}

/// A prefixed view over an [`EventBus`].
///
/// `emit("ready")` on a bus scoped to `plugin:lastfm` publishes
/// `plugin:lastfm:ready` on the underlying bus.
#[derive(Clone, Debug)]
pub struct ScopedBus {
    bus: EventBus,
    prefix: String,
}

impl ScopedBus {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The fully qualified name for `event` within this scope.
    pub fn scoped_name(&self, event: &str) -> String {
        format!("{}:{event}", self.prefix)
    }

    pub fn emit(&self, event: &str, payload: Value) -> usize {
        self.bus.emit(&self.scoped_name(event), payload)
    }

    pub fn emit_json<T: Serialize>(&self, event: &str, payload: &T) -> Result<usize, BusError> {
        self.bus.emit_json(&self.scoped_name(event), payload)
    }

    pub fn on<F>(&self, event: &str, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.bus.on(&self.scoped_name(event), handler)
    }

    pub fn once<F>(&self, event: &str, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.bus.once(&self.scoped_name(event), handler)
    }

    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        self.bus.off(&self.scoped_name(event), id)
    }

    /// Nest a further scope: `plugin:x` scoped by `ui` yields `plugin:x:ui`.
    pub fn scope(&self, prefix: &str) -> ScopedBus {
        self.bus.scope(&self.scoped_name(prefix))
    }

    /// The unscoped bus, for cross-plugin broadcast.
    pub fn global(&self) -> &EventBus {
        &self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<Value>>>, impl Fn(&Value) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |v: &Value| sink.lock().unwrap().push(v.clone()))
    }

    #[test]
    fn emit_reaches_all_subscribers_in_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second"] {
            let order = Arc::clone(&order);
            bus.on("track-changed", move |_| order.lock().unwrap().push(tag));
        }

        let invoked = bus.emit("track-changed", serde_json::json!({"id": "t1"}));
        assert_eq!(invoked, 2);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn emit_without_listeners_is_a_noop() {
        let bus = EventBus::new();
        assert_eq!(bus.emit("nobody-home", Value::Null), 0);
    }

    #[test]
    fn unsubscribe_removes_only_that_listener() {
        let bus = EventBus::new();
        let (seen_a, handler_a) = recorder();
        let (seen_b, handler_b) = recorder();
        let sub_a = bus.on("evt", handler_a);
        bus.on("evt", handler_b);

        assert!(sub_a.unsubscribe());
        assert!(!sub_a.unsubscribe());
        bus.emit("evt", serde_json::json!(1));

        assert!(seen_a.lock().unwrap().is_empty());
        assert_eq!(seen_b.lock().unwrap().len(), 1);
        assert_eq!(bus.listener_count("evt"), 1);
    }

    #[test]
    fn once_listener_fires_a_single_time() {
        let bus = EventBus::new();
        let (seen, handler) = recorder();
        bus.once("evt", handler);

        bus.emit("evt", serde_json::json!(1));
        bus.emit("evt", serde_json::json!(2));

        assert_eq!(*seen.lock().unwrap(), vec![serde_json::json!(1)]);
        assert_eq!(bus.listener_count("evt"), 0);
    }

    #[test]
    fn scoped_bus_prefixes_names() {
        let bus = EventBus::new();
        let scoped = bus.scope("plugin:lastfm");
        let (seen, handler) = recorder();
        bus.on("plugin:lastfm:scrobbled", handler);

        scoped.emit("scrobbled", serde_json::json!({"ok": true}));
        bus.emit("scrobbled", serde_json::json!({"ok": false}));

        assert_eq!(*seen.lock().unwrap(), vec![serde_json::json!({"ok": true})]);
        assert_eq!(scoped.scope("ui").prefix(), "plugin:lastfm:ui");
    }

    #[test]
    fn scoped_subscription_sees_only_its_namespace() {
        let bus = EventBus::new();
        let a = bus.scope("plugin:a");
        let b = bus.scope("plugin:b");
        let (seen, handler) = recorder();
        a.on("ping", handler);

        b.emit("ping", Value::Null);
        assert!(seen.lock().unwrap().is_empty());

        a.emit("ping", Value::Null);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn handler_may_subscribe_reentrantly() {
        let bus = EventBus::new();
        let inner_bus = bus.clone();
        bus.on("outer", move |_| {
            inner_bus.on("inner", |_| {});
        });

        bus.emit("outer", Value::Null);
        assert_eq!(bus.listener_count("inner"), 1);
    }

    #[test]
    fn remove_all_listeners_clears_everything() {
        let bus = EventBus::new();
        bus.on("a", |_| {});
        bus.on("b", |_| {});
        bus.remove_all_listeners();
        assert_eq!(bus.listener_count("a"), 0);
        assert_eq!(bus.listener_count("b"), 0);
    }

    #[test]
    fn global_bus_is_shared() {
        let a = EventBus::global();
        let b = EventBus::global();
        assert!(Arc::ptr_eq(&a.inner, &b.inner));
    }

    #[test]
    fn subscription_outliving_bus_is_harmless() {
        let bus = EventBus::new();
        let sub = bus.on("evt", |_| {});
        drop(bus);
        assert!(!sub.unsubscribe());
    }
}
