// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin registry: owns live plugin instances and drives their lifecycle.
//!
//! Status transitions follow
//! `uninitialized -> initializing -> ready -> active`, with `error` on a
//! failed hook and `disabled` on explicit request. At most one plugin per
//! category is active at any time.
//!
//! Lifecycle operations are serialized by an internal async mutex so that
//! two concurrent activations in the same category cannot both win. Plugin
//! hooks run while that mutex is held but never while the state lock is
//! held, so queries stay available during slow hooks. Hooks must not call
//! lifecycle operations on the registry themselves.

use std::collections::HashMap;
use std::sync::Arc;

use cadenza_bus::EventBus;
use cadenza_core::{
    CadenzaError, LifecycleHook, Plugin, PluginCategory, PluginConfig, PluginContext,
    PluginStatus,
};
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn, Instrument};

use crate::events::{RegistryEvent, RegistrySubscription};

/// Options supplied at registration.
#[derive(Debug, Clone, Default)]
pub struct RegisterOptions {
    /// Higher values are preferred when several plugins fill a role.
    pub priority: i32,
    /// Activate as soon as initialization succeeds.
    pub auto_activate: bool,
    pub config: PluginConfig,
}

impl RegisterOptions {
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn auto_activate(mut self) -> Self {
        self.auto_activate = true;
        self
    }

    pub fn with_config(mut self, config: PluginConfig) -> Self {
        self.config = config;
        self
    }
}

/// A registry entry: the plugin plus its lifecycle bookkeeping.
#[derive(Clone)]
pub struct RegisteredPlugin {
    pub plugin: Arc<dyn Plugin>,
    pub status: PluginStatus,
    pub priority: i32,
    pub auto_activate: bool,
    pub config: PluginConfig,
    pub registered_at: DateTime<Utc>,
    /// Set once the initialize hook has succeeded.
    pub initialized_at: Option<DateTime<Utc>>,
    /// Registration order, used to break priority ties.
    pub sequence: u64,
}

impl RegisteredPlugin {
    pub fn id(&self) -> &str {
        self.plugin.id()
    }

    pub fn category(&self) -> PluginCategory {
        self.plugin.manifest().category
    }
}

impl std::fmt::Debug for RegisteredPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredPlugin")
            .field("id", &self.id())
            .field("status", &self.status)
            .field("priority", &self.priority)
            .field("auto_activate", &self.auto_activate)
            .field("sequence", &self.sequence)
            .finish()
    }
}

#[derive(Default)]
struct RegistryState {
    plugins: HashMap<String, RegisteredPlugin>,
    active: HashMap<PluginCategory, String>,
    next_sequence: u64,
}

/// Owns the set of live plugins and which one is active per category.
///
/// Constructed explicitly and shared as `Arc<PluginRegistry>`.
pub struct PluginRegistry {
    bus: EventBus,
    state: RwLock<RegistryState>,
    transitions: Mutex<()>,
}

impl PluginRegistry {
    /// Create an empty registry publishing lifecycle events on `bus`.
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            state: RwLock::new(RegistryState::default()),
            transitions: Mutex::new(()),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Add `plugin` with status `uninitialized`.
    pub async fn register(
        &self,
        plugin: Arc<dyn Plugin>,
        options: RegisterOptions,
    ) -> Result<(), CadenzaError> {
        plugin.manifest().check_identity()?;
        let id = plugin.id().to_string();
        let category = plugin.manifest().category;

        let _guard = self.transitions.lock().await;
        {
            let mut state = self.state.write().await;
            if state.plugins.contains_key(&id) {
                return Err(CadenzaError::DuplicateId { id });
            }
            let sequence = state.next_sequence;
            state.next_sequence += 1;
            state.plugins.insert(
                id.clone(),
                RegisteredPlugin {
                    plugin,
                    status: PluginStatus::Uninitialized,
                    priority: options.priority,
                    auto_activate: options.auto_activate,
                    config: options.config,
                    registered_at: Utc::now(),
                    initialized_at: None,
                    sequence,
                },
            );
        }

        info!(plugin_id = %id, %category, "plugin registered");
        self.emit(RegistryEvent::PluginRegistered {
            plugin_id: id,
            category,
        });
        Ok(())
    }

    /// Run the initialize hook. A no-op unless the plugin is `uninitialized`.
    ///
    /// Activates the plugin afterwards when it was registered with
    /// `auto_activate`.
    pub async fn initialize(&self, id: &str) -> Result<(), CadenzaError> {
        let _guard = self.transitions.lock().await;
        let initialized = self.initialize_locked(id).await?;
        let auto_activate = self
            .entry(id)
            .await
            .is_some_and(|entry| entry.auto_activate);
        if initialized && auto_activate {
            self.activate_locked(id).await?;
        }
        Ok(())
    }

    /// Make `id` the active plugin of its category.
    ///
    /// Initializes first if needed and deactivates the previous active plugin
    /// of the category before running `on_activate`.
    pub async fn activate(&self, id: &str) -> Result<(), CadenzaError> {
        let _guard = self.transitions.lock().await;
        self.activate_locked(id).await
    }

    /// Stop `id` being the active plugin. A no-op if it is not active.
    pub async fn deactivate(&self, id: &str) -> Result<(), CadenzaError> {
        let _guard = self.transitions.lock().await;
        self.deactivate_locked(id).await
    }

    /// Remove `id`, deactivating it first and always running `destroy`.
    ///
    /// When `destroy` fails the plugin is removed regardless and
    /// [`CadenzaError::DestroyFailed`] is returned.
    pub async fn unregister(&self, id: &str) -> Result<(), CadenzaError> {
        let _guard = self.transitions.lock().await;
        self.unregister_locked(id).await
    }

    /// Deactivate if needed and mark `id` as `disabled`.
    pub async fn disable(&self, id: &str) -> Result<(), CadenzaError> {
        let _guard = self.transitions.lock().await;
        self.require(id).await?;
        self.deactivate_locked(id).await?;
        self.set_status(id, PluginStatus::Disabled).await;
        info!(plugin_id = %id, "plugin disabled");
        Ok(())
    }

    /// Return a disabled plugin to `ready` (or `uninitialized` if it never
    /// completed initialization). A no-op for any other status.
    pub async fn enable(&self, id: &str) -> Result<(), CadenzaError> {
        let _guard = self.transitions.lock().await;
        let entry = self.require(id).await?;
        if entry.status != PluginStatus::Disabled {
            return Ok(());
        }
        let status = if entry.initialized_at.is_some() {
            PluginStatus::Ready
        } else {
            PluginStatus::Uninitialized
        };
        self.set_status(id, status).await;
        info!(plugin_id = %id, %status, "plugin enabled");
        Ok(())
    }

    /// Unregister every plugin in registration order and drop all listeners.
    ///
    /// Failures are logged, not returned. The registry must not be used
    /// afterwards.
    pub async fn dispose(&self) {
        let _guard = self.transitions.lock().await;
        let ids: Vec<String> = self
            .sorted(|_| true, |a, b| a.sequence.cmp(&b.sequence))
            .await
            .into_iter()
            .map(|e| e.id().to_string())
            .collect();

        for id in ids {
            if let Err(e) = self.unregister_locked(&id).await {
                warn!(plugin_id = %id, error = %e, "failed to unregister plugin during dispose");
            }
        }

        {
            let mut state = self.state.write().await;
            state.plugins.clear();
            state.active.clear();
        }
        self.bus.remove_all_listeners();
        debug!("plugin registry disposed");
    }

    // --- queries ---

    pub async fn get_plugin(&self, id: &str) -> Option<Arc<dyn Plugin>> {
        self.state
            .read()
            .await
            .plugins
            .get(id)
            .map(|e| Arc::clone(&e.plugin))
    }

    /// Snapshot of the full registry entry for `id`.
    pub async fn entry(&self, id: &str) -> Option<RegisteredPlugin> {
        self.state.read().await.plugins.get(id).cloned()
    }

    pub async fn status(&self, id: &str) -> Option<PluginStatus> {
        self.state.read().await.plugins.get(id).map(|e| e.status)
    }

    pub async fn is_registered(&self, id: &str) -> bool {
        self.state.read().await.plugins.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.plugins.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.plugins.is_empty()
    }

    /// Every entry, in registration order.
    pub async fn get_all_plugins(&self) -> Vec<RegisteredPlugin> {
        self.sorted(|_| true, |a, b| a.sequence.cmp(&b.sequence))
            .await
    }

    /// Entries whose manifest category is `category`, highest priority first.
    pub async fn get_plugins_by_category(&self, category: PluginCategory) -> Vec<RegisteredPlugin> {
        self.sorted(|e| e.category() == category, by_priority).await
    }

    /// Every entry, highest priority first, ties in registration order.
    pub async fn plugins_by_priority(&self) -> Vec<RegisteredPlugin> {
        self.sorted(|_| true, by_priority).await
    }

    /// The active entry for `category`, if any.
    pub async fn active_plugin(&self, category: PluginCategory) -> Option<RegisteredPlugin> {
        let state = self.state.read().await;
        state
            .active
            .get(&category)
            .and_then(|id| state.plugins.get(id))
            .cloned()
    }

    /// Snapshot of the category to active plugin id map.
    pub async fn active_providers(&self) -> HashMap<PluginCategory, String> {
        self.state.read().await.active.clone()
    }

    /// Receive every registry lifecycle event.
    pub fn on<F>(&self, handler: F) -> RegistrySubscription
    where
        F: Fn(&RegistryEvent) + Send + Sync + 'static,
    {
        RegistrySubscription::listen(&self.bus, handler)
    }

    // --- transitions; callers hold `transitions` ---

    /// Returns whether the hook ran and succeeded.
    async fn initialize_locked(&self, id: &str) -> Result<bool, CadenzaError> {
        let (plugin, config) = {
            let mut state = self.state.write().await;
            let entry = state
                .plugins
                .get_mut(id)
                .ok_or_else(|| not_registered(id))?;
            if entry.status != PluginStatus::Uninitialized {
                debug!(plugin_id = %id, status = %entry.status, "initialize skipped");
                return Ok(false);
            }
            entry.status = PluginStatus::Initializing;
            (Arc::clone(&entry.plugin), entry.config.clone())
        };

        let ctx = PluginContext::new(id, self.bus.scope(&format!("plugin:{id}")), config);
        let span = ctx.span.clone();
        if let Err(e) = plugin.initialize(ctx).instrument(span).await {
            return Err(self.hook_failed(id, LifecycleHook::Initialize, e).await);
        }

        {
            let mut state = self.state.write().await;
            if let Some(entry) = state.plugins.get_mut(id) {
                entry.status = PluginStatus::Ready;
                entry.initialized_at = Some(Utc::now());
            }
        }
        info!(plugin_id = %id, "plugin initialized");
        self.emit(RegistryEvent::PluginInitialized {
            plugin_id: id.to_string(),
        });
        Ok(true)
    }

    async fn activate_locked(&self, id: &str) -> Result<(), CadenzaError> {
        let entry = self.require(id).await?;
        if entry.status == PluginStatus::Uninitialized {
            self.initialize_locked(id).await?;
        }

        let entry = self.require(id).await?;
        let category = entry.category();
        if matches!(entry.status, PluginStatus::Error | PluginStatus::Disabled) {
            return Err(CadenzaError::PluginUnavailable {
                id: id.to_string(),
                status: entry.status,
            });
        }

        let current = self.state.read().await.active.get(&category).cloned();
        match current {
            Some(active) if active == id => {
                debug!(plugin_id = %id, "plugin already active");
                return Ok(());
            }
            Some(active) => self.deactivate_locked(&active).await?,
            None => {}
        }

        if let Err(e) = entry.plugin.on_activate().await {
            return Err(self.hook_failed(id, LifecycleHook::Activate, e).await);
        }

        {
            let mut state = self.state.write().await;
            state.active.insert(category, id.to_string());
            if let Some(entry) = state.plugins.get_mut(id) {
                entry.status = PluginStatus::Active;
            }
        }
        info!(plugin_id = %id, %category, "plugin activated");
        self.emit(RegistryEvent::PluginActivated {
            plugin_id: id.to_string(),
            category,
        });
        Ok(())
    }

    async fn deactivate_locked(&self, id: &str) -> Result<(), CadenzaError> {
        let entry = self.require(id).await?;
        let category = entry.category();
        let is_active = self.state.read().await.active.get(&category).map(String::as_str) == Some(id);
        if !is_active {
            return Ok(());
        }

        if let Err(e) = entry.plugin.on_deactivate().await {
            warn!(plugin_id = %id, error = %e, "deactivate hook failed");
            self.emit_error(id, LifecycleHook::Deactivate, &e);
            return Err(CadenzaError::HookFailure {
                plugin_id: id.to_string(),
                hook: LifecycleHook::Deactivate,
                source: Box::new(e),
            });
        }

        {
            let mut state = self.state.write().await;
            state.active.remove(&category);
            if let Some(entry) = state.plugins.get_mut(id) {
                entry.status = PluginStatus::Ready;
            }
        }
        info!(plugin_id = %id, %category, "plugin deactivated");
        self.emit(RegistryEvent::PluginDeactivated {
            plugin_id: id.to_string(),
            category,
        });
        Ok(())
    }

    async fn unregister_locked(&self, id: &str) -> Result<(), CadenzaError> {
        let entry = self.require(id).await?;
        self.deactivate_locked(id).await?;

        let destroyed = entry.plugin.destroy().await;

        {
            let mut state = self.state.write().await;
            state.plugins.remove(id);
            let category = entry.category();
            if state.active.get(&category).map(String::as_str) == Some(id) {
                state.active.remove(&category);
            }
        }

        match destroyed {
            Ok(()) => {
                info!(plugin_id = %id, "plugin unregistered");
                self.emit(RegistryEvent::PluginUnregistered {
                    plugin_id: id.to_string(),
                });
                Ok(())
            }
            Err(e) => {
                warn!(
                    plugin_id = %id,
                    error = %e,
                    "destroy hook failed; plugin removed, resources may have leaked"
                );
                self.emit_error(id, LifecycleHook::Destroy, &e);
                self.emit(RegistryEvent::PluginUnregistered {
                    plugin_id: id.to_string(),
                });
                Err(CadenzaError::DestroyFailed {
                    plugin_id: id.to_string(),
                    source: Box::new(e),
                })
            }
        }
    }

    // --- helpers ---

    async fn require(&self, id: &str) -> Result<RegisteredPlugin, CadenzaError> {
        self.entry(id).await.ok_or_else(|| not_registered(id))
    }

    async fn set_status(&self, id: &str, status: PluginStatus) {
        if let Some(entry) = self.state.write().await.plugins.get_mut(id) {
            entry.status = status;
        }
    }

    /// Mark `id` as errored, publish `plugin-error`, and wrap the cause.
    async fn hook_failed(&self, id: &str, hook: LifecycleHook, error: CadenzaError) -> CadenzaError {
        self.set_status(id, PluginStatus::Error).await;
        warn!(plugin_id = %id, %hook, error = %error, "plugin hook failed");
        self.emit_error(id, hook, &error);
        CadenzaError::HookFailure {
            plugin_id: id.to_string(),
            hook,
            source: Box::new(error),
        }
    }

    fn emit_error(&self, id: &str, hook: LifecycleHook, error: &CadenzaError) {
        self.emit(RegistryEvent::PluginError {
            plugin_id: id.to_string(),
            hook: hook.to_string(),
            message: error.to_string(),
        });
    }

    fn emit(&self, event: RegistryEvent) {
        if let Err(e) = self.bus.emit_json(event.name(), &event) {
            warn!(event = event.name(), error = %e, "failed to publish registry event");
        }
    }

    async fn sorted<P, C>(&self, keep: P, order: C) -> Vec<RegisteredPlugin>
    where
        P: Fn(&RegisteredPlugin) -> bool,
        C: FnMut(&RegisteredPlugin, &RegisteredPlugin) -> std::cmp::Ordering,
    {
        let mut entries: Vec<RegisteredPlugin> = self
            .state
            .read()
            .await
            .plugins
            .values()
            .filter(|e| keep(e))
            .cloned()
            .collect();
        entries.sort_by(order);
        entries
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry").finish_non_exhaustive()
    }
}

fn by_priority(a: &RegisteredPlugin, b: &RegisteredPlugin) -> std::cmp::Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.sequence.cmp(&b.sequence))
}

fn not_registered(id: &str) -> CadenzaError {
    CadenzaError::NotRegistered { id: id.to_string() }
}
