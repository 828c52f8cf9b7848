// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock plugin with scripted lifecycle failures.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use cadenza_core::{
    CadenzaError, LifecycleHook, Plugin, PluginCategory, PluginContext, PluginManifest,
};

/// Lifecycle bookkeeping shared by every mock.
///
/// Records `"{id}:{hook}"` into the [`CallLog`](crate::CallLog) and fails the
/// hooks marked with [`MockHooks::set_failing`].
#[derive(Debug)]
pub struct MockHooks {
    manifest: PluginManifest,
    log: crate::CallLog,
    failing: Mutex<HashSet<LifecycleHook>>,
    delay: Option<Duration>,
    context: Mutex<Option<PluginContext>>,
}

impl MockHooks {
    pub fn new(manifest: PluginManifest) -> Self {
        Self {
            manifest,
            log: crate::CallLog::new(),
            failing: Mutex::new(HashSet::new()),
            delay: None,
            context: Mutex::new(None),
        }
    }

    pub fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    pub fn log(&self) -> &crate::CallLog {
        &self.log
    }

    pub fn set_log(&mut self, log: crate::CallLog) {
        self.log = log;
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = Some(delay);
    }

    pub fn set_failing(&self, hook: LifecycleHook, failing: bool) {
        let mut set = self.failing.lock().unwrap_or_else(PoisonError::into_inner);
        if failing {
            set.insert(hook);
        } else {
            set.remove(&hook);
        }
    }

    /// The context received by the last `initialize` call.
    pub fn context(&self) -> Option<PluginContext> {
        self.context
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record a non-lifecycle call.
    pub fn record(&self, call: impl std::fmt::Display) {
        self.log.record(format!("{}:{call}", self.manifest.id));
    }

    pub async fn run(&self, hook: LifecycleHook) -> Result<(), CadenzaError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.record(hook);
        let fails = self
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&hook);
        if fails {
            return Err(CadenzaError::provider(format!("mock {hook} failure")));
        }
        Ok(())
    }

    pub async fn initialize(&self, ctx: PluginContext) -> Result<(), CadenzaError> {
        *self.context.lock().unwrap_or_else(PoisonError::into_inner) = Some(ctx);
        self.run(LifecycleHook::Initialize).await
    }
}

/// A plugin that fills no provider role; used to drive the registry.
#[derive(Debug)]
pub struct MockPlugin {
    hooks: MockHooks,
}

impl MockPlugin {
    pub fn new(id: &str, category: PluginCategory) -> Self {
        Self::from_manifest(PluginManifest::new(id, format!("Mock {id}"), category))
    }

    pub fn from_manifest(manifest: PluginManifest) -> Self {
        Self {
            hooks: MockHooks::new(manifest),
        }
    }

    /// Share `log` with other mocks.
    pub fn with_log(mut self, log: &crate::CallLog) -> Self {
        self.hooks.set_log(log.clone());
        self
    }

    pub fn failing_on(self, hook: LifecycleHook) -> Self {
        self.hooks.set_failing(hook, true);
        self
    }

    /// Sleep this long inside every hook.
    pub fn with_hook_delay(mut self, delay: Duration) -> Self {
        self.hooks.set_delay(delay);
        self
    }

    pub fn hooks(&self) -> &MockHooks {
        &self.hooks
    }

    pub fn calls(&self) -> Vec<String> {
        self.hooks.log().matching(&format!("{}:", self.hooks.manifest().id))
    }
}

#[async_trait]
impl Plugin for MockPlugin {
    fn manifest(&self) -> &PluginManifest {
        self.hooks.manifest()
    }

    async fn initialize(&self, ctx: PluginContext) -> Result<(), CadenzaError> {
        self.hooks.initialize(ctx).await
    }

    async fn on_activate(&self) -> Result<(), CadenzaError> {
        self.hooks.run(LifecycleHook::Activate).await
    }

    async fn on_deactivate(&self) -> Result<(), CadenzaError> {
        self.hooks.run(LifecycleHook::Deactivate).await
    }

    async fn destroy(&self) -> Result<(), CadenzaError> {
        self.hooks.run(LifecycleHook::Destroy).await
    }
}
