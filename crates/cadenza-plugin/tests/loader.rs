// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin loader tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cadenza_bus::EventBus;
use cadenza_core::{
    CadenzaError, ConfigField, ConfigFieldKind, LifecycleHook, Plugin, PluginCategory,
    PluginConfig, PluginManifest, PluginStatus,
};
use cadenza_plugin::{
    ManifestEntry, ManifestRegistry, PluginFactory, PluginLoader, PluginRegistry, StaticSettings,
};
use cadenza_test_utils::{CallLog, MockPlugin};
use serde_json::json;

/// Factory producing `MockPlugin`s, with scripted failures.
struct TestFactory {
    id: String,
    category: PluginCategory,
    log: CallLog,
    fail_create: bool,
    invalid: Option<String>,
    fail_initialize: bool,
    defaults: PluginConfig,
    created: AtomicUsize,
    last_config: Mutex<Option<PluginConfig>>,
}

impl TestFactory {
    fn new(id: &str, log: &CallLog) -> Self {
        Self {
            id: id.to_string(),
            category: PluginCategory::SyncProvider,
            log: log.clone(),
            fail_create: false,
            invalid: None,
            fail_initialize: false,
            defaults: PluginConfig::new(),
            created: AtomicUsize::new(0),
            last_config: Mutex::new(None),
        }
    }
}

#[async_trait]
impl PluginFactory for TestFactory {
    fn validate(&self) -> Result<(), String> {
        match &self.invalid {
            Some(reason) => Err(reason.clone()),
            None => Ok(()),
        }
    }

    fn default_config(&self) -> PluginConfig {
        self.defaults.clone()
    }

    async fn create(&self, config: PluginConfig) -> Result<Arc<dyn Plugin>, CadenzaError> {
        self.log.record(format!("{}:create", self.id));
        if self.fail_create {
            return Err(CadenzaError::provider("create exploded"));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        *self.last_config.lock().unwrap() = Some(config);
        let mut plugin = MockPlugin::new(&self.id, self.category).with_log(&self.log);
        if self.fail_initialize {
            plugin = plugin.failing_on(LifecycleHook::Initialize);
        }
        Ok(Arc::new(plugin))
    }
}

struct Fixture {
    registry: Arc<PluginRegistry>,
    manifests: ManifestRegistry,
    settings: StaticSettings,
    log: CallLog,
}

impl Fixture {
    fn new() -> Self {
        Self {
            registry: Arc::new(PluginRegistry::new(EventBus::new())),
            manifests: ManifestRegistry::new(),
            settings: StaticSettings::default(),
            log: CallLog::new(),
        }
    }

    fn add(&mut self, manifest: PluginManifest, factory: TestFactory) -> &mut Self {
        self.manifests
            .register(ManifestEntry::new(manifest, Arc::new(factory)))
            .unwrap();
        self
    }

    fn add_simple(&mut self, id: &str) -> &mut Self {
        let factory = TestFactory::new(id, &self.log);
        self.add(manifest(id), factory)
    }

    fn loader(self) -> (PluginLoader, Arc<PluginRegistry>, CallLog) {
        let registry = Arc::clone(&self.registry);
        let loader = PluginLoader::new(self.registry, self.manifests, Arc::new(self.settings));
        (loader, registry, self.log)
    }
}

fn manifest(id: &str) -> PluginManifest {
    PluginManifest::new(id, format!("Plugin {id}"), PluginCategory::SyncProvider)
}

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn batch_load_reports_failures_without_stopping() {
    let mut fixture = Fixture::new();
    fixture.add_simple("a");
    let mut b = TestFactory::new("b", &fixture.log);
    b.fail_create = true;
    fixture.add(manifest("b"), b);
    fixture.add_simple("c");
    let (loader, registry, _) = fixture.loader();

    let report = loader.load_plugins(&ids(&["a", "b", "c"])).await;

    assert_eq!(report.loaded, ids(&["a", "c"]));
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].plugin_id, "b");
    assert!(report.failed[0].error.to_string().contains("create exploded"));

    assert_eq!(registry.status("a").await, Some(PluginStatus::Ready));
    assert!(!registry.is_registered("b").await);
    assert_eq!(registry.status("c").await, Some(PluginStatus::Ready));
}

#[tokio::test]
async fn unknown_plugin_is_manifest_not_found() {
    let (loader, _, _) = Fixture::new().loader();
    let result = loader.load_plugin("ghost", PluginConfig::new()).await;
    assert!(!result.is_ok());
    assert!(matches!(result.error, Some(CadenzaError::ManifestNotFound { .. })));
}

#[tokio::test]
async fn validation_failure_happens_before_create() {
    let mut fixture = Fixture::new();
    let mut factory = TestFactory::new("native", &fixture.log);
    factory.invalid = Some("no audio device".to_string());
    fixture.add(manifest("native"), factory);
    let (loader, registry, log) = fixture.loader();

    let result = loader.load_plugin("native", PluginConfig::new()).await;
    match result.error {
        Some(CadenzaError::ValidationFailed { plugin_id, reason }) => {
            assert_eq!(plugin_id, "native");
            assert_eq!(reason, "no audio device");
        }
        other => panic!("expected ValidationFailed, got {other:?}"),
    }
    assert!(log.entries().is_empty());
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn already_registered_is_a_noop_success() {
    let mut fixture = Fixture::new();
    fixture.add_simple("a");
    let (loader, _, log) = fixture.loader();

    assert!(loader.load_plugin("a", PluginConfig::new()).await.is_ok());
    assert!(loader.load_plugin("a", PluginConfig::new()).await.is_ok());
    assert_eq!(log.matching("a:create").len(), 1);
}

#[tokio::test]
async fn config_merges_schema_factory_and_overrides() {
    let log = CallLog::new();
    let mut factory = TestFactory::new("lastfm", &log);
    factory.defaults = json!({"mode": "batch", "threshold": 50})
        .as_object()
        .cloned()
        .unwrap();
    let factory = Arc::new(factory);

    let manifest = manifest("lastfm")
        .with_config_field(ConfigField::new("api_key", ConfigFieldKind::String).required())
        .with_config_field(ConfigField::new("retries", ConfigFieldKind::Number).with_default(json!(3)))
        .with_config_field(
            ConfigField::new("mode", ConfigFieldKind::Select).with_options(["live", "batch"]),
        );
    let mut manifests = ManifestRegistry::new();
    manifests
        .register(ManifestEntry::new(manifest, factory.clone()))
        .unwrap();
    let registry = Arc::new(PluginRegistry::new(EventBus::new()));
    let loader = PluginLoader::new(Arc::clone(&registry), manifests, Arc::new(StaticSettings::default()));

    let overrides = json!({"api_key": "secret", "threshold": 80})
        .as_object()
        .cloned()
        .unwrap();
    assert!(loader.load_plugin("lastfm", overrides).await.is_ok());

    let config = factory.last_config.lock().unwrap().clone().unwrap();
    assert_eq!(config["api_key"], "secret");
    assert_eq!(config["threshold"], 80);
    assert_eq!(config["mode"], "batch");
    assert_eq!(config["retries"], 3);
    assert_eq!(registry.entry("lastfm").await.unwrap().config, config);
}

#[tokio::test]
async fn invalid_merged_config_is_rejected() {
    let mut fixture = Fixture::new();
    let factory = TestFactory::new("lastfm", &fixture.log);
    fixture.add(
        manifest("lastfm")
            .with_config_field(ConfigField::new("api_key", ConfigFieldKind::String).required()),
        factory,
    );
    let (loader, registry, log) = fixture.loader();

    let result = loader.load_plugin("lastfm", PluginConfig::new()).await;
    assert!(matches!(result.error, Some(CadenzaError::ValidationFailed { .. })));
    assert!(log.matching("lastfm:create").is_empty());
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn dependencies_must_be_loaded() {
    let mut fixture = Fixture::new();
    fixture.add_simple("meta");
    let lyrics = TestFactory::new("lyrics", &fixture.log);
    fixture.add(manifest("lyrics").with_dependency("meta"), lyrics);
    let (loader, _, _) = fixture.loader();

    let result = loader.load_plugin("lyrics", PluginConfig::new()).await;
    assert!(matches!(
        result.error,
        Some(CadenzaError::MissingDependency { ref dependency, .. }) if dependency == "meta"
    ));

    // In a batch, the dependency is loaded first regardless of order.
    let report = loader.load_plugins(&ids(&["lyrics", "meta"])).await;
    assert_eq!(report.loaded, ids(&["meta", "lyrics"]));
}

#[tokio::test]
async fn initialize_failure_is_reported() {
    let mut fixture = Fixture::new();
    let mut factory = TestFactory::new("flaky", &fixture.log);
    factory.fail_initialize = true;
    fixture.add(manifest("flaky"), factory);
    let (loader, registry, _) = fixture.loader();

    let result = loader.load_plugin("flaky", PluginConfig::new()).await;
    assert!(matches!(
        result.error,
        Some(CadenzaError::HookFailure {
            hook: LifecycleHook::Initialize,
            ..
        })
    ));
    assert_eq!(registry.status("flaky").await, Some(PluginStatus::Error));
}

#[tokio::test]
async fn auto_activate_entries_become_active() {
    let log = CallLog::new();
    let mut manifests = ManifestRegistry::new();
    manifests
        .register(
            ManifestEntry::new(manifest("a"), Arc::new(TestFactory::new("a", &log)))
                .with_priority(7)
                .auto_activate(),
        )
        .unwrap();
    let registry = Arc::new(PluginRegistry::new(EventBus::new()));
    let loader = PluginLoader::new(Arc::clone(&registry), manifests, Arc::new(StaticSettings::default()));

    let report = loader.load_all_plugins().await;
    assert_eq!(report.loaded, ids(&["a"]));
    let entry = registry.entry("a").await.unwrap();
    assert_eq!(entry.status, PluginStatus::Active);
    assert_eq!(entry.priority, 7);
}

#[tokio::test]
async fn enabled_plugins_come_from_settings() {
    let log = CallLog::new();
    let mut manifests = ManifestRegistry::new();
    for id in ["a", "b", "c"] {
        manifests
            .register(ManifestEntry::new(manifest(id), Arc::new(TestFactory::new(id, &log))))
            .unwrap();
    }
    let mut configs = HashMap::new();
    configs.insert(
        "c".to_string(),
        json!({"region": "eu"}).as_object().cloned().unwrap(),
    );
    let settings = StaticSettings::new(ids(&["c", "a"]), configs);
    let registry = Arc::new(PluginRegistry::new(EventBus::new()));
    let loader = PluginLoader::new(Arc::clone(&registry), manifests, Arc::new(settings));

    let report = loader.load_enabled_plugins().await;
    assert_eq!(report.loaded, ids(&["c", "a"]));
    assert!(!registry.is_registered("b").await);
    assert_eq!(registry.entry("c").await.unwrap().config["region"], "eu");
}

#[tokio::test]
async fn unload_and_reload() {
    let mut fixture = Fixture::new();
    fixture.add_simple("a");
    let (loader, registry, log) = fixture.loader();

    assert!(loader.load_plugin("a", PluginConfig::new()).await.is_ok());
    assert!(loader.reload_plugin("a").await.is_ok());
    assert_eq!(log.matching("a:create").len(), 2);
    assert_eq!(log.matching("a:destroy").len(), 1);
    assert_eq!(registry.status("a").await, Some(PluginStatus::Ready));

    loader.unload_plugin("a").await.unwrap();
    assert!(!registry.is_registered("a").await);
    assert!(matches!(
        loader.unload_plugin("a").await,
        Err(CadenzaError::NotRegistered { .. })
    ));
}
