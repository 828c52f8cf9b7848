// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle tests for the plugin registry.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cadenza_bus::EventBus;
use cadenza_core::{CadenzaError, LifecycleHook, PluginCategory, PluginManifest, PluginStatus};
use cadenza_plugin::{
    MetadataCategory, PluginRegistry, ProviderAccessor, RegisterOptions, RegistryEvent,
};
use cadenza_test_utils::{CallLog, MockMetadata, MockPlugin};

fn registry() -> Arc<PluginRegistry> {
    Arc::new(PluginRegistry::new(EventBus::new()))
}

/// Record every registry event as `"{name}:{plugin id}"`.
fn record_events(registry: &PluginRegistry) -> Arc<Mutex<Vec<String>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    registry.on(move |event: &RegistryEvent| {
        sink.lock()
            .unwrap()
            .push(format!("{}:{}", event.name(), event.plugin_id()));
    });
    events
}

fn sync_plugin(id: &str, log: &CallLog) -> Arc<MockPlugin> {
    Arc::new(MockPlugin::new(id, PluginCategory::SyncProvider).with_log(log))
}

#[tokio::test]
async fn register_rejects_duplicates_and_blank_manifests() {
    let registry = registry();
    let log = CallLog::new();
    registry
        .register(sync_plugin("a", &log), RegisterOptions::default())
        .await
        .unwrap();

    let err = registry
        .register(sync_plugin("a", &log), RegisterOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CadenzaError::DuplicateId { id } if id == "a"));

    let blank = MockPlugin::from_manifest(PluginManifest::new("", "Nameless", PluginCategory::SyncProvider));
    let err = registry
        .register(Arc::new(blank), RegisterOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CadenzaError::InvalidManifest(_)));

    assert_eq!(registry.len().await, 1);
    assert_eq!(registry.status("a").await, Some(PluginStatus::Uninitialized));
}

#[tokio::test]
async fn initialize_is_idempotent() {
    let registry = registry();
    let log = CallLog::new();
    let plugin = sync_plugin("a", &log);
    registry
        .register(plugin.clone(), RegisterOptions::default())
        .await
        .unwrap();

    registry.initialize("a").await.unwrap();
    registry.initialize("a").await.unwrap();

    assert_eq!(plugin.calls(), vec!["a:initialize"]);
    assert_eq!(registry.status("a").await, Some(PluginStatus::Ready));
    assert!(registry.entry("a").await.unwrap().initialized_at.is_some());
}

#[tokio::test]
async fn initialize_passes_scoped_context() {
    let registry = registry();
    let log = CallLog::new();
    let plugin = sync_plugin("lastfm", &log);
    let mut config = cadenza_core::PluginConfig::new();
    config.insert("api_key".into(), "k".into());
    registry
        .register(plugin.clone(), RegisterOptions::default().with_config(config))
        .await
        .unwrap();
    registry.initialize("lastfm").await.unwrap();

    let ctx = plugin.hooks().context().unwrap();
    assert_eq!(ctx.plugin_id, "lastfm");
    assert_eq!(ctx.get_str("api_key"), Some("k"));
    assert_eq!(ctx.bus.prefix(), "plugin:lastfm");
}

#[tokio::test]
async fn initialize_failure_marks_error_and_keeps_cause() {
    let registry = registry();
    let events = record_events(&registry);
    let plugin = MockPlugin::new("a", PluginCategory::SyncProvider).failing_on(LifecycleHook::Initialize);
    registry
        .register(Arc::new(plugin), RegisterOptions::default().auto_activate())
        .await
        .unwrap();

    let err = registry.initialize("a").await.unwrap_err();
    let CadenzaError::HookFailure { hook, source, .. } = &err else {
        panic!("expected HookFailure, got {err:?}");
    };
    assert_eq!(*hook, LifecycleHook::Initialize);
    assert!(source.to_string().contains("mock initialize failure"));

    assert_eq!(registry.status("a").await, Some(PluginStatus::Error));
    assert!(registry.active_providers().await.is_empty());
    assert_eq!(
        *events.lock().unwrap(),
        vec!["plugin-registered:a", "plugin-error:a"]
    );

    let err = registry.activate("a").await.unwrap_err();
    assert!(matches!(
        err,
        CadenzaError::PluginUnavailable {
            status: PluginStatus::Error,
            ..
        }
    ));
}

#[tokio::test]
async fn unknown_ids_are_not_registered() {
    let registry = registry();
    for result in [
        registry.initialize("ghost").await,
        registry.activate("ghost").await,
        registry.deactivate("ghost").await,
        registry.unregister("ghost").await,
    ] {
        assert!(matches!(result, Err(CadenzaError::NotRegistered { .. })));
    }
}

#[tokio::test]
async fn auto_activate_emits_events_in_order() {
    let registry = registry();
    let events = record_events(&registry);
    let log = CallLog::new();
    registry
        .register(sync_plugin("a", &log), RegisterOptions::default().auto_activate())
        .await
        .unwrap();
    registry.initialize("a").await.unwrap();

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            "plugin-registered:a",
            "plugin-initialized:a",
            "plugin-activated:a"
        ]
    );
    assert_eq!(registry.status("a").await, Some(PluginStatus::Active));
}

#[tokio::test]
async fn activate_initializes_first() {
    let registry = registry();
    let log = CallLog::new();
    registry
        .register(sync_plugin("a", &log), RegisterOptions::default())
        .await
        .unwrap();
    registry.activate("a").await.unwrap();

    assert_eq!(log.entries(), vec!["a:initialize", "a:activate"]);
    assert_eq!(
        registry.active_plugin(PluginCategory::SyncProvider).await.unwrap().id(),
        "a"
    );

    registry.activate("a").await.unwrap();
    assert_eq!(log.entries().len(), 2, "re-activating is a no-op");
}

#[tokio::test]
async fn activating_replaces_previous_active_plugin() {
    let registry = registry();
    let log = CallLog::new();
    for id in ["a", "b"] {
        registry
            .register(sync_plugin(id, &log), RegisterOptions::default())
            .await
            .unwrap();
    }
    registry.activate("a").await.unwrap();
    registry.activate("b").await.unwrap();

    let deactivated = log.position("a:deactivate").unwrap();
    let activated = log.position("b:activate").unwrap();
    assert!(deactivated < activated);

    assert_eq!(registry.status("a").await, Some(PluginStatus::Ready));
    assert_eq!(registry.status("b").await, Some(PluginStatus::Active));
    assert_eq!(
        registry.active_providers().await.get(&PluginCategory::SyncProvider),
        Some(&"b".to_string())
    );
}

#[tokio::test]
async fn failed_deactivation_aborts_the_switch() {
    let registry = registry();
    let log = CallLog::new();
    let a = MockPlugin::new("a", PluginCategory::SyncProvider)
        .with_log(&log)
        .failing_on(LifecycleHook::Deactivate);
    registry.register(Arc::new(a), RegisterOptions::default()).await.unwrap();
    registry
        .register(sync_plugin("b", &log), RegisterOptions::default())
        .await
        .unwrap();
    registry.activate("a").await.unwrap();

    let err = registry.activate("b").await.unwrap_err();
    assert!(matches!(
        err,
        CadenzaError::HookFailure {
            hook: LifecycleHook::Deactivate,
            ..
        }
    ));
    assert!(log.position("b:activate").is_none());
    assert_eq!(
        registry.active_plugin(PluginCategory::SyncProvider).await.unwrap().id(),
        "a"
    );
}

#[tokio::test]
async fn failed_activation_leaves_category_empty() {
    let registry = registry();
    let events = record_events(&registry);
    let a = MockPlugin::new("a", PluginCategory::SyncProvider).failing_on(LifecycleHook::Activate);
    registry.register(Arc::new(a), RegisterOptions::default()).await.unwrap();

    assert!(registry.activate("a").await.is_err());
    assert_eq!(registry.status("a").await, Some(PluginStatus::Error));
    assert!(registry.active_plugin(PluginCategory::SyncProvider).await.is_none());
    assert!(events.lock().unwrap().contains(&"plugin-error:a".to_string()));
}

#[tokio::test]
async fn deactivate_is_noop_unless_active() {
    let registry = registry();
    let events = record_events(&registry);
    let log = CallLog::new();
    registry
        .register(sync_plugin("a", &log), RegisterOptions::default())
        .await
        .unwrap();
    registry.deactivate("a").await.unwrap();
    assert!(log.entries().is_empty());

    registry.activate("a").await.unwrap();
    registry.deactivate("a").await.unwrap();
    assert_eq!(registry.status("a").await, Some(PluginStatus::Ready));
    assert!(registry.active_providers().await.is_empty());
    assert_eq!(
        events.lock().unwrap().last().map(String::as_str),
        Some("plugin-deactivated:a")
    );
}

#[tokio::test]
async fn register_then_unregister_round_trips() {
    let registry = registry();
    let events = record_events(&registry);
    let log = CallLog::new();
    registry
        .register(sync_plugin("a", &log), RegisterOptions::default())
        .await
        .unwrap();
    registry.activate("a").await.unwrap();
    registry.unregister("a").await.unwrap();

    assert!(registry.is_empty().await);
    assert!(registry.active_providers().await.is_empty());
    assert_eq!(log.entries(), vec!["a:initialize", "a:activate", "a:deactivate", "a:destroy"]);
    assert_eq!(
        *events.lock().unwrap(),
        vec![
            "plugin-registered:a",
            "plugin-initialized:a",
            "plugin-activated:a",
            "plugin-deactivated:a",
            "plugin-unregistered:a"
        ]
    );

    // The id is free again.
    registry
        .register(sync_plugin("a", &log), RegisterOptions::default())
        .await
        .unwrap();
}

#[tokio::test]
#[tracing_test::traced_test]
async fn destroy_failure_still_removes_plugin() {
    let registry = registry();
    let events = record_events(&registry);
    let a = MockPlugin::new("a", PluginCategory::SyncProvider).failing_on(LifecycleHook::Destroy);
    registry.register(Arc::new(a), RegisterOptions::default()).await.unwrap();

    let err = registry.unregister("a").await.unwrap_err();
    assert!(matches!(err, CadenzaError::DestroyFailed { ref plugin_id, .. } if plugin_id == "a"));
    assert!(!registry.is_registered("a").await);
    assert_eq!(
        *events.lock().unwrap(),
        vec!["plugin-registered:a", "plugin-error:a", "plugin-unregistered:a"]
    );
    assert!(logs_contain("resources may have leaked"));
}

#[tokio::test]
async fn disable_and_enable() {
    let registry = registry();
    let log = CallLog::new();
    registry
        .register(sync_plugin("a", &log), RegisterOptions::default())
        .await
        .unwrap();
    registry
        .register(sync_plugin("b", &log), RegisterOptions::default())
        .await
        .unwrap();
    registry.activate("a").await.unwrap();

    registry.disable("a").await.unwrap();
    registry.disable("b").await.unwrap();
    assert_eq!(registry.status("a").await, Some(PluginStatus::Disabled));
    assert!(registry.active_providers().await.is_empty());
    assert!(matches!(
        registry.activate("a").await,
        Err(CadenzaError::PluginUnavailable {
            status: PluginStatus::Disabled,
            ..
        })
    ));

    registry.enable("a").await.unwrap();
    registry.enable("b").await.unwrap();
    assert_eq!(registry.status("a").await, Some(PluginStatus::Ready));
    assert_eq!(registry.status("b").await, Some(PluginStatus::Uninitialized));
    registry.activate("a").await.unwrap();
}

#[tokio::test]
async fn queries_order_by_priority_then_registration() {
    let registry = registry();
    let log = CallLog::new();
    for (id, priority) in [("first", 5), ("second", 10), ("third", 5)] {
        registry
            .register(
                sync_plugin(id, &log),
                RegisterOptions::default().with_priority(priority),
            )
            .await
            .unwrap();
    }
    registry
        .register(
            Arc::new(MockPlugin::new("engine", PluginCategory::PlaybackProvider)),
            RegisterOptions::default().with_priority(100),
        )
        .await
        .unwrap();

    let by_category: Vec<String> = registry
        .get_plugins_by_category(PluginCategory::SyncProvider)
        .await
        .iter()
        .map(|e| e.id().to_string())
        .collect();
    assert_eq!(by_category, vec!["second", "first", "third"]);

    let all: Vec<String> = registry
        .get_all_plugins()
        .await
        .iter()
        .map(|e| e.id().to_string())
        .collect();
    assert_eq!(all, vec!["first", "second", "third", "engine"]);
    assert!(registry.get_plugin("engine").await.is_some());
}

#[tokio::test]
async fn yt_then_local_metadata_scenario() {
    let registry = registry();
    let events = record_events(&registry);
    let metadata = ProviderAccessor::<MetadataCategory>::new(Arc::clone(&registry));

    registry
        .register(
            Arc::new(MockMetadata::new("yt", vec![])),
            RegisterOptions::default().with_priority(10).auto_activate(),
        )
        .await
        .unwrap();
    registry.initialize("yt").await.unwrap();
    assert_eq!(metadata.get_active().await.unwrap().id(), "yt");

    registry
        .register(
            Arc::new(MockMetadata::new("local", vec![])),
            RegisterOptions::default().with_priority(5).auto_activate(),
        )
        .await
        .unwrap();
    registry.activate("local").await.unwrap();
    assert_eq!(metadata.get_active().await.unwrap().id(), "local");

    let events = events.lock().unwrap().clone();
    let deactivated = events.iter().position(|e| e == "plugin-deactivated:yt").unwrap();
    let activated = events.iter().position(|e| e == "plugin-activated:local").unwrap();
    assert!(deactivated < activated);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_activations_leave_one_active() {
    let registry = registry();
    let log = CallLog::new();
    let ids: Vec<String> = (0..8).map(|i| format!("p{i}")).collect();
    for id in &ids {
        registry
            .register(
                Arc::new(
                    MockPlugin::new(id, PluginCategory::SyncProvider)
                        .with_log(&log)
                        .with_hook_delay(Duration::from_millis(2)),
                ),
                RegisterOptions::default(),
            )
            .await
            .unwrap();
    }

    let tasks: Vec<_> = ids
        .iter()
        .map(|id| {
            let registry = Arc::clone(&registry);
            let id = id.clone();
            tokio::spawn(async move { registry.activate(&id).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let active: Vec<_> = registry
        .get_all_plugins()
        .await
        .into_iter()
        .filter(|e| e.status == PluginStatus::Active)
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(
        registry.active_providers().await[&PluginCategory::SyncProvider],
        active[0].id()
    );
}

#[tokio::test]
async fn dispose_unregisters_everything() {
    let bus = EventBus::new();
    let registry = PluginRegistry::new(bus.clone());
    let log = CallLog::new();
    registry
        .register(sync_plugin("a", &log), RegisterOptions::default())
        .await
        .unwrap();
    let failing = MockPlugin::new("b", PluginCategory::AudioSource)
        .with_log(&log)
        .failing_on(LifecycleHook::Destroy);
    registry.register(Arc::new(failing), RegisterOptions::default()).await.unwrap();
    registry
        .register(sync_plugin("c", &log), RegisterOptions::default())
        .await
        .unwrap();
    registry.activate("a").await.unwrap();
    let _sub = registry.on(|_| {});

    registry.dispose().await;

    assert!(registry.is_empty().await);
    assert!(registry.active_providers().await.is_empty());
    assert_eq!(log.matching("").iter().filter(|e| e.ends_with(":destroy")).count(), 3);
    assert_eq!(bus.listener_count("plugin-registered"), 0);
}
