#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Integration tests for `AppStateBuilder`, the JSON adapters and the startup sequence.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use larder_app::adapters::{JsonProfileRepository, JsonSettingsStore, PROFILES_FILE, SETTINGS_FILE};
use larder_app::{AppState, AppStateBuilder};
use larder_core::error::CoreError;
use larder_core::services::DEFAULT_PROFILE_NAME;
use larder_core::traits::SettingsStore;
use larder_core::types::{
    AppSettings, BackendConfig, BackendType, CreateProfileRequest, SettingsProfile,
};
use wiremock::matchers::{header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn build_app_state(dir: &std::path::Path) -> AppState {
    AppStateBuilder::new()
        .data_dir(dir)
        .build()
        .expect("failed to build AppState")
}

fn config_for(backend: BackendType, base_url: &str) -> BackendConfig {
    let mut config = BackendConfig::defaults_for(backend);
    config.base_url = base_url.to_string();
    config.api_key = "test-key".to_string();
    if backend == BackendType::Firestore {
        config.project_id = "larder-test".to_string();
    }
    config
}

fn read_settings_file(dir: &std::path::Path) -> AppSettings {
    let raw = std::fs::read_to_string(dir.join(SETTINGS_FILE)).expect("settings file missing");
    serde_json::from_str(&raw).expect("settings file is not valid JSON")
}

fn read_profiles_file(dir: &std::path::Path) -> Vec<SettingsProfile> {
    let raw = std::fs::read_to_string(dir.join(PROFILES_FILE)).expect("profiles file missing");
    serde_json::from_str(&raw).expect("profiles file is not valid JSON")
}

// ===== Builder =====

#[tokio::test]
async fn builder_with_all_required_adapters_succeeds() {
    let tmp = tempfile::tempdir().unwrap();
    let state = AppStateBuilder::new()
        .settings_store(Arc::new(JsonSettingsStore::new(tmp.path())))
        .profile_repository(Arc::new(JsonProfileRepository::new(tmp.path())))
        .build();
    assert!(state.is_ok());
    assert!(!state.unwrap().is_ready());
}

#[tokio::test]
async fn builder_missing_settings_store_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let result = AppStateBuilder::new()
        .profile_repository(Arc::new(JsonProfileRepository::new(tmp.path())))
        .build();
    match result {
        Err(CoreError::ValidationError(msg)) => assert!(msg.contains("settings_store")),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("build should fail without a settings store"),
    }
}

#[tokio::test]
async fn builder_missing_profile_repository_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let result = AppStateBuilder::new()
        .settings_store(Arc::new(JsonSettingsStore::new(tmp.path())))
        .build();
    assert!(matches!(result, Err(CoreError::ValidationError(msg)) if msg.contains("profile_repository")));
}

// ===== Startup =====

#[tokio::test]
async fn fresh_install_gets_active_default_profile() {
    let tmp = tempfile::tempdir().unwrap();
    let state = build_app_state(tmp.path());

    let profile = state.run_startup().await.unwrap();

    assert!(state.is_ready());
    assert_eq!(profile.name, DEFAULT_PROFILE_NAME);
    assert!(profile.is_active);
    let on_disk = read_settings_file(tmp.path());
    assert_eq!(on_disk.active_profile_id, Some(profile.id.clone()));
    assert!(!on_disk.is_configured());
    assert_eq!(read_profiles_file(tmp.path()), vec![profile]);
}

#[tokio::test]
async fn restart_keeps_settings_and_profiles() {
    let tmp = tempfile::tempdir().unwrap();
    let first = build_app_state(tmp.path());
    first.run_startup().await.unwrap();
    let work = first
        .profile_service
        .create_profile(CreateProfileRequest {
            name: "Work".to_string(),
            description: Some("office pantry".to_string()),
            config: config_for(BackendType::Firestore, "https://firestore.example.test/v1"),
        })
        .await
        .unwrap();
    first.profile_service.activate_profile(&work.id).await.unwrap();
    let before = first.settings.instance().await;
    drop(first);

    let second = build_app_state(tmp.path());
    let active = second.run_startup().await.unwrap();

    assert_eq!(active.id, work.id);
    assert_eq!(*second.settings.instance().await, *before);
    let names: Vec<String> = second
        .profile_service
        .list_profiles()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec![DEFAULT_PROFILE_NAME.to_string(), "Work".to_string()]);
}

#[tokio::test]
async fn corrupt_settings_file_falls_back_to_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join(SETTINGS_FILE), "{ definitely not json").unwrap();
    let state = build_app_state(tmp.path());

    let settings = state.settings.instance().await;
    assert_eq!(*settings, AppSettings::default());
    assert!(!state.settings.is_durable());

    // 启动时重新写入一份有效的设置
    state.run_startup().await.unwrap();
    assert!(state.settings.is_durable());
    read_settings_file(tmp.path());
}

// ===== Profiles & settings =====

#[tokio::test]
async fn work_profile_scenario_notifies_once() {
    let tmp = tempfile::tempdir().unwrap();
    let state = build_app_state(tmp.path());
    state.run_startup().await.unwrap();

    let notified = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notified);
    state.settings.on_change(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let mut events = state.settings.subscribe();

    let work = state
        .profile_service
        .create_profile(CreateProfileRequest {
            name: "Work Profile".to_string(),
            description: None,
            config: config_for(BackendType::Hasura, "https://work.hasura.example.test/v1/graphql"),
        })
        .await
        .unwrap();
    state.profile_service.activate_profile(&work.id).await.unwrap();

    let settings = state.settings.instance().await;
    assert_eq!(settings.backend_type(), BackendType::Hasura);
    assert_eq!(settings.config.base_url, work.config.base_url);
    assert_eq!(notified.load(Ordering::SeqCst), 1);
    assert!(events.try_changed().is_some());
    assert_eq!(events.try_changed(), None);
    assert_eq!(read_settings_file(tmp.path()).backend_type(), BackendType::Hasura);

    let service = state.backend_factory.create_current_service().await.unwrap();
    assert_eq!(service.service_type(), BackendType::Hasura);
}

#[tokio::test]
async fn deleting_active_profile_falls_back() {
    let tmp = tempfile::tempdir().unwrap();
    let state = build_app_state(tmp.path());
    let default = state.run_startup().await.unwrap();
    let travel = state
        .profile_service
        .create_profile(CreateProfileRequest {
            name: "Travel".to_string(),
            description: None,
            config: config_for(BackendType::Supabase, "https://travel.supabase.example.test"),
        })
        .await
        .unwrap();
    state.profile_service.activate_profile(&travel.id).await.unwrap();

    let fallback = state
        .profile_service
        .delete_profile(&travel.id)
        .await
        .unwrap()
        .expect("a fallback profile should be activated");

    assert_eq!(fallback.id, default.id);
    let on_disk = read_settings_file(tmp.path());
    assert_eq!(on_disk.active_profile_id, Some(default.id));
    assert_eq!(on_disk.config, default.config);
    assert_eq!(read_profiles_file(tmp.path()).len(), 1);
}

#[tokio::test]
async fn save_then_reload_is_field_for_field_equal() {
    let tmp = tempfile::tempdir().unwrap();
    let state = build_app_state(tmp.path());
    let updated = state
        .settings
        .update(|s| {
            s.config = config_for(BackendType::Firestore, "https://firestore.example.test/v1");
            s.request_timeout_secs = 12;
            s.max_retries = 5;
        })
        .await
        .unwrap();

    state.settings.save().await.unwrap();
    let reloaded = state.settings.reload_settings().await.unwrap();
    assert_eq!(*reloaded, *updated);
}

#[tokio::test]
async fn reload_picks_up_file_edited_elsewhere() {
    let tmp = tempfile::tempdir().unwrap();
    let state = build_app_state(tmp.path());
    state.run_startup().await.unwrap();
    let mut events = state.settings.subscribe();

    let other_process = JsonSettingsStore::new(tmp.path());
    let mut edited = AppSettings::default();
    edited.config.backend = BackendType::Firestore;
    other_process.save(&edited).await.unwrap();

    let reloaded = state.settings.reload_settings().await.unwrap();
    assert_eq!(reloaded.backend_type(), BackendType::Firestore);
    assert!(events.changed().await.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_saves_leave_parseable_file() {
    let tmp = tempfile::tempdir().unwrap();
    let state = Arc::new(build_app_state(tmp.path()));
    let raw_store = Arc::new(JsonSettingsStore::new(tmp.path()));

    let mut handles = Vec::new();
    for i in 0..16_u32 {
        let state = Arc::clone(&state);
        handles.push(tokio::spawn(async move {
            state
                .settings
                .update(move |s| s.max_retries = i)
                .await
                .map(|_| ())
        }));
        // 绕过管理器的锁，直接并发写文件
        let raw_store = Arc::clone(&raw_store);
        handles.push(tokio::spawn(async move {
            let settings = AppSettings {
                max_retries: 100 + i,
                ..AppSettings::default()
            };
            raw_store.save(&settings).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let on_disk = read_settings_file(tmp.path());
    assert!(on_disk.max_retries < 116);
    let leftovers: Vec<_> = std::fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
}

// ===== Backend =====

#[tokio::test]
async fn connection_check_uses_active_profile() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/foods"))
        .and(query_param("limit", "1"))
        .and(header("apikey", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex("^/rest/v1/?$"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let state = build_app_state(tmp.path());
    state.run_startup().await.unwrap();
    let unconfigured = state.backend_factory.check_connection().await.unwrap();
    assert!(!unconfigured.healthy);

    let local = state
        .profile_service
        .create_profile(CreateProfileRequest {
            name: "Local".to_string(),
            description: None,
            config: config_for(BackendType::Supabase, &server.uri()),
        })
        .await
        .unwrap();
    state.profile_service.activate_profile(&local.id).await.unwrap();

    let check = state.backend_factory.check_connection().await.unwrap();
    assert!(check.healthy, "unexpected failure: {:?}", check.error);
}

#[test]
fn available_backends_are_listed() {
    let tmp = tempfile::tempdir().unwrap();
    let state = build_app_state(tmp.path());
    let backends: Vec<BackendType> = state
        .backend_factory
        .available_backends()
        .into_iter()
        .map(|m| m.backend)
        .collect();
    assert_eq!(backends, BackendType::ALL.to_vec());
}
