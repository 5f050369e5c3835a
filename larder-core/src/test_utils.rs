//! 测试辅助模块
//!
//! 提供 mock 实现和便捷的测试工厂方法。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use larder_provider::{BackendConfig, BackendType};

use crate::error::{CoreError, CoreResult};
use crate::services::{ServiceContext, SettingsProfileService};
use crate::settings::SettingsManager;
use crate::traits::{ProfileRepository, SettingsStore};
use crate::types::{AppSettings, CreateProfileRequest, SettingsProfile};

// ===== MockSettingsStore =====

pub struct MockSettingsStore {
    stored: Mutex<Option<AppSettings>>,
    load_error: Mutex<Option<String>>,
    /// 如果 Some，save 时返回此错误
    save_error: Mutex<Option<String>>,
    loads: AtomicUsize,
    saves: AtomicUsize,
}

impl MockSettingsStore {
    pub fn new() -> Self {
        Self {
            stored: Mutex::new(None),
            load_error: Mutex::new(None),
            save_error: Mutex::new(None),
            loads: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn with_settings(settings: AppSettings) -> Self {
        let store = Self::new();
        store.put(settings);
        store
    }

    /// Changes the stored value behind the manager's back.
    pub fn put(&self, settings: AppSettings) {
        *self.stored.lock().unwrap() = Some(settings);
    }

    pub fn saved(&self) -> Option<AppSettings> {
        self.stored.lock().unwrap().clone()
    }

    pub fn set_load_error(&self, err: Option<String>) {
        *self.load_error.lock().unwrap() = err;
    }

    pub fn set_save_error(&self, err: Option<String>) {
        *self.save_error.lock().unwrap() = err;
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettingsStore for MockSettingsStore {
    async fn load(&self) -> CoreResult<Option<AppSettings>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = self.load_error.lock().unwrap().clone() {
            return Err(CoreError::StorageError(msg));
        }
        Ok(self.stored.lock().unwrap().clone())
    }

    async fn save(&self, settings: &AppSettings) -> CoreResult<()> {
        if let Some(msg) = self.save_error.lock().unwrap().clone() {
            return Err(CoreError::StorageError(msg));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.stored.lock().unwrap() = Some(settings.clone());
        Ok(())
    }
}

// ===== MockProfileRepository =====

pub struct MockProfileRepository {
    profiles: tokio::sync::RwLock<Vec<SettingsProfile>>,
    /// 如果 Some，save/save_all 时返回此错误（用于测试回滚路径）
    save_error: tokio::sync::RwLock<Option<String>>,
}

impl MockProfileRepository {
    pub fn new() -> Self {
        Self {
            profiles: tokio::sync::RwLock::new(Vec::new()),
            save_error: tokio::sync::RwLock::new(None),
        }
    }

    pub async fn set_save_error(&self, err: Option<String>) {
        *self.save_error.write().await = err;
    }

    async fn check_save_error(&self) -> CoreResult<()> {
        match &*self.save_error.read().await {
            Some(msg) => Err(CoreError::StorageError(msg.clone())),
            None => Ok(()),
        }
    }
}

fn upsert(store: &mut Vec<SettingsProfile>, profile: &SettingsProfile) {
    match store.iter_mut().find(|p| p.id == profile.id) {
        Some(existing) => *existing = profile.clone(),
        None => store.push(profile.clone()),
    }
}

#[async_trait]
impl ProfileRepository for MockProfileRepository {
    async fn find_all(&self) -> CoreResult<Vec<SettingsProfile>> {
        Ok(self.profiles.read().await.clone())
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<SettingsProfile>> {
        Ok(self
            .profiles
            .read()
            .await
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn save(&self, profile: &SettingsProfile) -> CoreResult<()> {
        self.check_save_error().await?;
        upsert(&mut *self.profiles.write().await, profile);
        Ok(())
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        self.profiles.write().await.retain(|p| p.id != id);
        Ok(())
    }

    async fn save_all(&self, profiles: &[SettingsProfile]) -> CoreResult<()> {
        self.check_save_error().await?;
        let mut store = self.profiles.write().await;
        for profile in profiles {
            upsert(&mut store, profile);
        }
        Ok(())
    }
}

// ===== 工厂函数 =====

/// Settings that pass `is_configured` for `backend`.
pub fn configured_settings(backend: BackendType) -> AppSettings {
    AppSettings {
        config: configured_config(backend),
        ..AppSettings::default()
    }
}

pub fn configured_config(backend: BackendType) -> BackendConfig {
    let mut config = BackendConfig::defaults_for(backend);
    config.base_url = format!("https://{backend}.example.test");
    config.api_key = format!("{backend}-key");
    if backend == BackendType::Firestore {
        config.project_id = "larder-test".to_string();
    }
    config
}

pub fn create_request(name: &str, backend: BackendType) -> CreateProfileRequest {
    CreateProfileRequest {
        name: name.to_string(),
        description: None,
        config: configured_config(backend),
    }
}

pub struct TestHarness {
    pub settings_store: Arc<MockSettingsStore>,
    pub repository: Arc<MockProfileRepository>,
    pub settings: Arc<SettingsManager>,
    pub ctx: Arc<ServiceContext>,
}

impl TestHarness {
    pub fn new() -> Self {
        let settings_store = Arc::new(MockSettingsStore::new());
        let repository = Arc::new(MockProfileRepository::new());
        let settings = Arc::new(SettingsManager::new(
            Arc::clone(&settings_store) as Arc<dyn SettingsStore>
        ));
        let ctx = Arc::new(ServiceContext::new(
            Arc::clone(&settings),
            Arc::clone(&repository) as Arc<dyn ProfileRepository>,
        ));
        Self {
            settings_store,
            repository,
            settings,
            ctx,
        }
    }

    pub fn profile_service(&self) -> SettingsProfileService {
        SettingsProfileService::new(Arc::clone(&self.ctx))
    }
}
