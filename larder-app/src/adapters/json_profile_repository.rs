//! Profile 仓库
//!
//! 使用 JSON 文件存储配置档案列表
//! 实现 larder-core 的 ProfileRepository trait

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use larder_core::types::SettingsProfile;
use larder_core::{CoreResult, ProfileRepository};
use tokio::sync::Mutex;

use super::json_file::{default_data_dir, JsonFile};

/// Profile 文件名
pub const PROFILES_FILE: &str = "profiles.json";

/// 基于 JSON 文件的 Profile 仓库
///
/// 第一次访问时加载文件，之后读写都经过内存缓存；锁在整个
/// 读-改-写期间持有，写入彼此串行。
pub struct JsonProfileRepository {
    file: JsonFile,
    /// 内存缓存（None 表示尚未加载）
    cache: Mutex<Option<Vec<SettingsProfile>>>,
}

impl JsonProfileRepository {
    /// Repository at `<dir>/profiles.json`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self::at_path(dir.as_ref().join(PROFILES_FILE))
    }

    pub fn at_path(path: PathBuf) -> Self {
        Self {
            file: JsonFile::new(path),
            cache: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Runs `f` against the cached list, loading it first if needed.
    /// When `f` returns `true` the list is written back before the cache is
    /// updated, so a failed write leaves the cache untouched.
    async fn modify<F>(&self, f: F) -> CoreResult<()>
    where
        F: FnOnce(&mut Vec<SettingsProfile>) -> bool + Send,
    {
        let mut cache = self.cache.lock().await;
        let mut profiles = match cache.as_ref() {
            Some(profiles) => profiles.clone(),
            None => self.file.read().await?.unwrap_or_default(),
        };
        if f(&mut profiles) {
            self.file.write(&profiles).await?;
        }
        *cache = Some(profiles);
        Ok(())
    }

    async fn snapshot(&self) -> CoreResult<Vec<SettingsProfile>> {
        let mut cache = self.cache.lock().await;
        if let Some(profiles) = cache.as_ref() {
            return Ok(profiles.clone());
        }
        let profiles: Vec<SettingsProfile> = self.file.read().await?.unwrap_or_default();
        *cache = Some(profiles.clone());
        Ok(profiles)
    }
}

impl Default for JsonProfileRepository {
    fn default() -> Self {
        Self::new(default_data_dir())
    }
}

fn upsert(profiles: &mut Vec<SettingsProfile>, profile: &SettingsProfile) {
    if let Some(pos) = profiles.iter().position(|p| p.id == profile.id) {
        profiles[pos] = profile.clone();
    } else {
        profiles.push(profile.clone());
    }
}

#[async_trait]
impl ProfileRepository for JsonProfileRepository {
    async fn find_all(&self) -> CoreResult<Vec<SettingsProfile>> {
        self.snapshot().await
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<SettingsProfile>> {
        Ok(self.snapshot().await?.into_iter().find(|p| p.id == id))
    }

    async fn save(&self, profile: &SettingsProfile) -> CoreResult<()> {
        self.modify(|profiles| {
            upsert(profiles, profile);
            true
        })
        .await
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        self.modify(|profiles| {
            let before = profiles.len();
            profiles.retain(|p| p.id != id);
            profiles.len() != before
        })
        .await
    }

    async fn save_all(&self, profiles: &[SettingsProfile]) -> CoreResult<()> {
        self.modify(|stored| {
            for profile in profiles {
                upsert(stored, profile);
            }
            true
        })
        .await
    }
}
