//! 配置档案（Settings Profile）相关类型

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use larder_provider::BackendConfig;

use crate::error::{CoreError, CoreResult};

/// Longest accepted profile name, in characters.
pub const MAX_PROFILE_NAME_CHARS: usize = 100;

/// 命名的后端配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SettingsProfile {
    /// Profile ID (UUID v4)
    pub id: String,
    /// 名称（1..=100 字符，已去除首尾空白）
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// 激活时复制到 `AppSettings` 的后端配置
    pub config: BackendConfig,
    #[serde(default)]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SettingsProfile {
    /// Builds a new inactive profile. `name` must already be validated.
    pub(crate) fn new(name: String, description: String, config: BackendConfig) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            description,
            config,
            is_active: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Bumps `updated_at`, never moving it backwards.
    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.updated_at);
    }
}

/// Trims and checks a profile name.
pub(crate) fn validate_profile_name(name: &str) -> CoreResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::ValidationError(
            "Profile name cannot be empty".to_string(),
        ));
    }
    let chars = trimmed.chars().count();
    if chars > MAX_PROFILE_NAME_CHARS {
        return Err(CoreError::ValidationError(format!(
            "Profile name is {chars} characters, the limit is {MAX_PROFILE_NAME_CHARS}"
        )));
    }
    Ok(trimmed.to_string())
}

/// 创建 Profile 请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub config: BackendConfig,
}

/// 更新 Profile 请求，`None` 字段保持不变
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub config: Option<BackendConfig>,
}

/// Point-in-time view of the profile list.
///
/// Iterating does not touch storage, and the snapshot can be iterated any
/// number of times.
#[derive(Debug, Clone, Default)]
pub struct ProfileSnapshot {
    profiles: Arc<Vec<SettingsProfile>>,
}

impl ProfileSnapshot {
    pub(crate) fn new(profiles: Vec<SettingsProfile>) -> Self {
        Self {
            profiles: Arc::new(profiles),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SettingsProfile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl<'a> IntoIterator for &'a ProfileSnapshot {
    type Item = &'a SettingsProfile;
    type IntoIter = std::slice::Iter<'a, SettingsProfile>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
