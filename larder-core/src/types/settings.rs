//! 应用设置

use serde::{Deserialize, Serialize};

use larder_provider::{BackendConfig, BackendType, ClientOptions};

/// Process-wide settings: the active backend configuration plus global
/// preferences.
///
/// Persisted as one flat JSON object. Every field has a default, so files
/// written by older or newer versions still load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// 当前后端配置（平铺到顶层）
    #[serde(flatten)]
    pub config: BackendConfig,
    /// 当前激活的 profile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_profile_id: Option<String>,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 瞬时错误的重试次数
    pub max_retries: u32,
}

impl AppSettings {
    pub fn backend_type(&self) -> BackendType {
        self.config.backend
    }

    /// True iff every field the selected backend needs is non-empty.
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            request_timeout_secs: self.request_timeout_secs,
            max_retries: self.max_retries,
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        let options = ClientOptions::default();
        Self {
            config: BackendConfig::default(),
            active_profile_id: None,
            request_timeout_secs: options.request_timeout_secs,
            max_retries: options.max_retries,
        }
    }
}
