//! 设置存储
//!
//! 使用 JSON 文件存储 `AppSettings`
//! 实现 larder-core 的 SettingsStore trait

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use larder_core::types::AppSettings;
use larder_core::{CoreResult, SettingsStore};

use super::json_file::{default_data_dir, JsonFile};

/// 设置文件名
pub const SETTINGS_FILE: &str = "settings.json";

/// 基于 JSON 文件的设置存储
pub struct JsonSettingsStore {
    file: JsonFile,
}

impl JsonSettingsStore {
    /// Store at `<dir>/settings.json`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self::at_path(dir.as_ref().join(SETTINGS_FILE))
    }

    pub fn at_path(path: PathBuf) -> Self {
        Self {
            file: JsonFile::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl Default for JsonSettingsStore {
    fn default() -> Self {
        Self::new(default_data_dir())
    }
}

#[async_trait]
impl SettingsStore for JsonSettingsStore {
    async fn load(&self) -> CoreResult<Option<AppSettings>> {
        self.file.read().await
    }

    async fn save(&self, settings: &AppSettings) -> CoreResult<()> {
        self.file.write(settings).await
    }
}
