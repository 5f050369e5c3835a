//! Settings persistence abstract Trait

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::AppSettings;

/// Settings persistence Trait
///
/// Platform implementation:
/// - `larder-app`: `JsonSettingsStore` (`settings.json` under the user data dir)
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Load persisted settings
    ///
    /// Returns `Ok(None)` when nothing has been saved yet.
    async fn load(&self) -> CoreResult<Option<AppSettings>>;

    /// Persist settings, replacing what was stored
    ///
    /// Implementations must never leave a partially written document behind.
    async fn save(&self, settings: &AppSettings) -> CoreResult<()>;
}
