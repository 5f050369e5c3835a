//! Platform-agnostic application bootstrap for the larder tracker.
//!
//! Provides `AppState` (service container), `AppStateBuilder` (adapter
//! injection) and the JSON file adapters in [`adapters`].

pub mod adapters;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use larder_core::error::{CoreError, CoreResult};
use larder_core::services::{BackendServiceFactory, ServiceContext, SettingsProfileService};
use larder_core::settings::SettingsManager;
use larder_core::traits::{ProfileRepository, SettingsStore};
use larder_core::types::SettingsProfile;

use crate::adapters::{JsonProfileRepository, JsonSettingsStore};

/// Platform-agnostic application state.
///
/// Every frontend constructs this once at startup via `AppStateBuilder`.
pub struct AppState {
    /// Service context (holds the settings manager and storage adapters)
    pub ctx: Arc<ServiceContext>,
    /// Process-wide settings
    pub settings: Arc<SettingsManager>,
    /// Profile service
    pub profile_service: Arc<SettingsProfileService>,
    /// Builds the adapter for the active backend
    pub backend_factory: BackendServiceFactory,
    /// Whether the startup sequence has completed
    pub startup_completed: AtomicBool,
}

impl AppState {
    /// Run the startup sequence: load settings, then make sure one profile
    /// is active. Returns the active profile.
    pub async fn run_startup(&self) -> CoreResult<SettingsProfile> {
        let settings = self.settings.instance().await;
        if !self.settings.is_durable() {
            log::warn!("Settings could not be loaded, continuing with defaults");
        }

        let profile = match self.profile_service.ensure_default_profile().await {
            Ok(profile) => profile,
            Err(e) => {
                e.log("Failed to prepare default profile");
                return Err(e);
            }
        };

        if settings.is_configured() {
            log::info!(
                "Startup complete: profile {:?} on {}",
                profile.name,
                profile.config.backend
            );
        } else {
            log::info!(
                "Startup complete: profile {:?} is not configured yet",
                profile.name
            );
        }
        self.startup_completed.store(true, Ordering::SeqCst);
        Ok(profile)
    }

    pub fn is_ready(&self) -> bool {
        self.startup_completed.load(Ordering::SeqCst)
    }
}

/// Builder for constructing `AppState` with platform-specific adapters.
///
/// # Required adapters
/// - `settings_store` — where `AppSettings` is persisted
/// - `profile_repository` — where profiles are persisted
///
/// [`data_dir`](Self::data_dir) sets both to the JSON file adapters.
pub struct AppStateBuilder {
    settings_store: Option<Arc<dyn SettingsStore>>,
    profile_repository: Option<Arc<dyn ProfileRepository>>,
}

impl AppStateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            settings_store: None,
            profile_repository: None,
        }
    }

    #[must_use]
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    #[must_use]
    pub fn profile_repository(mut self, repo: Arc<dyn ProfileRepository>) -> Self {
        self.profile_repository = Some(repo);
        self
    }

    /// JSON file storage under `dir` (`settings.json` and `profiles.json`).
    #[must_use]
    pub fn data_dir(self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        self.settings_store(Arc::new(JsonSettingsStore::new(dir)))
            .profile_repository(Arc::new(JsonProfileRepository::new(dir)))
    }

    /// JSON file storage under the per-user data directory.
    #[must_use]
    pub fn default_data_dir(self) -> Self {
        self.data_dir(adapters::default_data_dir())
    }

    /// Build the `AppState`.
    ///
    /// # Errors
    /// Returns `CoreError::ValidationError` if required adapters are missing.
    pub fn build(self) -> CoreResult<AppState> {
        let settings_store = self.settings_store.ok_or_else(|| {
            CoreError::ValidationError("settings_store is required".to_string())
        })?;
        let profile_repository = self.profile_repository.ok_or_else(|| {
            CoreError::ValidationError("profile_repository is required".to_string())
        })?;

        let settings = Arc::new(SettingsManager::new(settings_store));
        let ctx = Arc::new(ServiceContext::new(
            Arc::clone(&settings),
            profile_repository,
        ));
        let profile_service = Arc::new(SettingsProfileService::new(Arc::clone(&ctx)));
        let backend_factory = BackendServiceFactory::new(Arc::clone(&settings));

        Ok(AppState {
            ctx,
            settings,
            profile_service,
            backend_factory,
            startup_completed: AtomicBool::new(false),
        })
    }
}

impl Default for AppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
