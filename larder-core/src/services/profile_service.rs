//! Settings profile service
//!
//! Owns the profile collection and is the only writer of the active-profile
//! marker. Activating a profile copies its backend config into
//! [`AppSettings`](crate::types::AppSettings), which notifies subscribers.

use std::sync::Arc;

use larder_provider::BackendConfig;

use crate::error::{CoreError, CoreResult};
use crate::services::ServiceContext;
use crate::types::{
    validate_profile_name, CreateProfileRequest, ProfileSnapshot, SettingsProfile,
    UpdateProfileRequest,
};

/// Name of the profile created when none exists.
pub const DEFAULT_PROFILE_NAME: &str = "Default";

/// Settings profile service
pub struct SettingsProfileService {
    ctx: Arc<ServiceContext>,
    /// 串行化所有写操作，保证激活标记一致
    write_lock: tokio::sync::Mutex<()>,
}

impl SettingsProfileService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self {
            ctx,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    // ===== 查询 =====

    /// All profiles in insertion order
    pub async fn list_profiles(&self) -> CoreResult<Vec<SettingsProfile>> {
        self.ctx.profile_repository().find_all().await
    }

    /// Snapshot of the profile list that can be iterated repeatedly
    pub async fn profiles(&self) -> CoreResult<ProfileSnapshot> {
        Ok(ProfileSnapshot::new(self.list_profiles().await?))
    }

    pub async fn get_profile(&self, id: &str) -> CoreResult<SettingsProfile> {
        self.ctx
            .profile_repository()
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::ProfileNotFound(id.to_string()))
    }

    /// Profile named by `AppSettings::active_profile_id`, falling back to the
    /// one carrying the active marker.
    pub async fn active_profile(&self) -> CoreResult<Option<SettingsProfile>> {
        let settings = self.ctx.settings().instance().await;
        let profiles = self.list_profiles().await?;
        let by_settings = settings
            .active_profile_id
            .as_deref()
            .and_then(|id| profiles.iter().find(|p| p.id == id));
        Ok(by_settings
            .or_else(|| profiles.iter().find(|p| p.is_active))
            .cloned())
    }

    // ===== 写操作 =====

    /// Creates an inactive profile and appends it to the list.
    ///
    /// # Errors
    /// `ValidationError` when the trimmed name is empty or longer than 100
    /// characters; nothing is stored in that case.
    pub async fn create_profile(&self, request: CreateProfileRequest) -> CoreResult<SettingsProfile> {
        let name = validate_profile_name(&request.name)?;
        let _guard = self.write_lock.lock().await;

        let profile = SettingsProfile::new(
            name,
            request.description.unwrap_or_default(),
            request.config,
        );
        self.ctx.profile_repository().save(&profile).await?;
        log::info!("Created profile {} ({})", profile.id, profile.name);
        Ok(profile)
    }

    /// Copies a profile under a new name. The copy is never active.
    pub async fn duplicate_profile(&self, id: &str, new_name: &str) -> CoreResult<SettingsProfile> {
        let source = self.get_profile(id).await?;
        self.create_profile(CreateProfileRequest {
            name: new_name.to_string(),
            description: Some(source.description),
            config: source.config,
        })
        .await
    }

    /// Makes `id` the active profile and publishes its config.
    ///
    /// # Errors
    /// `ProfileNotFound` for an unknown id. If settings cannot be persisted
    /// the active markers are restored.
    pub async fn activate_profile(&self, id: &str) -> CoreResult<SettingsProfile> {
        let _guard = self.write_lock.lock().await;
        let profiles = self.list_profiles().await?;
        if !profiles.iter().any(|p| p.id == id) {
            return Err(CoreError::ProfileNotFound(id.to_string()));
        }
        self.activate_locked(profiles, id).await
    }

    /// Partial update. Re-publishes settings when the profile is active.
    ///
    /// # Errors
    /// If the re-published settings cannot be persisted the stored profile
    /// is put back as it was.
    pub async fn update_profile(
        &self,
        id: &str,
        request: UpdateProfileRequest,
    ) -> CoreResult<SettingsProfile> {
        let name = request
            .name
            .as_deref()
            .map(validate_profile_name)
            .transpose()?;

        let _guard = self.write_lock.lock().await;
        let original = self.get_profile(id).await?;
        let mut profile = original.clone();

        if let Some(name) = name {
            profile.name = name;
        }
        if let Some(description) = request.description {
            profile.description = description;
        }
        let config_changed = request.config.is_some();
        if let Some(config) = request.config {
            profile.config = config;
        }
        profile.touch();
        self.ctx.profile_repository().save(&profile).await?;

        let settings = self.ctx.settings().instance().await;
        let is_active = settings.active_profile_id.as_deref() == Some(id) || profile.is_active;
        if is_active && config_changed {
            let config = profile.config.clone();
            let profile_id = profile.id.clone();
            let published = self
                .ctx
                .settings()
                .update(move |s| {
                    s.config = config;
                    s.active_profile_id = Some(profile_id);
                })
                .await;
            if let Err(e) = published {
                log::error!("Failed to re-publish settings for profile {id}: {e}");
                if let Err(rollback_err) = self.ctx.profile_repository().save(&original).await {
                    log::warn!("Rollback: failed to restore profile {id}: {rollback_err}");
                }
                return Err(e);
            }
            log::info!("Re-published settings for active profile {id}");
        }

        Ok(profile)
    }

    /// Deletes a profile. Deleting the active one activates a fallback: the
    /// first remaining profile, or a fresh [`DEFAULT_PROFILE_NAME`] profile
    /// built from the built-in defaults.
    ///
    /// Returns the fallback profile when one was activated.
    ///
    /// # Errors
    /// When the fallback cannot be activated the profile is kept and
    /// settings still point at it.
    pub async fn delete_profile(&self, id: &str) -> CoreResult<Option<SettingsProfile>> {
        let _guard = self.write_lock.lock().await;
        let profiles = self.list_profiles().await?;
        let Some(target) = profiles.iter().find(|p| p.id == id) else {
            return Err(CoreError::ProfileNotFound(id.to_string()));
        };

        let settings = self.ctx.settings().instance().await;
        let was_active = target.is_active || settings.active_profile_id.as_deref() == Some(id);

        if !was_active {
            self.ctx.profile_repository().delete(id).await?;
            log::info!("Deleted profile {id}");
            return Ok(None);
        }

        // 先切换到回退 profile，成功后再删除
        let mut remaining: Vec<SettingsProfile> =
            profiles.into_iter().filter(|p| p.id != id).collect();
        let mut created_default = None;
        let fallback_id = if let Some(first) = remaining.first() {
            first.id.clone()
        } else {
            let default = self.create_default_locked(BackendConfig::default()).await?;
            let default_id = default.id.clone();
            created_default = Some(default_id.clone());
            remaining.push(default);
            default_id
        };

        log::info!("Deleting active profile {id}, falling back to {fallback_id}");
        let fallback = match self.activate_locked(remaining, &fallback_id).await {
            Ok(fallback) => fallback,
            Err(e) => {
                if let Some(default_id) = created_default {
                    let cleanup = self.ctx.profile_repository().delete(&default_id).await;
                    if let Err(cleanup_err) = cleanup {
                        log::warn!("Rollback: failed to remove profile {default_id}: {cleanup_err}");
                    }
                }
                return Err(e);
            }
        };

        self.ctx.profile_repository().delete(id).await?;
        log::info!("Deleted profile {id}");
        Ok(Some(fallback))
    }

    /// Makes sure exactly one profile is active, creating one from the
    /// current settings on a fresh install.
    pub async fn ensure_default_profile(&self) -> CoreResult<SettingsProfile> {
        let _guard = self.write_lock.lock().await;
        let settings = self.ctx.settings().instance().await;
        let mut profiles = self.list_profiles().await?;

        if let Some(active_id) = settings.active_profile_id.as_deref() {
            if let Some(active) = profiles.iter().find(|p| p.id == active_id && p.is_active) {
                return Ok(active.clone());
            }
        }

        let existing = profiles
            .iter()
            .find(|p| p.is_active)
            .or_else(|| profiles.first())
            .map(|p| p.id.clone());
        let target_id = match existing {
            Some(id) => id,
            None => {
                log::info!("No profiles found, creating {DEFAULT_PROFILE_NAME:?}");
                let default = self.create_default_locked(settings.config.clone()).await?;
                let default_id = default.id.clone();
                profiles.push(default);
                default_id
            }
        };

        self.activate_locked(profiles, &target_id).await
    }

    // ===== 内部方法（调用方需持有 write_lock） =====

    async fn create_default_locked(&self, config: BackendConfig) -> CoreResult<SettingsProfile> {
        let profile = SettingsProfile::new(DEFAULT_PROFILE_NAME.to_string(), String::new(), config);
        self.ctx.profile_repository().save(&profile).await?;
        Ok(profile)
    }

    async fn activate_locked(
        &self,
        previous: Vec<SettingsProfile>,
        id: &str,
    ) -> CoreResult<SettingsProfile> {
        let marked: Vec<SettingsProfile> = previous
            .iter()
            .cloned()
            .map(|mut p| {
                p.is_active = p.id == id;
                p
            })
            .collect();
        let Some(target) = marked.iter().find(|p| p.id == id).cloned() else {
            return Err(CoreError::ProfileNotFound(id.to_string()));
        };

        self.ctx.profile_repository().save_all(&marked).await?;

        let config = target.config.clone();
        let profile_id = target.id.clone();
        let published = self
            .ctx
            .settings()
            .update(move |s| {
                s.config = config;
                s.active_profile_id = Some(profile_id);
            })
            .await;

        if let Err(e) = published {
            log::error!("Failed to publish settings for profile {id}, restoring markers: {e}");
            if let Err(rollback_err) = self.ctx.profile_repository().save_all(&previous).await {
                log::warn!("Rollback: failed to restore profile markers: {rollback_err}");
            }
            return Err(e);
        }

        log::info!("Activated profile {} ({})", target.id, target.name);
        Ok(target)
    }
}
