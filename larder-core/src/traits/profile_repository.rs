//! Profile persistence abstract Trait

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::SettingsProfile;

/// Profile Warehouse Trait
///
/// Profiles are kept in insertion order.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Get all profiles, in insertion order
    async fn find_all(&self) -> CoreResult<Vec<SettingsProfile>>;

    /// Get profile based on ID
    ///
    /// # Arguments
    /// * `id` - Profile ID
    async fn find_by_id(&self, id: &str) -> CoreResult<Option<SettingsProfile>>;

    /// Save profile (new or update)
    ///
    /// New profiles are appended; existing ones keep their position.
    ///
    /// # Arguments
    /// * `profile` - Profile data
    async fn save(&self, profile: &SettingsProfile) -> CoreResult<()>;

    /// Delete profile. Deleting an unknown id is not an error.
    ///
    /// # Arguments
    /// * `id` - Profile ID
    async fn delete(&self, id: &str) -> CoreResult<()>;

    /// Save profiles in batches, as one write
    ///
    /// # Arguments
    /// * `profiles` - Profile list
    async fn save_all(&self, profiles: &[SettingsProfile]) -> CoreResult<()>;
}
