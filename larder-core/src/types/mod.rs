//! 类型定义模块

mod profile;
mod settings;

pub use profile::{
    CreateProfileRequest, ProfileSnapshot, SettingsProfile, UpdateProfileRequest,
    MAX_PROFILE_NAME_CHARS,
};
pub use settings::AppSettings;

pub(crate) use profile::validate_profile_name;

// Re-export provider 库的公共类型
pub use larder_provider::{
    BackendConfig, BackendMetadata, BackendType, ClientOptions, ConnectionCheck, Food,
    Subscription,
};
