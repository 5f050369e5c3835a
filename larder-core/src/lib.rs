//! Larder Core Library
//!
//! Platform-independent state and services for the larder tracker:
//! - `SettingsManager`: process-wide [`AppSettings`](types::AppSettings) with
//!   load / save / reload and change notification
//! - `SettingsProfileService`: named backend configurations, one of them active
//! - `BackendServiceFactory`: builds the adapter for the active backend
//!
//! Storage is abstracted through the traits in [`traits`]; the platform layer
//! supplies the implementations.

pub mod error;
pub mod services;
pub mod settings;
pub mod traits;
pub mod types;

#[cfg(test)]
mod test_utils;

// Re-export common types
pub use error::{CoreError, CoreResult};
pub use services::{BackendServiceFactory, ServiceContext, SettingsProfileService};
pub use settings::{SettingsManager, SettingsSubscription};
pub use traits::{ProfileRepository, SettingsStore};
