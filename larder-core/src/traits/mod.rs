//! Storage layer abstraction trait definition

mod profile_repository;
mod settings_store;

pub use profile_repository::ProfileRepository;
pub use settings_store::SettingsStore;
