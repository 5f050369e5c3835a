//! JSON file storage adapters.
//!
//! Both files live in one directory (by default `<data dir>/larder/`) and are
//! rewritten atomically: the new document goes to a temp file next to the
//! target, which is then renamed over it.

mod json_file;
mod json_profile_repository;
mod json_settings_store;

pub use json_file::default_data_dir;
pub use json_profile_repository::{JsonProfileRepository, PROFILES_FILE};
pub use json_settings_store::{JsonSettingsStore, SETTINGS_FILE};
