//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

// Re-export library error type
pub use larder_provider::ProviderError;

/// Core layer error type
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum CoreError {
    /// Input rejected before anything was stored
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// No profile with this id
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// The selected backend has no adapter in this build
    #[error("Unsupported backend: {0}")]
    UnsupportedProvider(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    StorageError(String),

    /// serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Backend error (converting from library)
    #[error("{0}")]
    Provider(#[from] ProviderError),
}

impl CoreError {
    /// Whether it is expected behavior (user input, missing profile, etc.), used for log classification.
    ///
    /// Level `warn` should be used when returning `true` and level `error` when returning `false`.
    /// Keep in sync when adding variants.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::ValidationError(_) | Self::ProfileNotFound(_) | Self::UnsupportedProvider(_) => {
                true
            }
            Self::Provider(e) => e.is_expected(),
            Self::StorageError(_) | Self::SerializationError(_) => false,
        }
    }

    /// Logs at `warn` or `error` depending on [`is_expected`](Self::is_expected).
    pub fn log(&self, context: &str) {
        if self.is_expected() {
            log::warn!("{context}: {self}");
        } else {
            log::error!("{context}: {self}");
        }
    }
}

/// Core layer Result type alias
pub type CoreResult<T> = std::result::Result<T, CoreError>;
