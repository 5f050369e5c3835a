//! Backend factory functions and metadata.

use std::sync::Arc;

use crate::error::Result;
#[cfg(not(all(feature = "firestore", feature = "supabase", feature = "hasura")))]
use crate::error::ProviderError;
use crate::traits::BackendService;
use crate::types::{BackendConfig, BackendMetadata, BackendType, ClientOptions};
use crate::utils::log_sanitizer::mask_secret;

#[cfg(feature = "firestore")]
use crate::providers::FirestoreProvider;
#[cfg(feature = "hasura")]
use crate::providers::HasuraProvider;
#[cfg(feature = "supabase")]
use crate::providers::SupabaseProvider;

/// Creates a [`BackendService`] for `config.backend`.
///
/// Construction does no I/O; the adapter connects on its first call (or an
/// explicit [`BackendService::initialize`]). Backends whose feature is
/// disabled yield [`ProviderError::UnsupportedProvider`](crate::ProviderError::UnsupportedProvider).
///
/// # Examples
///
/// ```rust,no_run
/// use larder_provider::{BackendConfig, BackendType, ClientOptions, create_backend};
///
/// let mut config = BackendConfig::defaults_for(BackendType::Supabase);
/// config.base_url = "https://abc.supabase.co".to_string();
/// config.api_key = "anon-key".to_string();
/// let backend = create_backend(config, ClientOptions::default()).unwrap();
/// assert_eq!(backend.service_name(), "Supabase");
/// ```
pub fn create_backend(
    config: BackendConfig,
    options: ClientOptions,
) -> Result<Arc<dyn BackendService>> {
    let backend = config.backend;
    log::debug!(
        "Creating {backend} backend for {} (key {})",
        config.base_url,
        mask_secret(&config.api_key)
    );
    match backend {
        #[cfg(feature = "firestore")]
        BackendType::Firestore => Ok(Arc::new(FirestoreProvider::new(config, &options)?)),
        #[cfg(feature = "supabase")]
        BackendType::Supabase => Ok(Arc::new(SupabaseProvider::new(config, &options)?)),
        #[cfg(feature = "hasura")]
        BackendType::Hasura => Ok(Arc::new(HasuraProvider::new(config, &options)?)),
        #[cfg(not(all(feature = "firestore", feature = "supabase", feature = "hasura")))]
        other => Err(ProviderError::UnsupportedProvider {
            provider: other.to_string(),
        }),
    }
}

/// Returns metadata for all backends enabled via feature flags.
pub fn get_all_backend_metadata() -> Vec<BackendMetadata> {
    vec![
        #[cfg(feature = "firestore")]
        FirestoreProvider::metadata(),
        #[cfg(feature = "supabase")]
        SupabaseProvider::metadata(),
        #[cfg(feature = "hasura")]
        HasuraProvider::metadata(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_dispatches_on_backend_type() {
        for backend in BackendType::ALL {
            let result = create_backend(BackendConfig::defaults_for(backend), ClientOptions::default());
            match result {
                Ok(service) => assert_eq!(service.service_type(), backend),
                Err(e) => assert!(matches!(e, crate::ProviderError::UnsupportedProvider { .. })),
            }
        }
    }

    #[cfg(feature = "all-backends")]
    #[test]
    fn metadata_lists_every_backend() {
        let metadata = get_all_backend_metadata();
        let backends: Vec<_> = metadata.iter().map(|m| m.backend).collect();
        assert_eq!(backends, BackendType::ALL.to_vec());
        let firestore = &metadata[0];
        assert!(firestore.required_fields.iter().any(|f| f == "projectId"));
        assert!(!firestore.server_side_ordering);
    }
}
