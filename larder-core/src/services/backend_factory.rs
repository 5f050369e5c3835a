//! Backend service factory
//!
//! Stateless: every call re-reads the current settings, so a profile switch
//! takes effect on the next call without any cache to invalidate.

use std::sync::Arc;

use larder_provider::{create_backend, get_all_backend_metadata, BackendService, ProviderError};

use crate::error::{CoreError, CoreResult};
use crate::settings::SettingsManager;
use crate::types::{BackendMetadata, ConnectionCheck};

pub struct BackendServiceFactory {
    settings: Arc<SettingsManager>,
}

impl BackendServiceFactory {
    #[must_use]
    pub fn new(settings: Arc<SettingsManager>) -> Self {
        Self { settings }
    }

    /// Builds the adapter selected by the current settings.
    ///
    /// # Errors
    /// `UnsupportedProvider` when the selected backend was compiled out.
    pub async fn create_current_service(&self) -> CoreResult<Arc<dyn BackendService>> {
        let settings = self.settings.instance().await;
        if !settings.is_configured() {
            log::warn!(
                "Backend {} is not fully configured, calls will fail until it is",
                settings.backend_type()
            );
        }
        create_backend(settings.config.clone(), settings.client_options()).map_err(|e| match e {
            ProviderError::UnsupportedProvider { provider } => {
                CoreError::UnsupportedProvider(provider)
            }
            other => CoreError::Provider(other),
        })
    }

    /// Metadata of every backend compiled into this build.
    pub fn available_backends(&self) -> Vec<BackendMetadata> {
        get_all_backend_metadata()
    }

    /// Probes the current backend. Probe failures are reported in the
    /// returned check, not as errors.
    pub async fn check_connection(&self) -> CoreResult<ConnectionCheck> {
        let service = self.create_current_service().await?;
        Ok(service.test_connection().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_provider::BackendType;

    use crate::test_utils::TestHarness;

    #[tokio::test]
    async fn builds_adapter_for_current_backend() {
        let h = TestHarness::new();
        let factory = BackendServiceFactory::new(h.settings.clone());

        let service = factory.create_current_service().await.unwrap();
        assert_eq!(service.service_type(), BackendType::Supabase);
        assert_eq!(service.service_name(), "Supabase");
    }

    #[tokio::test]
    async fn follows_settings_changes() {
        let h = TestHarness::new();
        let factory = BackendServiceFactory::new(h.settings.clone());

        for backend in BackendType::ALL {
            h.settings
                .update(|s| s.config.backend = backend)
                .await
                .unwrap();
            let service = factory.create_current_service().await.unwrap();
            assert_eq!(service.service_type(), backend);
        }
    }

    #[test]
    fn lists_all_compiled_backends() {
        let h = TestHarness::new();
        let factory = BackendServiceFactory::new(h.settings.clone());
        let names: Vec<String> = factory
            .available_backends()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["Firestore", "Supabase", "Hasura"]);
    }

    #[tokio::test]
    async fn unconfigured_backend_reports_unhealthy() {
        let h = TestHarness::new();
        let factory = BackendServiceFactory::new(h.settings.clone());

        let check = factory.check_connection().await.unwrap();
        assert!(!check.healthy);
        assert!(check.error.unwrap().contains("Not configured"));
    }
}
