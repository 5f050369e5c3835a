//! Firestore 错误映射

use crate::error::ProviderError;
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError};

use super::FirestoreProvider;

/// Firestore reports gRPC status names in `error.status`.
/// Reference: <https://cloud.google.com/firestore/docs/understand-error-codes>
impl ProviderErrorMapper for FirestoreProvider {
    fn provider_name(&self) -> &'static str {
        "firestore"
    }

    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> ProviderError {
        match raw.code.as_deref() {
            Some("UNAUTHENTICATED") => ProviderError::InvalidCredentials {
                provider: self.provider_name().to_string(),
                raw_message: Some(raw.message),
            },

            // 无效 API key 也走 INVALID_ARGUMENT
            Some("INVALID_ARGUMENT") if raw.message.contains("API key") => {
                ProviderError::InvalidCredentials {
                    provider: self.provider_name().to_string(),
                    raw_message: Some(raw.message),
                }
            }

            Some("INVALID_ARGUMENT" | "FAILED_PRECONDITION") => ProviderError::InvalidParameter {
                provider: self.provider_name().to_string(),
                param: "request".to_string(),
                detail: raw.message,
            },

            Some("PERMISSION_DENIED") => ProviderError::PermissionDenied {
                provider: self.provider_name().to_string(),
                raw_message: Some(raw.message),
            },

            Some("NOT_FOUND") => ProviderError::RecordNotFound {
                provider: self.provider_name().to_string(),
                record_id: context
                    .record_id
                    .unwrap_or_else(|| "<unknown>".to_string()),
                raw_message: Some(raw.message),
            },

            Some("RESOURCE_EXHAUSTED") => ProviderError::RateLimited {
                provider: self.provider_name().to_string(),
                retry_after: None,
                raw_message: Some(raw.message),
            },

            Some("DEADLINE_EXCEEDED") => ProviderError::Timeout {
                provider: self.provider_name().to_string(),
                detail: raw.message,
            },

            Some("UNAVAILABLE") => ProviderError::NetworkError {
                provider: self.provider_name().to_string(),
                detail: raw.message,
            },

            _ => self.map_status(raw, context),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BackendConfig, BackendType, ClientOptions};

    fn provider() -> FirestoreProvider {
        FirestoreProvider::new(
            BackendConfig::defaults_for(BackendType::Firestore),
            &ClientOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn bad_api_key_is_invalid_credentials() {
        let err = provider().map_error(
            RawApiError::with_code(
                400,
                "INVALID_ARGUMENT",
                "API key not valid. Please pass a valid API key.",
            ),
            ErrorContext::default(),
        );
        assert!(matches!(err, ProviderError::InvalidCredentials { .. }));
    }

    #[test]
    fn other_invalid_argument_is_invalid_parameter() {
        let err = provider().map_error(
            RawApiError::with_code(400, "INVALID_ARGUMENT", "Invalid JSON payload"),
            ErrorContext::default(),
        );
        assert!(matches!(err, ProviderError::InvalidParameter { .. }));
    }

    #[test]
    fn not_found_carries_record_id() {
        let err = provider().map_error(
            RawApiError::with_code(404, "NOT_FOUND", "No document to update"),
            ErrorContext::record("doc-1"),
        );
        assert!(
            matches!(&err, ProviderError::RecordNotFound { record_id, .. } if record_id == "doc-1")
        );
    }

    #[test]
    fn quota_is_rate_limited() {
        let err = provider().map_error(
            RawApiError::with_code(429, "RESOURCE_EXHAUSTED", "Quota exceeded"),
            ErrorContext::default(),
        );
        assert!(matches!(err, ProviderError::RateLimited { .. }));
    }

    #[test]
    fn missing_status_falls_back_to_http_status() {
        let err = provider().map_error(RawApiError::new(500, "boom"), ErrorContext::default());
        assert!(matches!(err, ProviderError::HttpStatus { status: 500, .. }));
    }
}
