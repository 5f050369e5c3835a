//! Hasura 错误映射

use crate::error::ProviderError;
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError};

use super::HasuraProvider;

/// Reference: <https://hasura.io/docs/latest/api-reference/graphql-api/overview/>
impl ProviderErrorMapper for HasuraProvider {
    fn provider_name(&self) -> &'static str {
        "hasura"
    }

    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> ProviderError {
        match raw.code.as_deref() {
            // 错误的 admin secret 同样报 access-denied
            Some("access-denied") if raw.message.contains("admin-secret") => {
                ProviderError::InvalidCredentials {
                    provider: self.provider_name().to_string(),
                    raw_message: Some(raw.message),
                }
            }
            Some("invalid-jwt" | "jwt-invalid-claims" | "invalid-headers") => {
                ProviderError::InvalidCredentials {
                    provider: self.provider_name().to_string(),
                    raw_message: Some(raw.message),
                }
            }
            Some("access-denied" | "permission-denied") => ProviderError::PermissionDenied {
                provider: self.provider_name().to_string(),
                raw_message: Some(raw.message),
            },

            // 表或列不存在
            Some("validation-failed" | "parse-failed") => ProviderError::InvalidParameter {
                provider: self.provider_name().to_string(),
                param: "query".to_string(),
                detail: raw.message,
            },
            Some("constraint-violation" | "data-exception") => ProviderError::InvalidParameter {
                provider: self.provider_name().to_string(),
                param: "record".to_string(),
                detail: raw.message,
            },

            Some("not-found" | "not-exists") => ProviderError::RecordNotFound {
                provider: self.provider_name().to_string(),
                record_id: context
                    .record_id
                    .unwrap_or_else(|| "<unknown>".to_string()),
                raw_message: Some(raw.message),
            },

            // GraphQL 层错误通常是 HTTP 200
            Some(_) if raw.status < 400 => self.unknown_error(raw),
            _ => self.map_status(raw, context),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BackendConfig, BackendType, ClientOptions};

    fn provider() -> HasuraProvider {
        HasuraProvider::new(
            BackendConfig::defaults_for(BackendType::Hasura),
            &ClientOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn bad_admin_secret_is_invalid_credentials() {
        let err = provider().map_error(
            RawApiError::with_code(
                200,
                "access-denied",
                "invalid x-hasura-admin-secret/x-hasura-access-key",
            ),
            ErrorContext::default(),
        );
        assert!(matches!(err, ProviderError::InvalidCredentials { .. }));
    }

    #[test]
    fn role_without_permission_is_permission_denied() {
        let err = provider().map_error(
            RawApiError::with_code(200, "access-denied", "not allowed for role user"),
            ErrorContext::default(),
        );
        assert!(matches!(err, ProviderError::PermissionDenied { .. }));
    }

    #[test]
    fn unknown_field_is_invalid_parameter() {
        let err = provider().map_error(
            RawApiError::with_code(
                200,
                "validation-failed",
                "field 'foods' not found in type: 'query_root'",
            ),
            ErrorContext::default(),
        );
        assert!(matches!(&err, ProviderError::InvalidParameter { param, .. } if param == "query"));
    }

    #[test]
    fn unrecognized_code_is_unknown_with_code() {
        let err = provider().map_error(
            RawApiError::with_code(200, "unexpected", "database query error"),
            ErrorContext::default(),
        );
        assert!(
            matches!(&err, ProviderError::Unknown { raw_code: Some(code), .. } if code == "unexpected")
        );
    }

    #[test]
    fn http_failures_use_status_mapping() {
        let err = provider().map_error(RawApiError::new(401, "unauthorized"), ErrorContext::default());
        assert!(matches!(err, ProviderError::InvalidCredentials { .. }));
    }
}
