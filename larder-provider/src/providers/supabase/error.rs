//! Supabase / PostgREST error mapping

use serde::Deserialize;

use crate::error::ProviderError;
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError};

use super::SupabaseProvider;

/// `PostgREST` error body.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PostgrestError {
    pub code: Option<String>,
    pub message: Option<String>,
    pub details: Option<String>,
}

impl PostgrestError {
    pub fn into_raw(self, status: u16, body: &str) -> RawApiError {
        let message = match (self.message, self.details) {
            (Some(msg), Some(details)) => format!("{msg} ({details})"),
            (Some(msg), None) => msg,
            (None, _) => body.to_string(),
        };
        match self.code {
            Some(code) => RawApiError::with_code(status, code, message),
            None => RawApiError::new(status, message),
        }
    }
}

/// Reference: <https://postgrest.org/en/stable/references/errors.html>
impl ProviderErrorMapper for SupabaseProvider {
    fn provider_name(&self) -> &'static str {
        "supabase"
    }

    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> ProviderError {
        match raw.code.as_deref() {
            // PGRST301: JWT invalid / expired, PGRST302: anonymous access disabled
            Some("PGRST301" | "PGRST302") => ProviderError::InvalidCredentials {
                provider: self.provider_name().to_string(),
                raw_message: Some(raw.message),
            },

            // 42501: insufficient_privilege (row level security)
            Some("42501") => ProviderError::PermissionDenied {
                provider: self.provider_name().to_string(),
                raw_message: Some(raw.message),
            },

            // 42P01: undefined table, PGRST205: table not in schema cache
            Some("42P01" | "PGRST205") => ProviderError::InvalidParameter {
                provider: self.provider_name().to_string(),
                param: "collection".to_string(),
                detail: raw.message,
            },

            // 42703: undefined column, PGRST204: column not in schema cache
            // 23502: not null violation, 22P02: invalid text representation
            Some(code @ ("42703" | "PGRST204" | "23502" | "22P02")) => {
                let param = match code {
                    "22P02" => "id",
                    _ => "field",
                };
                ProviderError::InvalidParameter {
                    provider: self.provider_name().to_string(),
                    param: param.to_string(),
                    detail: raw.message,
                }
            }

            // PGRST116: singular response expected but no rows
            Some("PGRST116") => ProviderError::RecordNotFound {
                provider: self.provider_name().to_string(),
                record_id: context
                    .record_id
                    .unwrap_or_else(|| "<unknown>".to_string()),
                raw_message: Some(raw.message),
            },

            _ => self.map_status(raw, context),
        }
    }
}
