//! Hasura HTTP 请求方法

use serde_json::Value;

use crate::error::{ProviderError, Result};
use crate::http_client::HttpUtils;
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError};

use super::types::GraphQLRequest;
use super::{GraphQLError, GraphQLResponse, HasuraProvider};

impl HasuraProvider {
    /// Runs one GraphQL document and returns its `data` object.
    ///
    /// The first entry of `errors` decides the mapped error; Hasura sends
    /// those with HTTP 200.
    pub(crate) async fn execute(
        &self,
        operation: &str,
        query: &str,
        variables: Option<&Value>,
        ctx: ErrorContext,
    ) -> Result<Value> {
        let payload = serde_json::to_string(&GraphQLRequest { query, variables })
            .map_err(|e| self.serialization_error(e))?;
        log::debug!("[{}] GraphQL {operation}: {query}", self.provider_name());

        let request = self
            .client
            .post(&self.config.base_url)
            .header("x-hasura-admin-secret", &self.config.api_key)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .body(payload);

        let response = HttpUtils::execute_request_with_retry(
            request,
            self.provider_name(),
            "POST",
            operation,
            self.max_retries,
        )
        .await?;

        // 非 2xx 时 body 可能仍是 GraphQL 错误
        let parsed = serde_json::from_str::<GraphQLResponse>(&response.body);
        if !response.is_success() {
            let raw = match parsed {
                Ok(GraphQLResponse { errors, .. }) if !errors.is_empty() => {
                    first_error(response.status, errors)
                }
                _ => RawApiError::new(response.status, response.body.clone()),
            };
            log::error!(
                "[{}] API error (HTTP {}): {}",
                self.provider_name(),
                response.status,
                raw.message
            );
            return Err(self.map_error(raw, ctx));
        }

        let GraphQLResponse { data, errors } =
            HttpUtils::parse_json::<GraphQLResponse>(&response.body, self.provider_name())?;
        if !errors.is_empty() {
            let raw = first_error(response.status, errors);
            log::error!("[{}] GraphQL error: {}", self.provider_name(), raw.message);
            return Err(self.map_error(raw, ctx));
        }

        data.ok_or_else(|| self.parse_error("response has neither data nor errors"))
    }

    /// `data[field]`, which must be present.
    pub(crate) fn take_field(&self, mut data: Value, field: &str) -> Result<Value> {
        match data.get_mut(field).map(Value::take) {
            Some(value) => Ok(value),
            None => Err(ProviderError::ParseError {
                provider: self.provider_name().to_string(),
                detail: format!("missing field '{field}' in response data"),
            }),
        }
    }
}

fn first_error(status: u16, errors: Vec<GraphQLError>) -> RawApiError {
    let extra = errors.len().saturating_sub(1);
    let Some(first) = errors.into_iter().next() else {
        return RawApiError::new(status, "empty errors array");
    };
    let message = if extra > 0 {
        format!("{} (+{extra} more)", first.message)
    } else {
        first.message.clone()
    };
    match first.code() {
        Some(code) => RawApiError::with_code(status, code, message),
        None => RawApiError::new(status, message),
    }
}
