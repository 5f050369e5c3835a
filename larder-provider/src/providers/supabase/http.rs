//! Supabase HTTP 请求方法

use reqwest::Method;
use serde_json::Value;

use crate::error::Result;
use crate::http_client::{HttpResponse, HttpUtils};
use crate::providers::common::join_url;
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError};

use super::error::PostgrestError;
use super::{REST_PATH, SupabaseProvider};

impl SupabaseProvider {
    // ==================== 辅助方法 ====================

    /// `{base_url}/rest/v1/{table}` plus an optional query string.
    pub(crate) fn table_url(&self, table: &str, query: &str) -> String {
        let url = join_url(
            &join_url(&self.config.base_url, REST_PATH),
            &urlencoding::encode(table),
        );
        if query.is_empty() {
            url
        } else {
            format!("{url}?{query}")
        }
    }

    /// 统一处理 `PostgREST` 错误响应
    fn handle_response_error(&self, response: &HttpResponse, ctx: ErrorContext) -> Result<()> {
        if response.is_success() {
            return Ok(());
        }

        let raw = match serde_json::from_str::<PostgrestError>(&response.body) {
            Ok(error) => error.into_raw(response.status, &response.body),
            Err(_) => RawApiError::new(response.status, response.body.clone()),
        };
        log::error!(
            "[{}] API error (HTTP {}): {}",
            self.provider_name(),
            response.status,
            raw.message
        );
        Err(self.map_error(raw, ctx))
    }

    // ==================== 请求 ====================

    /// Sends one request and returns the response rows.
    ///
    /// Every call asks for `return=representation`, so writes echo the
    /// affected rows back. An empty body reads as an empty list.
    pub(crate) async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        ctx: ErrorContext,
    ) -> Result<Vec<Value>> {
        let mut request = self
            .client
            .request(method.clone(), url)
            .header("apikey", &self.config.api_key)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Accept", "application/json")
            .header("Prefer", "return=representation");

        if let Some(body) = body {
            let payload = serde_json::to_string(body).map_err(|e| self.serialization_error(e))?;
            log::debug!("[{}] Request Body: {payload}", self.provider_name());
            request = request
                .header("Content-Type", "application/json")
                .body(payload);
        }

        let response = HttpUtils::execute_request_with_retry(
            request,
            self.provider_name(),
            method.as_str(),
            url,
            self.max_retries,
        )
        .await?;

        self.handle_response_error(&response, ctx)?;

        if response.body.trim().is_empty() {
            return Ok(Vec::new());
        }
        match HttpUtils::parse_json::<Value>(&response.body, self.provider_name())? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            row @ Value::Object(_) => Ok(vec![row]),
            other => Err(self.parse_error(format!("expected rows, got {other}"))),
        }
    }

    pub(crate) async fn select(&self, table: &str, query: &str) -> Result<Vec<Value>> {
        let url = self.table_url(table, query);
        self.request(Method::GET, &url, None, ErrorContext::default())
            .await
    }

    pub(crate) async fn insert(&self, table: &str, row: &Value) -> Result<Value> {
        let url = self.table_url(table, "");
        let rows = self
            .request(Method::POST, &url, Some(row), ErrorContext::default())
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| self.parse_error("insert returned no rows"))
    }

    /// PATCH by id. Zero affected rows means the id does not exist.
    pub(crate) async fn update_by_id(&self, table: &str, id: &str, row: &Value) -> Result<Value> {
        let url = self.table_url(table, &id_filter(id));
        let rows = self
            .request(Method::PATCH, &url, Some(row), ErrorContext::record(id))
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| self.not_found(id))
    }

    pub(crate) async fn delete_by_id(&self, table: &str, id: &str) -> Result<()> {
        let url = self.table_url(table, &id_filter(id));
        let rows = self
            .request(Method::DELETE, &url, None, ErrorContext::record(id))
            .await?;
        if rows.is_empty() {
            return Err(self.not_found(id));
        }
        Ok(())
    }

    fn not_found(&self, id: &str) -> crate::error::ProviderError {
        self.map_status(RawApiError::new(404, "no rows matched"), ErrorContext::record(id))
    }
}

fn id_filter(id: &str) -> String {
    format!("id=eq.{}", urlencoding::encode(id))
}
