//! Firestore HTTP 请求方法

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;
use crate::http_client::{HttpResponse, HttpUtils};
use crate::providers::common::join_url;
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError};

use super::{Document, FirestoreErrorResponse, FirestoreProvider, ListDocumentsResponse, MAX_PAGE_SIZE};

impl FirestoreProvider {
    // ==================== 辅助方法 ====================

    /// `{base}/projects/{project}/databases/(default)/documents`
    pub(crate) fn build_documents_root(&self) -> String {
        join_url(
            &self.config.base_url,
            &format!(
                "projects/{}/databases/(default)/documents",
                urlencoding::encode(self.config.project_id.trim())
            ),
        )
    }

    /// Appends the API key and any extra query pairs.
    fn with_query(&self, url: &str, extra: &[(&str, &str)]) -> String {
        let mut query = format!("key={}", urlencoding::encode(&self.config.api_key));
        for (name, value) in extra {
            query.push('&');
            query.push_str(name);
            query.push('=');
            query.push_str(&urlencoding::encode(value));
        }
        format!("{url}?{query}")
    }

    /// 统一处理 Firestore 错误响应
    fn handle_response_error(&self, response: &HttpResponse, ctx: ErrorContext) -> Result<()> {
        if response.is_success() {
            return Ok(());
        }

        let raw = match serde_json::from_str::<FirestoreErrorResponse>(&response.body) {
            Ok(FirestoreErrorResponse { error }) => match error.status {
                Some(status) => RawApiError::with_code(response.status, status, error.message),
                None => RawApiError::new(response.status, error.message),
            },
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

    /// Sends one request (the key travels in the query string, not a header).
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        ctx: ErrorContext,
    ) -> Result<T> {
        let mut request = self
            .client
            .request(method.clone(), url)
            .header("Accept", "application/json");
        if let Some(body) = body {
            let payload = serde_json::to_string(body).map_err(|e| self.serialization_error(e))?;
            log::debug!("[{}] Request Body: {payload}", self.provider_name());
            request = request
                .header("Content-Type", "application/json")
                .body(payload);
        }

        // 日志里不带 key
        let loggable = url.split('?').next().unwrap_or(url);
        let response = HttpUtils::execute_request_with_retry(
            request,
            self.provider_name(),
            method.as_str(),
            loggable,
            self.max_retries,
        )
        .await?;

        self.handle_response_error(&response, ctx)?;
        let body = if response.body.trim().is_empty() {
            "{}"
        } else {
            response.body.as_str()
        };
        HttpUtils::parse_json(body, self.provider_name())
    }

    // ==================== 文档操作 ====================

    /// One page of a collection.
    pub(crate) async fn list_page(
        &self,
        root: &str,
        collection: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<ListDocumentsResponse> {
        let url = join_url(root, &urlencoding::encode(collection));
        let size = page_size.min(MAX_PAGE_SIZE).to_string();
        let mut extra = vec![("pageSize", size.as_str())];
        if let Some(token) = page_token {
            extra.push(("pageToken", token));
        }
        self.send(
            Method::GET,
            &self.with_query(&url, &extra),
            None,
            ErrorContext::default(),
        )
        .await
    }

    /// Whole collection, following `nextPageToken`.
    pub(crate) async fn list_documents(&self, root: &str, collection: &str) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .list_page(root, collection, MAX_PAGE_SIZE, page_token.as_deref())
                .await?;
            documents.extend(page.documents);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        log::debug!(
            "[{}] Listed {} document(s) from {collection}",
            self.provider_name(),
            documents.len()
        );
        Ok(documents)
    }

    pub(crate) async fn create_document(
        &self,
        root: &str,
        collection: &str,
        body: &Value,
    ) -> Result<Document> {
        let url = join_url(root, &urlencoding::encode(collection));
        self.send(
            Method::POST,
            &self.with_query(&url, &[]),
            Some(body),
            ErrorContext::default(),
        )
        .await
    }

    /// PATCH restricted to `field_paths`; fails with `NOT_FOUND` instead of
    /// creating when the document does not exist.
    pub(crate) async fn patch_document(
        &self,
        root: &str,
        collection: &str,
        id: &str,
        body: &Value,
        field_paths: &[&str],
    ) -> Result<Document> {
        let url = document_url(root, collection, id);
        let mut extra: Vec<(&str, &str)> = field_paths
            .iter()
            .map(|path| ("updateMask.fieldPaths", *path))
            .collect();
        extra.push(("currentDocument.exists", "true"));
        self.send(
            Method::PATCH,
            &self.with_query(&url, &extra),
            Some(body),
            ErrorContext::record(id),
        )
        .await
    }

    pub(crate) async fn delete_document(&self, root: &str, collection: &str, id: &str) -> Result<()> {
        let url = document_url(root, collection, id);
        let _: Value = self
            .send(
                Method::DELETE,
                &self.with_query(&url, &[("currentDocument.exists", "true")]),
                None,
                ErrorContext::record(id),
            )
            .await?;
        Ok(())
    }
}

fn document_url(root: &str, collection: &str, id: &str) -> String {
    join_url(
        root,
        &format!(
            "{}/{}",
            urlencoding::encode(collection),
            urlencoding::encode(id)
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BackendConfig, BackendType, ClientOptions};

    fn provider() -> FirestoreProvider {
        let mut config = BackendConfig::defaults_for(BackendType::Firestore);
        config.project_id = "pantry-app".to_string();
        config.api_key = "AIza key".to_string();
        FirestoreProvider::new(config, &ClientOptions::default()).unwrap()
    }

    #[test]
    fn documents_root_layout() {
        assert_eq!(
            provider().build_documents_root(),
            "https://firestore.googleapis.com/v1/projects/pantry-app/databases/(default)/documents"
        );
    }

    #[test]
    fn query_carries_encoded_key_and_params() {
        let url = provider().with_query("https://x/foods", &[("pageToken", "a+b")]);
        assert_eq!(url, "https://x/foods?key=AIza%20key&pageToken=a%2Bb");
    }

    #[test]
    fn document_url_encodes_id() {
        assert_eq!(document_url("https://x/documents", "foods", "a/b"), "https://x/documents/foods/a%2Fb");
    }
}
