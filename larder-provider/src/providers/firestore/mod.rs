//! Google Cloud Firestore backend (REST v1)

mod error;
mod http;
mod provider;
mod types;

use reqwest::Client;
use tokio::sync::OnceCell;

use crate::error::Result;
use crate::providers::common::create_http_client;
use crate::types::{BackendConfig, ClientOptions};

pub(crate) use types::{Document, FirestoreErrorResponse, ListDocumentsResponse};

/// Firestore 单页最大文档数
pub(crate) const MAX_PAGE_SIZE: u32 = 300;

/// Firestore backend
pub struct FirestoreProvider {
    pub(crate) client: Client,
    pub(crate) config: BackendConfig,
    pub(crate) max_retries: u32,
    /// Resolved `{base}/projects/{id}/databases/(default)/documents`.
    pub(crate) documents_root: OnceCell<String>,
}

impl FirestoreProvider {
    pub fn new(config: BackendConfig, options: &ClientOptions) -> Result<Self> {
        Ok(Self {
            client: create_http_client("firestore", options)?,
            config,
            max_retries: options.max_retries,
            documents_root: OnceCell::new(),
        })
    }
}
