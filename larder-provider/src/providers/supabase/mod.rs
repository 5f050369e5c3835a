//! Supabase backend (`PostgREST` over Postgres)

mod error;
mod http;
mod provider;

use reqwest::Client;
use tokio::sync::OnceCell;

use crate::error::Result;
use crate::providers::common::create_http_client;
use crate::types::{BackendConfig, ClientOptions};

/// REST prefix under the project URL.
pub(crate) const REST_PATH: &str = "rest/v1";

/// Supabase backend
pub struct SupabaseProvider {
    pub(crate) client: Client,
    pub(crate) config: BackendConfig,
    pub(crate) max_retries: u32,
    pub(crate) initialized: OnceCell<()>,
}

impl SupabaseProvider {
    pub fn new(config: BackendConfig, options: &ClientOptions) -> Result<Self> {
        Ok(Self {
            client: create_http_client("supabase", options)?,
            config,
            max_retries: options.max_retries,
            initialized: OnceCell::new(),
        })
    }
}
