//! Hasura backend (GraphQL over Postgres)

mod error;
mod http;
mod provider;
mod query;
mod types;

use reqwest::Client;
use tokio::sync::OnceCell;

use crate::error::Result;
use crate::providers::common::create_http_client;
use crate::types::{BackendConfig, ClientOptions};

pub(crate) use types::{GraphQLError, GraphQLResponse};

/// Hasura backend
pub struct HasuraProvider {
    pub(crate) client: Client,
    pub(crate) config: BackendConfig,
    pub(crate) max_retries: u32,
    pub(crate) initialized: OnceCell<()>,
}

impl HasuraProvider {
    pub fn new(config: BackendConfig, options: &ClientOptions) -> Result<Self> {
        Ok(Self {
            client: create_http_client("hasura", options)?,
            config,
            max_retries: options.max_retries,
            initialized: OnceCell::new(),
        })
    }
}
