//! Supabase `BackendService` 实现

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::error::{ProviderError, Result};
use crate::providers::common::{
    SQL_FOOD_SCHEMA, SQL_SUBSCRIPTION_SCHEMA, fields_to_json, food_fields, join_url, keep_mapped,
    normalize_food, normalize_subscription, require_id, sort_subscriptions, subscription_fields,
};
use crate::traits::{BackendService, ErrorContext, ProviderErrorMapper};
use crate::types::{BackendMetadata, BackendType, ConnectionCheck, Food, Subscription};
use crate::utils::normalize::RecordView;

use super::{REST_PATH, SupabaseProvider};

/// Subscriptions come back pre-sorted; the client sort only fixes up ties.
const SUBSCRIPTION_ORDER: &str = "order=next_payment_date.asc.nullslast,id.asc";

impl SupabaseProvider {
    fn row_to_food(&self, row: &Value) -> Result<Food> {
        let view = RecordView::from_value(row)
            .ok_or_else(|| self.parse_error(format!("food row is not an object: {row}")))?;
        normalize_food(self.provider_name(), view, &SQL_FOOD_SCHEMA, None)
    }

    fn row_to_subscription(&self, row: &Value) -> Result<Subscription> {
        let view = RecordView::from_value(row)
            .ok_or_else(|| self.parse_error(format!("subscription row is not an object: {row}")))?;
        normalize_subscription(self.provider_name(), view, &SQL_SUBSCRIPTION_SCHEMA, None)
    }
}

#[async_trait]
impl BackendService for SupabaseProvider {
    fn service_name(&self) -> &'static str {
        "Supabase"
    }

    fn service_type(&self) -> BackendType {
        BackendType::Supabase
    }

    fn metadata() -> BackendMetadata {
        BackendMetadata {
            backend: BackendType::Supabase,
            name: "Supabase".to_string(),
            description: "Postgres tables through the PostgREST API".to_string(),
            required_fields: ["baseUrl", "apiKey", "foodCollection", "subscriptionCollection"]
                .map(String::from)
                .to_vec(),
            server_side_ordering: true,
        }
    }

    /// Checks the configuration, then probes the REST root once.
    async fn initialize(&self) -> Result<()> {
        self.initialized
            .get_or_try_init(|| async {
                let missing = self.config.missing_fields();
                if !missing.is_empty() {
                    return Err(ProviderError::NotConfigured {
                        provider: self.provider_name().to_string(),
                        missing: missing.into_iter().map(String::from).collect(),
                    });
                }
                let root = join_url(&self.config.base_url, &format!("{REST_PATH}/"));
                self.request(Method::GET, &root, None, ErrorContext::default())
                    .await?;
                log::info!(
                    "[{}] Initialized against {}",
                    self.provider_name(),
                    self.config.base_url
                );
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn test_connection(&self) -> ConnectionCheck {
        let probe = async {
            self.initialize().await?;
            self.select(&self.config.food_collection, "select=id&limit=1")
                .await?;
            Ok::<_, ProviderError>(())
        };
        match probe.await {
            Ok(_) => ConnectionCheck::ok(),
            Err(e) => {
                log::warn!("[{}] Connection test failed: {e}", self.provider_name());
                ConnectionCheck::failed(e)
            }
        }
    }

    async fn get_foods(&self) -> Result<Vec<Food>> {
        self.initialize().await?;
        let rows = self
            .select(&self.config.food_collection, "select=*&order=id.asc")
            .await?;
        Ok(keep_mapped(
            self.provider_name(),
            rows.iter().map(|row| self.row_to_food(row)),
        ))
    }

    async fn create_food(&self, food: &Food) -> Result<Food> {
        self.initialize().await?;
        let body = fields_to_json(food_fields(food, &SQL_FOOD_SCHEMA, false));
        let row = self.insert(&self.config.food_collection, &body).await?;
        self.row_to_food(&row)
    }

    async fn update_food(&self, food: &Food) -> Result<Food> {
        require_id(self.provider_name(), &food.id)?;
        self.initialize().await?;
        let body = fields_to_json(food_fields(food, &SQL_FOOD_SCHEMA, true));
        let row = self
            .update_by_id(&self.config.food_collection, &food.id, &body)
            .await?;
        self.row_to_food(&row)
    }

    async fn delete_food(&self, id: &str) -> Result<()> {
        require_id(self.provider_name(), id)?;
        self.initialize().await?;
        self.delete_by_id(&self.config.food_collection, id).await
    }

    async fn get_subscriptions(&self) -> Result<Vec<Subscription>> {
        self.initialize().await?;
        let rows = self
            .select(
                &self.config.subscription_collection,
                &format!("select=*&{SUBSCRIPTION_ORDER}"),
            )
            .await?;
        let mut subscriptions = keep_mapped(
            self.provider_name(),
            rows.iter().map(|row| self.row_to_subscription(row)),
        );
        sort_subscriptions(&mut subscriptions);
        Ok(subscriptions)
    }

    async fn create_subscription(&self, subscription: &Subscription) -> Result<Subscription> {
        self.initialize().await?;
        let body = fields_to_json(subscription_fields(
            subscription,
            &SQL_SUBSCRIPTION_SCHEMA,
            false,
        ));
        let row = self
            .insert(&self.config.subscription_collection, &body)
            .await?;
        self.row_to_subscription(&row)
    }

    async fn update_subscription(&self, subscription: &Subscription) -> Result<Subscription> {
        require_id(self.provider_name(), &subscription.id)?;
        self.initialize().await?;
        let body = fields_to_json(subscription_fields(
            subscription,
            &SQL_SUBSCRIPTION_SCHEMA,
            true,
        ));
        let row = self
            .update_by_id(&self.config.subscription_collection, &subscription.id, &body)
            .await?;
        self.row_to_subscription(&row)
    }

    async fn delete_subscription(&self, id: &str) -> Result<()> {
        require_id(self.provider_name(), id)?;
        self.initialize().await?;
        self.delete_by_id(&self.config.subscription_collection, id)
            .await
    }
}
