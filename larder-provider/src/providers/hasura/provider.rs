//! Hasura `BackendService` 实现

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::{ProviderError, Result};
use crate::providers::common::{
    fields_to_json, food_fields, keep_mapped, normalize_food, normalize_subscription, require_id,
    sort_subscriptions, subscription_fields,
};
use crate::traits::{BackendService, ErrorContext, ProviderErrorMapper, RawApiError};
use crate::types::{BackendMetadata, BackendType, ConnectionCheck, Food, Subscription};
use crate::utils::normalize::RecordView;

use super::HasuraProvider;
use super::query::{
    FOOD_SCHEMA, SUBSCRIPTION_SCHEMA, delete_mutation, food_selection, insert_mutation,
    is_valid_name, list_query, probe_query, subscription_selection, update_mutation,
};

const FOOD_ORDER: &str = "{id: asc}";
const SUBSCRIPTION_ORDER: &str = "[{next_payment_date: asc_nulls_last}, {id: asc}]";

impl HasuraProvider {
    fn food_table(&self) -> &str {
        &self.config.food_collection
    }

    fn subscription_table(&self) -> &str {
        &self.config.subscription_collection
    }

    fn check_tables(&self) -> Result<()> {
        for table in [self.food_table(), self.subscription_table()] {
            if !is_valid_name(table) {
                return Err(ProviderError::InvalidParameter {
                    provider: self.provider_name().to_string(),
                    param: "collection".to_string(),
                    detail: format!("'{table}' is not a valid GraphQL table name"),
                });
            }
        }
        Ok(())
    }

    fn rows(&self, value: Value, what: &str) -> Result<Vec<Value>> {
        match value {
            Value::Array(rows) => Ok(rows),
            other => Err(self.parse_error(format!("{what}: expected a list, got {other}"))),
        }
    }

    /// `{ affected_rows, returning: [row] }`; zero rows means unknown id.
    fn returned_row(&self, value: Value, id: &str) -> Result<Value> {
        let affected = value
            .get("affected_rows")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let row = value
            .get("returning")
            .and_then(Value::as_array)
            .and_then(|rows| rows.first())
            .cloned();
        match row {
            Some(row) if affected > 0 => Ok(row),
            _ => Err(self.map_status(
                RawApiError::new(404, "no rows matched"),
                ErrorContext::record(id),
            )),
        }
    }

    fn row_to_food(&self, row: &Value) -> Result<Food> {
        let view = RecordView::from_value(row)
            .ok_or_else(|| self.parse_error(format!("food row is not an object: {row}")))?;
        normalize_food(self.provider_name(), view, &FOOD_SCHEMA, None)
    }

    fn row_to_subscription(&self, row: &Value) -> Result<Subscription> {
        let view = RecordView::from_value(row)
            .ok_or_else(|| self.parse_error(format!("subscription row is not an object: {row}")))?;
        normalize_subscription(self.provider_name(), view, &SUBSCRIPTION_SCHEMA, None)
    }

    async fn delete_by_id(&self, table: &str, id: &str) -> Result<()> {
        let data = self
            .execute(
                "delete",
                &delete_mutation(table, id),
                None,
                ErrorContext::record(id),
            )
            .await?;
        let result = self.take_field(data, &format!("delete_{table}"))?;
        if result.get("affected_rows").and_then(Value::as_u64).unwrap_or(0) == 0 {
            return Err(self.map_status(
                RawApiError::new(404, "no rows matched"),
                ErrorContext::record(id),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl BackendService for HasuraProvider {
    fn service_name(&self) -> &'static str {
        "Hasura"
    }

    fn service_type(&self) -> BackendType {
        BackendType::Hasura
    }

    fn metadata() -> BackendMetadata {
        BackendMetadata {
            backend: BackendType::Hasura,
            name: "Hasura".to_string(),
            description: "Postgres tables through the Hasura GraphQL engine".to_string(),
            required_fields: ["baseUrl", "apiKey", "foodCollection", "subscriptionCollection"]
                .map(String::from)
                .to_vec(),
            server_side_ordering: true,
        }
    }

    /// Checks the configuration and runs a `{ __typename }` probe once.
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
                self.check_tables()?;
                let data = self
                    .execute(
                        "typename",
                        "query { __typename }",
                        None,
                        ErrorContext::default(),
                    )
                    .await?;
                log::info!(
                    "[{}] Initialized, root type {}",
                    self.provider_name(),
                    data.get("__typename").and_then(Value::as_str).unwrap_or("?")
                );
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn test_connection(&self) -> ConnectionCheck {
        let probe = async {
            self.initialize().await?;
            self.execute(
                "probe",
                &probe_query(self.food_table()),
                None,
                ErrorContext::default(),
            )
            .await?;
            Ok::<_, ProviderError>(())
        };
        match probe.await {
            Ok(()) => ConnectionCheck::ok(),
            Err(e) => {
                log::warn!("[{}] Connection test failed: {e}", self.provider_name());
                ConnectionCheck::failed(e)
            }
        }
    }

    async fn get_foods(&self) -> Result<Vec<Food>> {
        self.initialize().await?;
        let table = self.food_table();
        let data = self
            .execute(
                "list foods",
                &list_query(table, &food_selection(), FOOD_ORDER),
                None,
                ErrorContext::default(),
            )
            .await?;
        let rows = self.rows(self.take_field(data, table)?, table)?;
        Ok(keep_mapped(
            self.provider_name(),
            rows.iter().map(|row| self.row_to_food(row)),
        ))
    }

    async fn create_food(&self, food: &Food) -> Result<Food> {
        self.initialize().await?;
        let table = self.food_table();
        let object = fields_to_json(food_fields(food, &FOOD_SCHEMA, false));
        let data = self
            .execute(
                "insert food",
                &insert_mutation(table, &food_selection()),
                Some(&json!({ "object": object })),
                ErrorContext::default(),
            )
            .await?;
        let row = self.take_field(data, &format!("insert_{table}_one"))?;
        self.row_to_food(&row)
    }

    async fn update_food(&self, food: &Food) -> Result<Food> {
        require_id(self.provider_name(), &food.id)?;
        self.initialize().await?;
        let table = self.food_table();
        let set = fields_to_json(food_fields(food, &FOOD_SCHEMA, true));
        let data = self
            .execute(
                "update food",
                &update_mutation(table, &food.id, &food_selection()),
                Some(&json!({ "set": set })),
                ErrorContext::record(&food.id),
            )
            .await?;
        let result = self.take_field(data, &format!("update_{table}"))?;
        self.row_to_food(&self.returned_row(result, &food.id)?)
    }

    async fn delete_food(&self, id: &str) -> Result<()> {
        require_id(self.provider_name(), id)?;
        self.initialize().await?;
        self.delete_by_id(self.food_table(), id).await
    }

    async fn get_subscriptions(&self) -> Result<Vec<Subscription>> {
        self.initialize().await?;
        let table = self.subscription_table();
        let data = self
            .execute(
                "list subscriptions",
                &list_query(table, &subscription_selection(), SUBSCRIPTION_ORDER),
                None,
                ErrorContext::default(),
            )
            .await?;
        let rows = self.rows(self.take_field(data, table)?, table)?;
        let mut subscriptions = keep_mapped(
            self.provider_name(),
            rows.iter().map(|row| self.row_to_subscription(row)),
        );
        sort_subscriptions(&mut subscriptions);
        Ok(subscriptions)
    }

    async fn create_subscription(&self, subscription: &Subscription) -> Result<Subscription> {
        self.initialize().await?;
        let table = self.subscription_table();
        let object = fields_to_json(subscription_fields(
            subscription,
            &SUBSCRIPTION_SCHEMA,
            false,
        ));
        let data = self
            .execute(
                "insert subscription",
                &insert_mutation(table, &subscription_selection()),
                Some(&json!({ "object": object })),
                ErrorContext::default(),
            )
            .await?;
        let row = self.take_field(data, &format!("insert_{table}_one"))?;
        self.row_to_subscription(&row)
    }

    async fn update_subscription(&self, subscription: &Subscription) -> Result<Subscription> {
        require_id(self.provider_name(), &subscription.id)?;
        self.initialize().await?;
        let table = self.subscription_table();
        let set = fields_to_json(subscription_fields(
            subscription,
            &SUBSCRIPTION_SCHEMA,
            true,
        ));
        let data = self
            .execute(
                "update subscription",
                &update_mutation(table, &subscription.id, &subscription_selection()),
                Some(&json!({ "set": set })),
                ErrorContext::record(&subscription.id),
            )
            .await?;
        let result = self.take_field(data, &format!("update_{table}"))?;
        self.row_to_subscription(&self.returned_row(result, &subscription.id)?)
    }

    async fn delete_subscription(&self, id: &str) -> Result<()> {
        require_id(self.provider_name(), id)?;
        self.initialize().await?;
        self.delete_by_id(self.subscription_table(), id).await
    }
}
