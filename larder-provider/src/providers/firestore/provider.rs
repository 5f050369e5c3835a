//! Firestore `BackendService` 实现

use async_trait::async_trait;

use crate::error::{ProviderError, Result};
use crate::providers::common::{
    FoodSchema, SubscriptionSchema, food_fields, keep_mapped, normalize_food,
    normalize_subscription, require_id, sort_subscriptions, subscription_fields,
};
use crate::traits::{BackendService, ProviderErrorMapper};
use crate::types::{BackendMetadata, BackendType, ConnectionCheck, Food, Subscription};
use crate::utils::normalize::RecordView;

use super::types::encode_fields;
use super::{Document, FirestoreProvider};

/// Documents are written in camelCase; older documents use snake_case.
const FOOD_SCHEMA: FoodSchema = FoodSchema {
    id: &["id"],
    name: &["name", "foodName", "food_name"],
    price: &["price"],
    quantity: &["quantity", "amount"],
    shop: &["shopName", "shop", "shop_name"],
    expiry_date: &["expiryDate", "expirationDate", "expiry_date"],
    image_url: &["imageUrl", "photoUrl", "image_url"],
    image_hash: &["imageHash", "image_hash"],
    description: &["description"],
    category: &["category"],
    storage_location: &["storageLocation", "location", "storage_location"],
    note: &["note", "memo"],
    created_at: &["createdAt", "created_at"],
    updated_at: &["updatedAt", "updated_at"],
};

const SUBSCRIPTION_SCHEMA: SubscriptionSchema = SubscriptionSchema {
    id: &["id"],
    name: &["name", "serviceName", "service_name"],
    url: &["url", "siteUrl", "site_url"],
    price: &["price", "monthlyPrice"],
    account: &["account", "accountEmail"],
    next_payment: &["nextPaymentDate", "nextPayment", "next_payment_date"],
    note: &["note", "memo"],
    created_at: &["createdAt", "created_at"],
    updated_at: &["updatedAt", "updated_at"],
};

impl FirestoreProvider {
    /// Resolves and caches the documents root, probing it once.
    async fn documents_root(&self) -> Result<&str> {
        let root = self
            .documents_root
            .get_or_try_init(|| async {
                let missing = self.config.missing_fields();
                if !missing.is_empty() {
                    return Err(ProviderError::NotConfigured {
                        provider: self.provider_name().to_string(),
                        missing: missing.into_iter().map(String::from).collect(),
                    });
                }
                let root = self.build_documents_root();
                self.list_page(&root, &self.config.food_collection, 1, None)
                    .await?;
                log::info!("[{}] Resolved database {root}", self.provider_name());
                Ok(root)
            })
            .await?;
        Ok(root.as_str())
    }

    /// Server timestamps fill in when the document carries none of its own.
    fn document_to_food(&self, doc: &Document) -> Result<Food> {
        let mut food = normalize_food(
            self.provider_name(),
            RecordView::new(&doc.fields),
            &FOOD_SCHEMA,
            doc.id(),
        )?;
        food.created_at = food.created_at.or(doc.create_time);
        food.updated_at = food.updated_at.or(doc.update_time);
        Ok(food)
    }

    fn document_to_subscription(&self, doc: &Document) -> Result<Subscription> {
        let mut sub = normalize_subscription(
            self.provider_name(),
            RecordView::new(&doc.fields),
            &SUBSCRIPTION_SCHEMA,
            doc.id(),
        )?;
        sub.created_at = sub.created_at.or(doc.create_time);
        sub.updated_at = sub.updated_at.or(doc.update_time);
        Ok(sub)
    }
}

#[async_trait]
impl BackendService for FirestoreProvider {
    fn service_name(&self) -> &'static str {
        "Firestore"
    }

    fn service_type(&self) -> BackendType {
        BackendType::Firestore
    }

    fn metadata() -> BackendMetadata {
        BackendMetadata {
            backend: BackendType::Firestore,
            name: "Firestore".to_string(),
            description: "Google Cloud Firestore documents over the REST API".to_string(),
            required_fields: [
                "baseUrl",
                "apiKey",
                "projectId",
                "foodCollection",
                "subscriptionCollection",
            ]
            .map(String::from)
            .to_vec(),
            server_side_ordering: false,
        }
    }

    async fn initialize(&self) -> Result<()> {
        self.documents_root().await?;
        Ok(())
    }

    async fn test_connection(&self) -> ConnectionCheck {
        let probe = async {
            let root = self.documents_root().await?;
            self.list_page(root, &self.config.food_collection, 1, None)
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
        let root = self.documents_root().await?;
        let docs = self
            .list_documents(root, &self.config.food_collection)
            .await?;
        Ok(keep_mapped(
            self.provider_name(),
            docs.iter().map(|doc| self.document_to_food(doc)),
        ))
    }

    async fn create_food(&self, food: &Food) -> Result<Food> {
        let root = self.documents_root().await?;
        let body = encode_fields(food_fields(food, &FOOD_SCHEMA, false));
        let doc = self
            .create_document(root, &self.config.food_collection, &body)
            .await?;
        self.document_to_food(&doc)
    }

    async fn update_food(&self, food: &Food) -> Result<Food> {
        require_id(self.provider_name(), &food.id)?;
        let root = self.documents_root().await?;
        let fields = food_fields(food, &FOOD_SCHEMA, true);
        let paths: Vec<&'static str> = fields.iter().map(|(name, _)| *name).collect();
        let doc = self
            .patch_document(
                root,
                &self.config.food_collection,
                &food.id,
                &encode_fields(fields),
                &paths,
            )
            .await?;
        self.document_to_food(&doc)
    }

    async fn delete_food(&self, id: &str) -> Result<()> {
        require_id(self.provider_name(), id)?;
        let root = self.documents_root().await?;
        self.delete_document(root, &self.config.food_collection, id)
            .await
    }

    /// Firestore REST cannot order and page a collection listing by an
    /// arbitrary field, so ordering happens here.
    async fn get_subscriptions(&self) -> Result<Vec<Subscription>> {
        let root = self.documents_root().await?;
        let docs = self
            .list_documents(root, &self.config.subscription_collection)
            .await?;
        let mut subscriptions = keep_mapped(
            self.provider_name(),
            docs.iter().map(|doc| self.document_to_subscription(doc)),
        );
        sort_subscriptions(&mut subscriptions);
        Ok(subscriptions)
    }

    async fn create_subscription(&self, subscription: &Subscription) -> Result<Subscription> {
        let root = self.documents_root().await?;
        let body = encode_fields(subscription_fields(
            subscription,
            &SUBSCRIPTION_SCHEMA,
            false,
        ));
        let doc = self
            .create_document(root, &self.config.subscription_collection, &body)
            .await?;
        self.document_to_subscription(&doc)
    }

    async fn update_subscription(&self, subscription: &Subscription) -> Result<Subscription> {
        require_id(self.provider_name(), &subscription.id)?;
        let root = self.documents_root().await?;
        let fields = subscription_fields(subscription, &SUBSCRIPTION_SCHEMA, true);
        let paths: Vec<&'static str> = fields.iter().map(|(name, _)| *name).collect();
        let doc = self
            .patch_document(
                root,
                &self.config.subscription_collection,
                &subscription.id,
                &encode_fields(fields),
                &paths,
            )
            .await?;
        self.document_to_subscription(&doc)
    }

    async fn delete_subscription(&self, id: &str) -> Result<()> {
        require_id(self.provider_name(), id)?;
        let root = self.documents_root().await?;
        self.delete_document(root, &self.config.subscription_collection, id)
            .await
    }
}
