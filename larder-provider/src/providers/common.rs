//! Adapter 公共工具：HTTP client、实体字段表、规范化与排序

use std::cmp::Ordering;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;

use crate::error::{ProviderError, Result};
use crate::types::{ClientOptions, Food, Subscription};
use crate::utils::normalize::RecordView;

// ============ HTTP Client ============

/// 默认连接超时（秒）
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// 创建带超时配置的 HTTP Client
pub fn create_http_client(provider: &str, options: &ClientOptions) -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(options.request_timeout_secs.max(1)))
        .build()
        .map_err(|e| ProviderError::NetworkError {
            provider: provider.to_string(),
            detail: format!("Failed to build HTTP client: {e}"),
        })
}

/// Joins a base URL and a path without doubling or dropping the slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

// ============ 字段表 ============

/// Wire field names for one entity field, primary first.
/// An empty list means the backend has no such column.
pub type Aliases = &'static [&'static str];

/// Food field names for one backend.
#[derive(Debug)]
pub struct FoodSchema {
    pub id: Aliases,
    pub name: Aliases,
    pub price: Aliases,
    pub quantity: Aliases,
    pub shop: Aliases,
    pub expiry_date: Aliases,
    pub image_url: Aliases,
    pub image_hash: Aliases,
    pub description: Aliases,
    pub category: Aliases,
    pub storage_location: Aliases,
    pub note: Aliases,
    pub created_at: Aliases,
    pub updated_at: Aliases,
}

/// Subscription field names for one backend.
#[derive(Debug)]
pub struct SubscriptionSchema {
    pub id: Aliases,
    pub name: Aliases,
    pub url: Aliases,
    pub price: Aliases,
    pub account: Aliases,
    pub next_payment: Aliases,
    pub note: Aliases,
    pub created_at: Aliases,
    pub updated_at: Aliases,
}

/// Snake-case layout shared by the SQL-backed backends.
pub const SQL_FOOD_SCHEMA: FoodSchema = FoodSchema {
    id: &["id"],
    name: &["name", "food_name"],
    price: &["price", "price_yen"],
    quantity: &["quantity", "amount"],
    shop: &["shop_name", "shop"],
    expiry_date: &["expiry_date", "expiration_date", "best_before"],
    image_url: &["image_url", "photo_url"],
    image_hash: &["image_hash", "photo_hash"],
    description: &["description"],
    category: &["category"],
    storage_location: &["storage_location", "location"],
    note: &["note", "memo"],
    created_at: &["created_at"],
    updated_at: &["updated_at"],
};

pub const SQL_SUBSCRIPTION_SCHEMA: SubscriptionSchema = SubscriptionSchema {
    id: &["id"],
    name: &["name", "subscription_name", "service_name"],
    url: &["url", "site_url", "site"],
    price: &["price", "monthly_price"],
    account: &["account", "account_email"],
    next_payment: &["next_payment_date", "next_payment", "next_billing_date"],
    note: &["note", "memo"],
    created_at: &["created_at"],
    updated_at: &["updated_at"],
};

// ============ 写入 ============

/// Typed value of one outgoing field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Integer(u32),
    Timestamp(DateTime<Utc>),
}

/// Outgoing field list in backend naming.
///
/// Fields without a wire name are dropped. With `include_empty == false`
/// (creates) empty text and unset timestamps are left out as well.
pub struct FieldWriter {
    include_empty: bool,
    fields: Vec<(&'static str, FieldValue)>,
}

impl FieldWriter {
    pub fn new(include_empty: bool) -> Self {
        Self {
            include_empty,
            fields: Vec::new(),
        }
    }

    pub fn text(&mut self, aliases: Aliases, value: &str) -> &mut Self {
        if let Some(&name) = aliases.first()
            && (self.include_empty || !value.is_empty())
        {
            self.fields.push((name, FieldValue::Text(value.to_string())));
        }
        self
    }

    pub fn integer(&mut self, aliases: Aliases, value: u32) -> &mut Self {
        if let Some(&name) = aliases.first() {
            self.fields.push((name, FieldValue::Integer(value)));
        }
        self
    }

    pub fn timestamp(&mut self, aliases: Aliases, value: Option<DateTime<Utc>>) -> &mut Self {
        if let Some(&name) = aliases.first() {
            match value {
                Some(dt) => self.fields.push((name, FieldValue::Timestamp(dt))),
                None if self.include_empty => {
                    self.fields.push((name, FieldValue::Text(String::new())));
                }
                None => {}
            }
        }
        self
    }

    pub fn finish(&mut self) -> Vec<(&'static str, FieldValue)> {
        std::mem::take(&mut self.fields)
    }
}

pub fn food_fields(
    food: &Food,
    schema: &FoodSchema,
    include_empty: bool,
) -> Vec<(&'static str, FieldValue)> {
    let mut writer = FieldWriter::new(include_empty);
    writer
        .text(schema.name, food.name.trim())
        .integer(schema.price, food.price)
        .integer(schema.quantity, food.quantity)
        .text(schema.shop, &food.shop)
        .text(schema.expiry_date, &food.expiry_date)
        .text(schema.image_url, &food.image_url)
        .text(schema.image_hash, &food.image_hash)
        .text(schema.description, &food.description)
        .text(schema.category, &food.category)
        .text(schema.storage_location, &food.storage_location)
        .text(schema.note, &food.note)
        .timestamp(schema.created_at, food.created_at)
        .timestamp(schema.updated_at, food.updated_at)
        .finish()
}

pub fn subscription_fields(
    sub: &Subscription,
    schema: &SubscriptionSchema,
    include_empty: bool,
) -> Vec<(&'static str, FieldValue)> {
    let mut writer = FieldWriter::new(include_empty);
    writer
        .text(schema.name, sub.name.trim())
        .text(schema.url, &sub.url)
        .integer(schema.price, sub.price)
        .text(schema.account, &sub.account)
        .timestamp(schema.next_payment, sub.next_payment_at)
        .text(schema.note, &sub.note)
        .timestamp(schema.created_at, sub.created_at)
        .timestamp(schema.updated_at, sub.updated_at)
        .finish()
}

/// Plain JSON rendering used by `PostgREST` and GraphQL bodies.
pub fn fields_to_json(fields: Vec<(&'static str, FieldValue)>) -> serde_json::Value {
    let map = fields
        .into_iter()
        .map(|(name, value)| {
            let json = match value {
                FieldValue::Text(s) if s.is_empty() => serde_json::Value::Null,
                FieldValue::Text(s) => serde_json::Value::String(s),
                FieldValue::Integer(n) => serde_json::Value::from(n),
                FieldValue::Timestamp(dt) => serde_json::Value::String(dt.to_rfc3339()),
            };
            (name.to_string(), json)
        })
        .collect();
    serde_json::Value::Object(map)
}

/// Updates and deletes address a record by id; an empty one never reaches the wire.
pub fn require_id(provider: &str, id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(ProviderError::InvalidParameter {
            provider: provider.to_string(),
            param: "id".to_string(),
            detail: "id must not be empty".to_string(),
        });
    }
    Ok(())
}

// ============ 读取 ============

fn mapping_error(provider: &str, entity: &str, detail: &str) -> ProviderError {
    ProviderError::MappingError {
        provider: provider.to_string(),
        entity: entity.to_string(),
        detail: detail.to_string(),
    }
}

/// Normalizes one food record. `id` overrides the id lookup (Firestore keeps
/// ids outside the field map).
pub fn normalize_food(
    provider: &str,
    view: RecordView<'_>,
    schema: &FoodSchema,
    id: Option<String>,
) -> Result<Food> {
    let id = id.unwrap_or_else(|| view.string(schema.id));
    if id.is_empty() {
        return Err(mapping_error(provider, "food", "record has no id"));
    }
    let name = view.string(schema.name);
    if name.is_empty() {
        return Err(mapping_error(
            provider,
            "food",
            &format!("record {id} has no name"),
        ));
    }

    Ok(Food {
        id,
        name,
        price: view.uint(schema.price),
        quantity: view.uint(schema.quantity),
        shop: view.string(schema.shop),
        expiry_date: view.date(schema.expiry_date),
        image_url: view.string(schema.image_url),
        image_hash: view.string(schema.image_hash),
        description: view.string(schema.description),
        category: view.string(schema.category),
        storage_location: view.string(schema.storage_location),
        note: view.string(schema.note),
        created_at: view.timestamp(schema.created_at),
        updated_at: view.timestamp(schema.updated_at),
    })
}

pub fn normalize_subscription(
    provider: &str,
    view: RecordView<'_>,
    schema: &SubscriptionSchema,
    id: Option<String>,
) -> Result<Subscription> {
    let id = id.unwrap_or_else(|| view.string(schema.id));
    if id.is_empty() {
        return Err(mapping_error(provider, "subscription", "record has no id"));
    }
    let name = view.string(schema.name);
    if name.is_empty() {
        return Err(mapping_error(
            provider,
            "subscription",
            &format!("record {id} has no name"),
        ));
    }

    Ok(Subscription {
        id,
        name,
        url: view.string(schema.url),
        price: view.uint(schema.price),
        account: view.string(schema.account),
        next_payment_at: view.timestamp(schema.next_payment),
        note: view.string(schema.note),
        created_at: view.timestamp(schema.created_at),
        updated_at: view.timestamp(schema.updated_at),
    })
}

/// Keeps the records that normalized; logs and drops the rest.
pub fn keep_mapped<T>(provider: &str, results: impl IntoIterator<Item = Result<T>>) -> Vec<T> {
    let mut skipped = 0usize;
    let items: Vec<T> = results
        .into_iter()
        .filter_map(|result| match result {
            Ok(item) => Some(item),
            Err(e) => {
                skipped += 1;
                log::warn!("[{provider}] Skipping record: {e}");
                None
            }
        })
        .collect();
    if skipped > 0 {
        log::warn!("[{provider}] {skipped} record(s) skipped during normalization");
    }
    items
}

// ============ 排序 ============

/// Next payment ascending (unset last), then id.
/// All-digit ids sort numerically and come before any other id.
pub fn sort_subscriptions(subscriptions: &mut [Subscription]) {
    subscriptions.sort_by(|a, b| {
        match (a.next_payment_at, b.next_payment_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| compare_ids(&a.id, &b.id))
    });
}

fn compare_ids(a: &str, b: &str) -> Ordering {
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|c| c.is_ascii_digit());
    match (digits(a), digits(b)) {
        (true, true) => {
            // 不经过 u64，超长的数字 id 也能比较
            let x = a.trim_start_matches('0');
            let y = b.trim_start_matches('0');
            x.len()
                .cmp(&y.len())
                .then_with(|| x.cmp(y))
                .then_with(|| a.cmp(b))
        }
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(day: u32) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap())
    }

    fn sub(id: &str, next: Option<DateTime<Utc>>) -> Subscription {
        Subscription {
            id: id.to_string(),
            name: id.to_string(),
            next_payment_at: next,
            ..Subscription::default()
        }
    }

    #[test]
    fn join_url_handles_slashes() {
        assert_eq!(join_url("https://a.io/", "/rest/v1"), "https://a.io/rest/v1");
        assert_eq!(join_url("https://a.io", "rest/v1"), "https://a.io/rest/v1");
    }

    #[test]
    fn sorts_by_next_payment_then_id() {
        let mut subs = vec![
            sub("10", at(5)),
            sub("b", None),
            sub("9", at(5)),
            sub("a", None),
            sub("1", at(2)),
        ];
        sort_subscriptions(&mut subs);
        let ids: Vec<_> = subs.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "9", "10", "a", "b"]);
    }

    #[test]
    fn sort_is_deterministic_across_input_orders() {
        let mut first = vec![sub("x", at(3)), sub("y", at(3)), sub("z", None)];
        let mut second = vec![sub("z", None), sub("y", at(3)), sub("x", at(3))];
        sort_subscriptions(&mut first);
        sort_subscriptions(&mut second);
        assert_eq!(first, second);
    }

    #[test]
    fn mixed_ids_on_same_date_sort_the_same_from_any_order() {
        let orders = [["9", "10", "1a"], ["1a", "9", "10"], ["10", "1a", "9"]];
        for order in orders {
            let mut subs: Vec<_> = order.iter().map(|id| sub(id, at(4))).collect();
            sort_subscriptions(&mut subs);
            let ids: Vec<_> = subs.iter().map(|s| s.id.as_str()).collect();
            assert_eq!(ids, vec!["9", "10", "1a"], "input order {order:?}");
        }
    }

    #[test]
    fn numeric_ids_ignore_leading_zeros_and_overflow() {
        assert_eq!(compare_ids("007", "10"), Ordering::Less);
        assert_eq!(compare_ids("007", "7"), Ordering::Less);
        assert_eq!(
            compare_ids("99999999999999999999999", "100000000000000000000000"),
            Ordering::Less
        );
        assert_eq!(compare_ids("123", "abc"), Ordering::Less);
        assert_eq!(compare_ids("b", "a"), Ordering::Greater);
    }

    #[test]
    fn normalize_food_defaults_missing_fields() {
        let raw = json!({ "id": 7, "name": " Tofu ", "price": "-3" });
        let view = RecordView::from_value(&raw).unwrap();
        let food = normalize_food("test", view, &SQL_FOOD_SCHEMA, None).unwrap();
        assert_eq!(food.id, "7");
        assert_eq!(food.name, "Tofu");
        assert_eq!(food.price, 0);
        assert_eq!(food.shop, "");
        assert_eq!(food.expiry_date, "");
        assert_eq!(food.created_at, None);
    }

    #[test]
    fn normalize_food_rejects_blank_name_and_missing_id() {
        let blank = json!({ "id": 1, "name": "  " });
        let no_id = json!({ "name": "Bread" });
        let err = normalize_food(
            "test",
            RecordView::from_value(&blank).unwrap(),
            &SQL_FOOD_SCHEMA,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ProviderError::MappingError { .. }));
        assert!(
            normalize_food(
                "test",
                RecordView::from_value(&no_id).unwrap(),
                &SQL_FOOD_SCHEMA,
                None
            )
            .is_err()
        );
    }

    #[test]
    fn keep_mapped_skips_failures() {
        let results: Vec<Result<u32>> = vec![
            Ok(1),
            Err(mapping_error("t", "food", "broken")),
            Ok(3),
        ];
        assert_eq!(keep_mapped("t", results), vec![1, 3]);
    }

    #[test]
    fn create_fields_omit_empty_and_unsupported() {
        let schema = FoodSchema {
            image_hash: &[],
            ..SQL_FOOD_SCHEMA
        };
        let mut food = Food::new("Apple");
        food.image_hash = "abc".to_string();
        food.price = 0;
        let fields = food_fields(&food, &schema, false);
        let names: Vec<_> = fields.iter().map(|(n, _)| *n).collect();
        assert!(names.contains(&"name"));
        assert!(names.contains(&"price"));
        assert!(!names.contains(&"image_hash"));
        assert!(!names.contains(&"shop_name"));
    }

    #[test]
    fn update_fields_include_empty_as_null() {
        let food = Food {
            id: "1".to_string(),
            name: "Apple".to_string(),
            ..Food::default()
        };
        let body = fields_to_json(food_fields(&food, &SQL_FOOD_SCHEMA, true));
        assert_eq!(body["shop_name"], serde_json::Value::Null);
        assert_eq!(body["price"], json!(0));
        assert!(body.get("id").is_none());
    }

    #[test]
    fn subscription_next_payment_written_as_timestamp() {
        let mut s = Subscription::new("Video");
        s.next_payment_at = at(20);
        let body = fields_to_json(subscription_fields(&s, &SQL_SUBSCRIPTION_SCHEMA, false));
        assert_eq!(body["next_payment_date"], json!("2025-01-20T00:00:00+00:00"));
    }
}
