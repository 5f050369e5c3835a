use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============ Backend Types ============

/// Identifies which backend implementation to use.
///
/// Persisted as an integer code so settings files stay stable across renames.
/// An unknown code (written by a newer version) reads back as the default
/// backend instead of failing the whole document.
/// Every variant exists regardless of enabled features; the factory reports
/// [`ProviderError::UnsupportedProvider`](crate::ProviderError::UnsupportedProvider)
/// when the matching adapter was compiled out.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, Hash)]
#[serde(into = "u8")]
pub enum BackendType {
    /// Google Cloud Firestore (document store, REST v1).
    Firestore,
    /// Supabase (Postgres-as-a-service via `PostgREST`).
    #[default]
    Supabase,
    /// Hasura / Nhost (GraphQL `BaaS`).
    Hasura,
}

impl BackendType {
    /// All known backend types, in code order.
    pub const ALL: [Self; 3] = [Self::Firestore, Self::Supabase, Self::Hasura];

    /// Integer code used in persisted settings.
    pub const fn code(self) -> u8 {
        match self {
            Self::Firestore => 0,
            Self::Supabase => 1,
            Self::Hasura => 2,
        }
    }

    /// Resolves a persisted integer code.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Firestore),
            1 => Some(Self::Supabase),
            2 => Some(Self::Hasura),
            _ => None,
        }
    }
}

impl From<BackendType> for u8 {
    fn from(value: BackendType) -> Self {
        value.code()
    }
}

impl TryFrom<u8> for BackendType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_code(value).ok_or_else(|| format!("unknown backend code: {value}"))
    }
}

impl<'de> Deserialize<'de> for BackendType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct CodeVisitor;

        impl serde::de::Visitor<'_> for CodeVisitor {
            type Value = BackendType;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("an integer backend code")
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<BackendType, E> {
                let known = u8::try_from(v).ok().and_then(BackendType::from_code);
                Ok(known.unwrap_or_else(|| {
                    log::warn!(
                        "unknown backend code {v}, using {}",
                        BackendType::default()
                    );
                    BackendType::default()
                }))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<BackendType, E> {
                // 负数一律视为未知
                self.visit_u64(u64::try_from(v).unwrap_or(u64::MAX))
            }
        }

        deserializer.deserialize_u64(CodeVisitor)
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Firestore => write!(f, "firestore"),
            Self::Supabase => write!(f, "supabase"),
            Self::Hasura => write!(f, "hasura"),
        }
    }
}

// ============ Backend Configuration ============

/// Default Firestore REST endpoint.
pub const FIRESTORE_DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";
/// Placeholder Supabase project URL.
pub const SUPABASE_DEFAULT_BASE_URL: &str = "https://your-project.supabase.co";
/// Placeholder Hasura GraphQL endpoint.
pub const HASURA_DEFAULT_BASE_URL: &str = "https://your-project.hasura.app/v1/graphql";
/// Default collection / table holding foods.
pub const DEFAULT_FOOD_COLLECTION: &str = "foods";
/// Default collection / table holding subscriptions.
pub const DEFAULT_SUBSCRIPTION_COLLECTION: &str = "subscriptions";

/// Everything an adapter needs to reach its backend.
///
/// Field meaning depends on the backend:
///
/// | Field | Firestore | Supabase | Hasura |
/// |-------|-----------|----------|--------|
/// | `base_url` | REST root | project URL | GraphQL endpoint |
/// | `project_id` | GCP project | unused | unused |
/// | `api_key` | Web API key | anon / service key | admin secret |
/// | `*_collection` | collection id | table name | table name |
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendConfig {
    pub backend: BackendType,
    pub base_url: String,
    pub project_id: String,
    pub api_key: String,
    pub food_collection: String,
    pub subscription_collection: String,
}

impl BackendConfig {
    /// Built-in defaults for a backend. The key is left empty, so the config
    /// reports as not configured until the user supplies one.
    pub fn defaults_for(backend: BackendType) -> Self {
        let base_url = match backend {
            BackendType::Firestore => FIRESTORE_DEFAULT_BASE_URL,
            BackendType::Supabase => SUPABASE_DEFAULT_BASE_URL,
            BackendType::Hasura => HASURA_DEFAULT_BASE_URL,
        };
        Self {
            backend,
            base_url: base_url.to_string(),
            project_id: String::new(),
            api_key: String::new(),
            food_collection: DEFAULT_FOOD_COLLECTION.to_string(),
            subscription_collection: DEFAULT_SUBSCRIPTION_COLLECTION.to_string(),
        }
    }

    /// Names of required fields that are currently empty for the selected backend.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let mut check = |value: &str, name: &'static str| {
            if value.trim().is_empty() {
                missing.push(name);
            }
        };
        check(&self.base_url, "baseUrl");
        check(&self.api_key, "apiKey");
        if self.backend == BackendType::Firestore {
            check(&self.project_id, "projectId");
        }
        check(&self.food_collection, "foodCollection");
        check(&self.subscription_collection, "subscriptionCollection");
        missing
    }

    /// True iff every field required by the selected backend is non-empty.
    pub fn is_configured(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::defaults_for(BackendType::default())
    }
}

/// Transport tuning shared by all adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Retries for transient failures (0 disables retrying).
    pub max_retries: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            max_retries: 2,
        }
    }
}

// ============ Backend Metadata ============

/// Describes a backend and which configuration fields it needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendMetadata {
    pub backend: BackendType,
    /// Display name.
    pub name: String,
    pub description: String,
    /// `BackendConfig` fields this backend reads, in camelCase.
    pub required_fields: Vec<String>,
    /// Whether the backend can order subscriptions server-side.
    pub server_side_ordering: bool,
}

// ============ Canonical Entities ============

/// A food item in the inventory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Food {
    /// Backend-assigned identifier, kept verbatim.
    pub id: String,
    pub name: String,
    pub price: u32,
    pub quantity: u32,
    pub shop: String,
    /// Expiry date, `YYYY-MM-DD` when the backend value was parseable.
    pub expiry_date: String,
    pub image_url: String,
    pub image_hash: String,
    pub description: String,
    pub category: String,
    pub storage_location: String,
    pub note: String,
    #[serde(with = "crate::utils::datetime")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::utils::datetime")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Food {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            created_at: Some(now),
            updated_at: Some(now),
            ..Self::default()
        }
    }

    /// Stamps `updated_at`, never moving it backwards.
    pub fn touch(&mut self) {
        self.updated_at = Some(monotonic_now(self.created_at, self.updated_at));
    }
}

/// A recurring subscription.
///
/// The next payment is stored once as a timestamp; the date-only form is
/// derived from it by [`Subscription::next_payment_date`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Subscription {
    pub id: String,
    pub name: String,
    pub url: String,
    pub price: u32,
    /// Account / login used for the service. Backend-specific, may be empty.
    pub account: String,
    #[serde(with = "crate::utils::datetime")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_payment_at: Option<DateTime<Utc>>,
    pub note: String,
    #[serde(with = "crate::utils::datetime")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::utils::datetime")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Subscription {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            created_at: Some(now),
            updated_at: Some(now),
            ..Self::default()
        }
    }

    /// Date-only form of the next payment (`YYYY-MM-DD`), empty when unset.
    pub fn next_payment_date(&self) -> String {
        self.next_payment_at
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }

    pub fn touch(&mut self) {
        self.updated_at = Some(monotonic_now(self.created_at, self.updated_at));
    }
}

fn monotonic_now(
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
) -> DateTime<Utc> {
    [created_at, updated_at]
        .into_iter()
        .flatten()
        .fold(Utc::now(), std::cmp::max)
}

// ============ Contract Results ============

/// Outcome of a connection probe. Never an error: failures are captured here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionCheck {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectionCheck {
    pub fn ok() -> Self {
        Self {
            healthy: true,
            error: None,
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            healthy: false,
            error: Some(error.to_string()),
        }
    }
}

/// Result of a batch create operation.
///
/// Contains both successfully created items and any per-item failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateResult<T> {
    pub success_count: usize,
    pub failed_count: usize,
    pub created: Vec<T>,
    pub failures: Vec<BatchCreateFailure>,
}

/// Information about a single failed creation in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateFailure {
    /// Index of the failed item in the original slice.
    pub request_index: usize,
    /// Name of the item that failed.
    pub name: String,
    pub reason: String,
}
