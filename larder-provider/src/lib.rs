//! # larder-provider
//!
//! Backend abstraction for the larder tracker: one async contract for
//! reading and writing foods and subscriptions, with adapters for several
//! hosted databases.
//!
//! ## Supported Backends
//!
//! | Backend | Feature Flag | Transport | Auth |
//! |---------|-------------|-----------|------|
//! | [Firestore](https://firebase.google.com/docs/firestore) | `firestore` | REST v1 | `?key=` Web API key |
//! | [Supabase](https://supabase.com/) | `supabase` | `PostgREST` | `apikey` + Bearer |
//! | [Hasura](https://hasura.io/) | `hasura` | GraphQL | `x-hasura-admin-secret` |
//!
//! ## Feature Flags
//!
//! ### Backend Selection
//!
//! - **`all-backends`** *(default)*: enable all backends listed above.
//! - **`firestore`**, **`supabase`**, **`hasura`**: enable a single backend.
//!
//! A [`BackendType`] whose feature is disabled still parses from settings;
//! [`create_backend`] then returns [`ProviderError::UnsupportedProvider`].
//!
//! ### TLS Backend
//!
//! - **`native-tls`** *(default)*: use the platform's native TLS implementation.
//! - **`rustls`**: use rustls.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use larder_provider::{BackendConfig, BackendType, ClientOptions, Food, create_backend};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = BackendConfig::defaults_for(BackendType::Supabase);
//!     config.base_url = "https://abc.supabase.co".to_string();
//!     config.api_key = "anon-key".to_string();
//!
//!     let backend = create_backend(config, ClientOptions::default())?;
//!     backend.initialize().await?;
//!
//!     let mut food = Food::new("Rice");
//!     food.price = 480;
//!     let created = backend.create_food(&food).await?;
//!     println!("created {}", created.id);
//!
//!     for sub in backend.get_subscriptions().await? {
//!         println!("{} due {}", sub.name, sub.next_payment_date());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Normalization
//!
//! Records are mapped field by field: the primary wire name, then known
//! aliases, then type coercion (numbers sent as strings, Firestore typed
//! values, nested date objects). Anything unrecoverable becomes the zero
//! value. A record without id or name is logged and skipped by list calls.
//!
//! ## Error Handling
//!
//! All backend operations return [`Result<T, ProviderError>`](ProviderError).
//! Transient errors (`NetworkError`, `Timeout`, `RateLimited`) are retried
//! with exponential backoff up to [`ClientOptions::max_retries`].
//! [`BackendService::test_connection`] never fails; it reports a
//! [`ConnectionCheck`].

mod error;
mod factory;
mod http_client;
mod providers;
mod traits;
mod types;
mod utils;

// Re-export error types
pub use error::{ProviderError, Result};

// Re-export factory functions
pub use factory::{create_backend, get_all_backend_metadata};

// Re-export core trait only (internal traits are not exported)
pub use traits::BackendService;

// Re-export types
pub use types::{
    BackendConfig, BackendMetadata, BackendType, BatchCreateFailure, BatchCreateResult,
    ClientOptions, ConnectionCheck, DEFAULT_FOOD_COLLECTION, DEFAULT_SUBSCRIPTION_COLLECTION,
    FIRESTORE_DEFAULT_BASE_URL, Food, HASURA_DEFAULT_BASE_URL, SUPABASE_DEFAULT_BASE_URL,
    Subscription,
};

// Re-export utils modules
pub use utils::{datetime, log_sanitizer, normalize};

// Re-export concrete adapters (behind feature flags)
#[cfg(feature = "firestore")]
pub use providers::FirestoreProvider;

#[cfg(feature = "supabase")]
pub use providers::SupabaseProvider;

#[cfg(feature = "hasura")]
pub use providers::HasuraProvider;
