//! Backend adapter implementations

/// Shared utilities used by adapter implementations.
pub mod common;

#[cfg(feature = "firestore")]
mod firestore;
#[cfg(feature = "hasura")]
mod hasura;
#[cfg(feature = "supabase")]
mod supabase;

#[cfg(feature = "firestore")]
pub use firestore::FirestoreProvider;
#[cfg(feature = "hasura")]
pub use hasura::HasuraProvider;
#[cfg(feature = "supabase")]
pub use supabase::SupabaseProvider;
