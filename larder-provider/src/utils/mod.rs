//! Utility modules.

/// Date/time serde helpers for entity timestamps.
pub mod datetime;

/// Log sanitization utilities to prevent sensitive data exposure.
pub mod log_sanitizer;

/// Alias fallback and type coercion for backend records.
pub mod normalize;
