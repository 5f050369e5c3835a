//! Serde helpers for `Option<DateTime<Utc>>` fields.
//!
//! - Serialize: RFC 3339 string
//! - Deserialize: anything [`coerce_timestamp`] understands; unparseable
//!   values become `None` instead of failing the whole entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;

use super::normalize::coerce_timestamp;

pub fn serialize<S>(dt: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match dt {
        Some(dt) => serializer.serialize_some(&dt.to_rfc3339()),
        None => serializer.serialize_none(),
    }
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(coerce_timestamp))
}
