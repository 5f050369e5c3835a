//! Firestore 数据结构与值编码

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::providers::common::FieldValue;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// `projects/{p}/databases/(default)/documents/{collection}/{id}`
    pub name: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
}

impl Document {
    /// Last path segment of the resource name.
    pub fn id(&self) -> Option<String> {
        self.name
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListDocumentsResponse {
    pub documents: Vec<Document>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FirestoreErrorResponse {
    pub error: FirestoreError,
}

#[derive(Debug, Deserialize)]
pub struct FirestoreError {
    #[serde(default)]
    pub message: String,
    /// gRPC status name, e.g. `NOT_FOUND`
    pub status: Option<String>,
}

/// Wraps outgoing fields in Firestore typed values.
pub fn encode_fields(fields: Vec<(&'static str, FieldValue)>) -> Value {
    let map: Map<String, Value> = fields
        .into_iter()
        .map(|(name, value)| {
            let typed = match value {
                FieldValue::Text(s) if s.is_empty() => json!({ "nullValue": null }),
                FieldValue::Text(s) => json!({ "stringValue": s }),
                // int64 travels as a string
                FieldValue::Integer(n) => json!({ "integerValue": n.to_string() }),
                FieldValue::Timestamp(dt) => {
                    json!({ "timestampValue": dt.to_rfc3339_opts(SecondsFormat::Millis, true) })
                }
            };
            (name.to_string(), typed)
        })
        .collect();
    json!({ "fields": map })
}
