//! Field-level normalization of backend JSON.
//!
//! Backends disagree on field names and on how scalars are encoded: flat
//! scalars (`PostgREST`), typed wrappers (`{"integerValue": "3"}` in
//! Firestore), nested date objects from GraphQL schemas, numbers sent as
//! strings. [`RecordView`] hides all of that behind lookups that try each
//! alias in order and coerce to the wanted type, falling back to the zero
//! value instead of failing.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};

/// Single-key wrapper objects that carry a scalar.
const WRAPPER_KEYS: &[&str] = &[
    "stringValue",
    "integerValue",
    "doubleValue",
    "booleanValue",
    "timestampValue",
    "value",
    "iso",
    "date",
];

static NULL: Value = Value::Null;

/// Read-only view over one backend record.
#[derive(Debug, Clone, Copy)]
pub struct RecordView<'a> {
    fields: &'a Map<String, Value>,
}

impl<'a> RecordView<'a> {
    pub fn new(fields: &'a Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Returns `None` unless `value` is a JSON object.
    pub fn from_value(value: &'a Value) -> Option<Self> {
        value.as_object().map(Self::new)
    }

    /// First alias that is present and not null, with wrappers removed.
    pub fn lookup(&self, aliases: &[&str]) -> Option<&'a Value> {
        aliases
            .iter()
            .filter_map(|name| self.fields.get(*name))
            .map(unwrap_scalar)
            .find(|v| !v.is_null())
    }

    /// String field. Numbers and booleans are rendered, anything else is empty.
    pub fn string(&self, aliases: &[&str]) -> String {
        self.lookup(aliases).map(coerce_string).unwrap_or_default()
    }

    /// Non-negative integer field. Negative, fractional-garbage or
    /// non-numeric values become 0.
    pub fn uint(&self, aliases: &[&str]) -> u32 {
        self.lookup(aliases).map_or(0, coerce_uint)
    }

    pub fn timestamp(&self, aliases: &[&str]) -> Option<DateTime<Utc>> {
        self.lookup(aliases).and_then(coerce_timestamp)
    }

    /// Date-only field as `YYYY-MM-DD`; empty when missing or unparseable.
    pub fn date(&self, aliases: &[&str]) -> String {
        self.timestamp(aliases)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}

/// Strips typed wrappers such as `{"integerValue": "3"}` or `{"nullValue": null}`.
pub fn unwrap_scalar(value: &Value) -> &Value {
    let mut current = value;
    loop {
        let Some(obj) = current.as_object() else {
            return current;
        };
        if obj.len() != 1 {
            return current;
        }
        if obj.contains_key("nullValue") {
            return &NULL;
        }
        match WRAPPER_KEYS.iter().find_map(|key| obj.get(*key)) {
            Some(inner) => current = inner,
            None => return current,
        }
    }
}

pub fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

pub fn coerce_uint(value: &Value) -> u32 {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.round() as i64))
        }
        Value::Bool(_) | Value::Null | Value::Array(_) | Value::Object(_) => None,
    };
    parsed.map_or(0, |n| u32::try_from(n.max(0)).unwrap_or(u32::MAX))
}

/// Accepts RFC 3339, `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, `YYYY/MM/DD`,
/// Unix seconds or milliseconds, and `{year, month, day}` objects.
pub fn coerce_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => n.as_i64().and_then(from_unix),
        Value::Object(obj) => {
            let part = |key: &str| obj.get(key).map(coerce_uint).filter(|v| *v > 0);
            let date = NaiveDate::from_ymd_opt(
                i32::try_from(part("year")?).ok()?,
                part("month")?,
                part("day")?,
            )?;
            Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
        }
        _ => None,
    }
}

fn parse_timestamp_str(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive));
        }
    }
    s.parse::<i64>().ok().and_then(from_unix)
}

fn from_unix(ts: i64) -> Option<DateTime<Utc>> {
    if ts <= 0 {
        return None;
    }
    // Above 10^11 the value can only be milliseconds
    if ts > 100_000_000_000 {
        DateTime::from_timestamp_millis(ts)
    } else {
        DateTime::from_timestamp(ts, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn view(value: &Value) -> RecordView<'_> {
        RecordView::from_value(value).unwrap()
    }

    #[test]
    fn falls_back_to_secondary_alias() {
        let raw = json!({ "shop": "Corner Store" });
        assert_eq!(view(&raw).string(&["shop_name", "shop"]), "Corner Store");
    }

    #[test]
    fn primary_alias_wins() {
        let raw = json!({ "shop_name": "A", "shop": "B" });
        assert_eq!(view(&raw).string(&["shop_name", "shop"]), "A");
    }

    #[test]
    fn null_primary_falls_through() {
        let raw = json!({ "shop_name": null, "shop": "B" });
        assert_eq!(view(&raw).string(&["shop_name", "shop"]), "B");
    }

    #[test]
    fn missing_field_is_zero_value() {
        let raw = json!({});
        let v = view(&raw);
        assert_eq!(v.string(&["name"]), "");
        assert_eq!(v.uint(&["price"]), 0);
        assert_eq!(v.timestamp(&["created_at"]), None);
        assert_eq!(v.date(&["expiry"]), "");
    }

    #[test]
    fn numbers_as_strings_are_coerced() {
        let raw = json!({ "price": "450", "quantity": " 2 ", "ratio": "2.6" });
        let v = view(&raw);
        assert_eq!(v.uint(&["price"]), 450);
        assert_eq!(v.uint(&["quantity"]), 2);
        assert_eq!(v.uint(&["ratio"]), 3);
    }

    #[test]
    fn negative_and_garbage_numbers_become_zero() {
        let raw = json!({ "a": -5, "b": "cheap", "c": true, "d": [1] });
        let v = view(&raw);
        assert_eq!(v.uint(&["a"]), 0);
        assert_eq!(v.uint(&["b"]), 0);
        assert_eq!(v.uint(&["c"]), 0);
        assert_eq!(v.uint(&["d"]), 0);
    }

    #[test]
    fn firestore_wrappers_are_unwrapped() {
        let raw = json!({
            "price": { "integerValue": "120" },
            "name": { "stringValue": "Rice" },
            "note": { "nullValue": null },
            "createdAt": { "timestampValue": "2025-01-02T03:04:05Z" }
        });
        let v = view(&raw);
        assert_eq!(v.uint(&["price"]), 120);
        assert_eq!(v.string(&["name"]), "Rice");
        assert_eq!(v.string(&["note"]), "");
        assert_eq!(
            v.timestamp(&["createdAt"]),
            Some(Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap())
        );
    }

    #[test]
    fn structured_dates_are_accepted() {
        let raw = json!({
            "nested": { "date": "2025-06-30" },
            "parts": { "year": 2025, "month": 7, "day": 1 },
            "broken": { "year": 2025, "month": 13, "day": 1 }
        });
        let v = view(&raw);
        assert_eq!(v.date(&["nested"]), "2025-06-30");
        assert_eq!(v.date(&["parts"]), "2025-07-01");
        assert_eq!(v.date(&["broken"]), "");
    }

    #[test]
    fn malformed_or_empty_dates_are_empty() {
        let raw = json!({ "a": "", "b": "next tuesday", "c": "2025-02-30" });
        let v = view(&raw);
        assert_eq!(v.date(&["a"]), "");
        assert_eq!(v.date(&["b"]), "");
        assert_eq!(v.date(&["c"]), "");
    }

    #[test]
    fn unix_timestamps_seconds_and_millis() {
        let raw = json!({ "s": 1_700_000_000, "ms": "1700000000000" });
        let v = view(&raw);
        assert_eq!(v.timestamp(&["s"]), v.timestamp(&["ms"]));
        assert!(v.timestamp(&["s"]).is_some());
    }

    #[test]
    fn ids_keep_their_textual_form() {
        let raw = json!({ "id": 42, "uuid": "a1b2" });
        let v = view(&raw);
        assert_eq!(v.string(&["id"]), "42");
        assert_eq!(v.string(&["uuid"]), "a1b2");
    }

    #[test]
    fn multi_key_objects_are_not_unwrapped() {
        let raw = json!({ "name": { "first": "a", "last": "b" } });
        assert_eq!(view(&raw).string(&["name"]), "");
    }
}
