//! GraphQL 文档构建
//!
//! Table names come from user settings and end up inside the document, so
//! they are checked against the GraphQL name grammar first.

use crate::providers::common::{
    Aliases, FoodSchema, SQL_FOOD_SCHEMA, SQL_SUBSCRIPTION_SCHEMA, SubscriptionSchema,
};

/// Hasura exposes the SQL columns as-is, minus the image hash column
/// that the default schema does not track.
pub const FOOD_SCHEMA: FoodSchema = FoodSchema {
    image_hash: &[],
    ..SQL_FOOD_SCHEMA
};

pub const SUBSCRIPTION_SCHEMA: SubscriptionSchema = SQL_SUBSCRIPTION_SCHEMA;

/// `[_A-Za-z][_0-9A-Za-z]*`
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

fn selection(columns: &[Aliases]) -> String {
    columns
        .iter()
        .filter_map(|aliases| aliases.first())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn food_selection() -> String {
    let s = &FOOD_SCHEMA;
    selection(&[
        s.id,
        s.name,
        s.price,
        s.quantity,
        s.shop,
        s.expiry_date,
        s.image_url,
        s.image_hash,
        s.description,
        s.category,
        s.storage_location,
        s.note,
        s.created_at,
        s.updated_at,
    ])
}

pub fn subscription_selection() -> String {
    let s = &SUBSCRIPTION_SCHEMA;
    selection(&[
        s.id,
        s.name,
        s.url,
        s.price,
        s.account,
        s.next_payment,
        s.note,
        s.created_at,
        s.updated_at,
    ])
}

/// Inline literal for an id of unknown column type: integer ids stay bare
/// so that `Int` primary keys accept them, anything else is quoted.
pub fn id_literal(id: &str) -> String {
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
        id.to_string()
    } else {
        serde_json::Value::String(id.to_string()).to_string()
    }
}

pub fn list_query(table: &str, selection: &str, order_by: &str) -> String {
    format!("query List {{ {table}(order_by: {order_by}) {{ {selection} }} }}")
}

/// Read-only probe used by connection tests.
pub fn probe_query(table: &str) -> String {
    format!("query Probe {{ {table}(limit: 1) {{ id }} }}")
}

pub fn insert_mutation(table: &str, selection: &str) -> String {
    format!(
        "mutation Insert($object: {table}_insert_input!) {{ \
         insert_{table}_one(object: $object) {{ {selection} }} }}"
    )
}

pub fn update_mutation(table: &str, id: &str, selection: &str) -> String {
    format!(
        "mutation Update($set: {table}_set_input!) {{ \
         update_{table}(where: {{id: {{_eq: {}}}}}, _set: $set) \
         {{ affected_rows returning {{ {selection} }} }} }}",
        id_literal(id)
    )
}

pub fn delete_mutation(table: &str, id: &str) -> String {
    format!(
        "mutation Delete {{ delete_{table}(where: {{id: {{_eq: {}}}}}) {{ affected_rows }} }}",
        id_literal(id)
    )
}
