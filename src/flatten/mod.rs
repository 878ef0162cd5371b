//! Flatteners for the three embedded payload schemas.
//!
//! Each submodule converts one nested JSON schema into independent row
//! sets. All three are pure functions over `serde_json::Value`: same input,
//! same rows, no I/O, no shared state.
//!
//! | Payload        | Module        | Produces                              |
//! |----------------|---------------|---------------------------------------|
//! | `dining_nodes` | [`locations`] | `LocationRecord` + `HourRecord` rows  |
//! | `dining_terms` | [`terms`]     | `TermRecord` rows                     |
//! | `menu_data`    | [`menu`]      | `MenuItemRecord` rows                 |
//!
//! Each submodule exports a single `flatten(site_id, value)` entry point.
//! Malformed or unexpectedly-shaped input yields empty row sets, never an
//! error: the page schema is an external contract that drifts, and one bad
//! payload must not block the rest of the pipeline.
//!
//! The accessors below implement the shared "read with default" discipline:
//! missing or mistyped fields become empty strings, `None`, `false`, or
//! empty collections at the edge, so later stages never see nulls.

use serde_json::Value;
use std::collections::BTreeSet;

pub mod locations;
pub mod menu;
pub mod terms;

/// Render a scalar JSON value as a string; non-scalars are `None`.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// String field with an empty-string default.
pub(crate) fn str_or_empty(value: &Value, key: &str) -> String {
    value.get(key).and_then(scalar_to_string).unwrap_or_default()
}

/// Optional string field; absent, null, and non-scalar all read as `None`.
pub(crate) fn opt_str(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(scalar_to_string)
}

/// Optional integer field, tolerating numeric-string encodings.
pub(crate) fn opt_i64(value: &Value, key: &str) -> Option<i64> {
    match value.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Optional float field, tolerating numeric-string encodings.
pub(crate) fn opt_f64(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Boolean field; anything but a JSON `true` reads as `false`.
pub(crate) fn bool_or_false(value: &Value, key: &str) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Array field as a slice; absent or non-array reads as empty.
pub(crate) fn seq<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

/// Array-of-scalars field as a sorted string set.
pub(crate) fn str_set(value: &Value, key: &str) -> BTreeSet<String> {
    seq(value, key).iter().filter_map(scalar_to_string).collect()
}
