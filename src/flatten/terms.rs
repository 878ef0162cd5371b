//! Term flattening for the `dining_terms` payload.
//!
//! The payload is a top-level array of term objects. The nested
//! `locations` and `stations` arrays are preserved as structured sets of
//! identifiers rather than joined strings, so downstream storage keeps the
//! ability to join on them.

use super::{opt_i64, opt_str, str_or_empty, str_set};
use crate::models::TermRecord;
use serde_json::Value;

/// Flatten a decoded `dining_terms` payload into term rows.
///
/// Input that is not an array yields an empty row set, not an error.
pub fn flatten(site_id: &str, terms: &Value) -> Vec<TermRecord> {
    let Some(entries) = terms.as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .map(|term| TermRecord {
            external_id: opt_i64(term, "nid"),
            site_id: site_id.to_string(),
            title: str_or_empty(term, "title"),
            term_start: opt_str(term, "term_start"),
            term_end: opt_str(term, "term_end"),
            location_ids: str_set(term, "locations"),
            station_ids: str_set(term, "stations"),
        })
        .collect()
}
