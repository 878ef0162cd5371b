//! Record types produced by the ingestion pipeline.
//!
//! This module defines the flat row types the flatteners emit and the
//! site descriptor the pipeline iterates over:
//! - [`SourceSite`]: a configured dining page to ingest
//! - [`LocationRecord`] / [`HourRecord`]: dining locations and their posted hours
//! - [`TermRecord`]: academic dining terms
//! - [`MenuItemRecord`]: one menu line per (date-range, station, meal) triple
//!
//! Every record carries the `site_id` it came from; relationships between
//! rows are expressed only through foreign-key values (`external_id`), never
//! through object references, so row sets can be reordered and persisted
//! independently.
//!
//! Set-valued fields use [`BTreeSet`] rather than joined strings: downstream
//! storage can serialize them however it likes, and the sorted order keeps
//! output deterministic regardless of how the source page ordered them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A dining page the pipeline ingests.
///
/// Sites come from static configuration (the built-in list or a YAML file)
/// and are never mutated. `id` is a stable slug used as the `site_id`
/// partition key on every record the site produces.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSite {
    /// Stable slug identifying the site, e.g. `"john_jay"`.
    pub id: String,
    /// Page URL the embedded data is scraped from.
    pub fetch_url: String,
}

impl SourceSite {
    pub fn new(id: &str, fetch_url: &str) -> Self {
        Self {
            id: id.to_string(),
            fetch_url: fetch_url.to_string(),
        }
    }
}

/// One dining location, flattened from the `dining_nodes` payload.
///
/// Unique per `(external_id, site_id)`. `external_id` is the source CMS
/// node id; it is numeric in practice but tolerated as absent because the
/// page schema is an external contract that may drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    /// Source node id (`nid`).
    pub external_id: Option<i64>,
    /// Slug of the site this row came from.
    pub site_id: String,
    /// Display name of the location.
    pub title: String,
    /// Building the location is in (`building_name`), empty if unset.
    pub building: String,
    /// Location kind (`type` in the source), empty if unset.
    pub kind: String,
    /// Open/closed status string as published, empty if unset.
    pub status: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// One posted operating-hours row for a location.
///
/// Many-to-one with [`LocationRecord`] via `external_id`; the parent's id
/// and title are denormalized onto each row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourRecord {
    /// Source node id of the owning location.
    pub external_id: Option<i64>,
    /// Slug of the site this row came from.
    pub site_id: String,
    /// Title of the owning location.
    pub title: String,
    /// Range start as published by the source (format is theirs, not ours).
    pub date_from: Option<String>,
    /// Range end as published by the source.
    pub date_to: Option<String>,
    /// Human-readable hours string, e.g. `"9:00am - 8:00pm"`.
    pub displayed_hours: String,
    /// Whether the source marks this range as excluded from display.
    pub excluded: bool,
}

/// One academic dining term, flattened from the `dining_terms` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermRecord {
    /// Source node id (`nid`).
    pub external_id: Option<i64>,
    /// Slug of the site this row came from.
    pub site_id: String,
    pub title: String,
    pub term_start: Option<String>,
    pub term_end: Option<String>,
    /// Location ids the term applies to, kept as a structured set.
    pub location_ids: BTreeSet<String>,
    /// Station ids the term applies to, kept as a structured set.
    pub station_ids: BTreeSet<String>,
}

/// One menu line, flattened from the `menu_data` payload.
///
/// Produced by the Cartesian walk over an entry's date ranges, stations,
/// and meals. `date` is the canonical ISO date resolved from the entry's
/// free-text title; it is legitimately absent when no date pattern matches
/// (e.g. a menu titled "Specials"), which is a valid terminal state rather
/// than an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItemRecord {
    /// Slug of the site this row came from.
    pub site_id: String,
    /// The menu entry's free-text title, e.g. `"Monday, March 3, 2025"`.
    pub menu_title: String,
    /// Weekday label, either taken verbatim from the title or derived from
    /// the resolved date; empty when neither is available.
    pub day_of_week: String,
    /// Canonical date resolved from the title, serialized as `YYYY-MM-DD`.
    pub date: Option<NaiveDate>,
    /// First station identifier of the owning station block, empty if absent.
    pub station_id: String,
    /// Menu type tags for the date range (e.g. breakfast/lunch/dinner).
    pub menu_type: BTreeSet<String>,
    /// Date-range start as published by the source.
    pub date_from: Option<String>,
    /// Date-range end as published by the source.
    pub date_to: Option<String>,
    /// The meal's display title, whitespace-trimmed.
    pub meal_title: String,
    pub allergens: BTreeSet<String>,
    pub prefs: BTreeSet<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_source_site_new() {
        let site = SourceSite::new("jjs", "https://dining.columbia.edu/content/jjs-place-0");
        assert_eq!(site.id, "jjs");
        assert_eq!(site.fetch_url, "https://dining.columbia.edu/content/jjs-place-0");
    }

    #[test]
    fn test_location_record_serializes_expected_columns() {
        let record = LocationRecord {
            external_id: Some(42),
            site_id: "ferris".to_string(),
            title: "Ferris Booth Commons".to_string(),
            building: "Lerner Hall".to_string(),
            kind: "Dining Hall".to_string(),
            status: "Open".to_string(),
            latitude: Some(40.8069),
            longitude: Some(-73.9639),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["external_id"], 42);
        assert_eq!(json["site_id"], "ferris");
        assert_eq!(json["kind"], "Dining Hall");
        assert_eq!(json["latitude"], 40.8069);
    }

    #[test]
    fn test_absent_external_id_serializes_as_null() {
        let record = HourRecord {
            external_id: None,
            site_id: "jjs".to_string(),
            title: "JJ's Place".to_string(),
            date_from: None,
            date_to: None,
            displayed_hours: String::new(),
            excluded: false,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert!(json["external_id"].is_null());
        assert!(json["date_from"].is_null());
    }

    #[test]
    fn test_menu_date_serializes_as_iso_string() {
        let record = MenuItemRecord {
            site_id: "john_jay".to_string(),
            menu_title: "Monday, March 3, 2025".to_string(),
            day_of_week: "Monday".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 3),
            station_id: "grill".to_string(),
            menu_type: string_set(&["Lunch"]),
            date_from: Some("2025-03-03".to_string()),
            date_to: Some("2025-03-03".to_string()),
            meal_title: "Grilled Cheese".to_string(),
            allergens: string_set(&["Dairy", "Wheat"]),
            prefs: string_set(&["Vegetarian"]),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["date"], "2025-03-03");
        assert_eq!(json["allergens"], serde_json::json!(["Dairy", "Wheat"]));
    }

    #[test]
    fn test_term_sets_serialize_sorted() {
        let record = TermRecord {
            external_id: Some(7),
            site_id: "jjs".to_string(),
            title: "Spring 2025".to_string(),
            term_start: Some("2025-01-21".to_string()),
            term_end: Some("2025-05-12".to_string()),
            location_ids: string_set(&["zeta", "alpha"]),
            station_ids: BTreeSet::new(),
        };

        let json = serde_json::to_value(&record).unwrap();
        // BTreeSet iteration is sorted, so serialization order is stable.
        assert_eq!(json["location_ids"], serde_json::json!(["alpha", "zeta"]));
        assert_eq!(json["station_ids"], serde_json::json!([]));
    }

    #[test]
    fn test_source_site_deserializes_from_yaml_shape() {
        let yaml = "id: mikes\nfetch_url: https://dining.columbia.edu/chef-mikes\n";
        let site: SourceSite = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(site.id, "mikes");
        assert_eq!(site.fetch_url, "https://dining.columbia.edu/chef-mikes");
    }
}
