//! Location and operating-hours flattening for the `dining_nodes` payload.
//!
//! The payload is an object with a `locations` array; each location may
//! carry an `open_hours_fields` array. One [`LocationRecord`] per location,
//! one [`HourRecord`] per hours entry with the parent's `nid` and `title`
//! denormalized onto it.

use super::{bool_or_false, opt_f64, opt_i64, opt_str, seq, str_or_empty};
use crate::models::{HourRecord, LocationRecord};
use serde_json::Value;

/// Flatten a decoded `dining_nodes` payload into location and hour rows.
///
/// Absent or malformed input (not an object, no `locations` array) yields
/// empty row sets, not an error.
pub fn flatten(site_id: &str, nodes: &Value) -> (Vec<LocationRecord>, Vec<HourRecord>) {
    let mut locations = Vec::new();
    let mut hours = Vec::new();

    for location in seq(nodes, "locations") {
        let external_id = opt_i64(location, "nid");
        let title = str_or_empty(location, "title");

        locations.push(LocationRecord {
            external_id,
            site_id: site_id.to_string(),
            title: title.clone(),
            building: str_or_empty(location, "building_name"),
            kind: str_or_empty(location, "type"),
            status: str_or_empty(location, "status"),
            latitude: opt_f64(location, "latitude"),
            longitude: opt_f64(location, "longitude"),
        });

        for entry in seq(location, "open_hours_fields") {
            hours.push(HourRecord {
                external_id,
                site_id: site_id.to_string(),
                title: title.clone(),
                date_from: opt_str(entry, "date_from"),
                date_to: opt_str(entry, "date_to"),
                displayed_hours: str_or_empty(entry, "displayed_hours"),
                excluded: bool_or_false(entry, "excluded"),
            });
        }
    }

    (locations, hours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_location_with_hours() {
        let nodes = json!({
            "locations": [{
                "nid": 101,
                "title": "John Jay Dining Hall",
                "building_name": "John Jay Hall",
                "type": "Dining Hall",
                "status": "Open",
                "latitude": 40.8059,
                "longitude": "-73.9626",
                "open_hours_fields": [
                    {
                        "date_from": "2025-03-03",
                        "date_to": "2025-03-07",
                        "displayed_hours": "9:30am - 9:00pm",
                        "excluded": false
                    },
                    {
                        "date_from": "2025-03-08",
                        "displayed_hours": "Closed",
                        "excluded": true
                    }
                ]
            }]
        });

        let (locations, hours) = flatten("john_jay", &nodes);

        assert_eq!(locations.len(), 1);
        let location = &locations[0];
        assert_eq!(location.external_id, Some(101));
        assert_eq!(location.site_id, "john_jay");
        assert_eq!(location.title, "John Jay Dining Hall");
        assert_eq!(location.building, "John Jay Hall");
        assert_eq!(location.kind, "Dining Hall");
        assert_eq!(location.longitude, Some(-73.9626));

        assert_eq!(hours.len(), 2);
        assert_eq!(hours[0].external_id, Some(101));
        assert_eq!(hours[0].title, "John Jay Dining Hall");
        assert_eq!(hours[0].displayed_hours, "9:30am - 9:00pm");
        assert!(!hours[0].excluded);
        assert_eq!(hours[1].date_to, None);
        assert!(hours[1].excluded);
    }

    #[test]
    fn test_flatten_location_without_hours_yields_no_hour_rows() {
        let nodes = json!({"locations": [{"nid": 1, "title": "A", "open_hours_fields": []}]});
        let (locations, hours) = flatten("jjs", &nodes);
        assert_eq!(locations.len(), 1);
        assert!(hours.is_empty());
    }

    #[test]
    fn test_flatten_missing_optional_fields_default() {
        let nodes = json!({"locations": [{}]});
        let (locations, hours) = flatten("jjs", &nodes);
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].external_id, None);
        assert_eq!(locations[0].title, "");
        assert_eq!(locations[0].building, "");
        assert_eq!(locations[0].latitude, None);
        assert!(hours.is_empty());
    }

    #[test]
    fn test_flatten_malformed_input_is_empty() {
        assert_eq!(flatten("jjs", &json!(null)), (vec![], vec![]));
        assert_eq!(flatten("jjs", &json!([1, 2])), (vec![], vec![]));
        assert_eq!(flatten("jjs", &json!({"locations": "nope"})), (vec![], vec![]));
        assert_eq!(flatten("jjs", &json!({})), (vec![], vec![]));
    }

    #[test]
    fn test_flatten_is_deterministic() {
        let nodes = json!({
            "locations": [
                {"nid": 1, "title": "A"},
                {"nid": 2, "title": "B", "open_hours_fields": [{"displayed_hours": "x"}]}
            ]
        });
        assert_eq!(flatten("ferris", &nodes), flatten("ferris", &nodes));
    }
}
