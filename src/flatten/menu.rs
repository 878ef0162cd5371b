//! Menu flattening for the `menu_data` payload.
//!
//! Each menu entry carries a free-text title (where the date lives), and a
//! three-deep nesting of `date_range_fields` → `stations` →
//! `meals_paragraph`. The Cartesian walk over those levels produces one
//! [`MenuItemRecord`] per (date-range, station, meal) triple, so the row
//! count for an entry is exactly
//! `|date_range_fields| × |stations| × |meals_paragraph|`.
//!
//! The date is resolved once per entry via [`crate::dates::resolve`]; an
//! unresolvable title leaves `date` absent and `day_of_week` empty on every
//! row of the entry, and the rows are emitted regardless.

use super::{opt_str, scalar_to_string, seq, str_or_empty, str_set};
use crate::dates;
use crate::models::MenuItemRecord;
use serde_json::Value;

/// Flatten a decoded `menu_data` payload into menu item rows.
///
/// Input that is not an array yields an empty row set. An entry with no
/// `date_range_fields` contributes zero rows, which is not an error.
pub fn flatten(site_id: &str, menus: &Value) -> Vec<MenuItemRecord> {
    let Some(entries) = menus.as_array() else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    for entry in entries {
        let menu_title = str_or_empty(entry, "title");
        let resolved = dates::resolve(&menu_title);

        for range in seq(entry, "date_range_fields") {
            let date_from = opt_str(range, "date_from");
            let date_to = opt_str(range, "date_to");
            let menu_type = str_set(range, "menu_type");

            for station in seq(range, "stations") {
                let station_id = seq(station, "station")
                    .first()
                    .and_then(scalar_to_string)
                    .unwrap_or_default();

                for meal in seq(station, "meals_paragraph") {
                    rows.push(MenuItemRecord {
                        site_id: site_id.to_string(),
                        menu_title: menu_title.clone(),
                        day_of_week: resolved.weekday.clone(),
                        date: resolved.date,
                        station_id: station_id.clone(),
                        menu_type: menu_type.clone(),
                        date_from: date_from.clone(),
                        date_to: date_to.clone(),
                        meal_title: str_or_empty(meal, "title").trim().to_string(),
                        allergens: str_set(meal, "allergens"),
                        prefs: str_set(meal, "prefs"),
                    });
                }
            }
        }
    }
    rows
}
