//! Reconciliation writer: replace a partition's stored rows with a new batch.
//!
//! The policy is delete-then-insert. Deletion is unconditional: a source
//! that now reports zero items must still clear the stale ones it reported
//! last time. Insertion is skipped only when there is nothing to insert.
//! Repeated runs over the same source converge to the same store state,
//! which is what lets the pipeline re-run on a schedule without locks or
//! dedup bookkeeping.
//!
//! Partitioning differs by family. Locations, hours, and terms are owned
//! wholesale by their site, so their partition is `site_id = X`. Menu items
//! are partitioned by `(site_id, date)` because one pass may only carry a
//! subset of dates; deleting site-wide would drop rows for dates the page
//! no longer mentions but that are still valid. Undated rows (entries like
//! "Specials" whose title resolves to no date) get their own
//! `date IS NULL` partition so they reconcile instead of duplicating on
//! every run. The narrow partition has a known blind spot: a previously
//! dated entry whose title stops parsing leaves its old dated row in place,
//! since the new batch never observes that date.

use crate::models::{HourRecord, LocationRecord, MenuItemRecord, TermRecord};
use crate::store::{Filter, Store, StoreError};
use itertools::Itertools;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

/// Table names the per-family entry points write to.
pub mod tables {
    pub const LOCATIONS: &str = "locations";
    pub const HOURS: &str = "location_hours";
    pub const TERMS: &str = "dining_terms";
    pub const MENU_ITEMS: &str = "menu_items";
}

/// Delete everything matching `filter` from `table`, then insert `rows`.
///
/// The delete always runs; the insert is skipped for an empty batch.
pub async fn replace<S: Store>(
    store: &S,
    table: &str,
    filter: &Filter,
    rows: &[Value],
) -> Result<(), StoreError> {
    store.delete(table, filter).await?;
    if rows.is_empty() {
        debug!(table, "nothing to insert after delete");
        return Ok(());
    }
    store.insert(table, rows).await
}

fn to_rows<T: Serialize>(rows: &[T]) -> Result<Vec<Value>, StoreError> {
    rows.iter()
        .map(|row| Ok(serde_json::to_value(row)?))
        .collect()
}

/// Replace a site's location rows.
#[instrument(level = "debug", skip_all, fields(%site_id, rows = rows.len()))]
pub async fn replace_locations<S: Store>(
    store: &S,
    site_id: &str,
    rows: &[LocationRecord],
) -> Result<(), StoreError> {
    let rows = to_rows(rows)?;
    let filter = Filter::new().eq("site_id", site_id);
    replace(store, tables::LOCATIONS, &filter, &rows).await
}

/// Replace a site's operating-hours rows.
#[instrument(level = "debug", skip_all, fields(%site_id, rows = rows.len()))]
pub async fn replace_hours<S: Store>(
    store: &S,
    site_id: &str,
    rows: &[HourRecord],
) -> Result<(), StoreError> {
    let rows = to_rows(rows)?;
    let filter = Filter::new().eq("site_id", site_id);
    replace(store, tables::HOURS, &filter, &rows).await
}

/// Replace a site's term rows.
#[instrument(level = "debug", skip_all, fields(%site_id, rows = rows.len()))]
pub async fn replace_terms<S: Store>(
    store: &S,
    site_id: &str,
    rows: &[TermRecord],
) -> Result<(), StoreError> {
    let rows = to_rows(rows)?;
    let filter = Filter::new().eq("site_id", site_id);
    replace(store, tables::TERMS, &filter, &rows).await
}

/// Replace a site's menu rows for the partitions the new batch touches.
///
/// Two deletes at most: one for the distinct dates observed in the batch,
/// one for the `date IS NULL` partition when the batch carries undated
/// rows. An empty batch observes no partitions, so it touches nothing.
#[instrument(level = "debug", skip_all, fields(%site_id, rows = rows.len()))]
pub async fn replace_menu_items<S: Store>(
    store: &S,
    site_id: &str,
    rows: &[MenuItemRecord],
) -> Result<(), StoreError> {
    let dates: Vec<String> = rows
        .iter()
        .filter_map(|row| row.date)
        .unique()
        .sorted()
        .map(|date| date.to_string())
        .collect();

    if !dates.is_empty() {
        debug!(%site_id, dates = dates.len(), "clearing dated menu partitions");
        let filter = Filter::new().eq("site_id", site_id).is_in("date", dates);
        store.delete(tables::MENU_ITEMS, &filter).await?;
    }
    if rows.iter().any(|row| row.date.is_none()) {
        debug!(%site_id, "clearing undated menu partition");
        let filter = Filter::new().eq("site_id", site_id).is_null("date");
        store.delete(tables::MENU_ITEMS, &filter).await?;
    }

    if rows.is_empty() {
        return Ok(());
    }
    let rows = to_rows(rows)?;
    store.insert(tables::MENU_ITEMS, &rows).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreOp};
    use chrono::NaiveDate;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn location(site_id: &str, nid: i64, title: &str) -> LocationRecord {
        LocationRecord {
            external_id: Some(nid),
            site_id: site_id.to_string(),
            title: title.to_string(),
            building: String::new(),
            kind: String::new(),
            status: String::new(),
            latitude: None,
            longitude: None,
        }
    }

    fn menu_row(site_id: &str, date: Option<&str>, meal: &str) -> MenuItemRecord {
        MenuItemRecord {
            site_id: site_id.to_string(),
            menu_title: String::new(),
            day_of_week: String::new(),
            date: date.map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()),
            station_id: "grill".to_string(),
            menu_type: BTreeSet::new(),
            date_from: None,
            date_to: None,
            meal_title: meal.to_string(),
            allergens: BTreeSet::new(),
            prefs: BTreeSet::new(),
        }
    }

    #[tokio::test]
    async fn test_replace_locations_scopes_delete_to_site() {
        let store = MemoryStore::new();
        store
            .insert(
                tables::LOCATIONS,
                &[
                    json!({"site_id": "jjs", "title": "stale"}),
                    json!({"site_id": "ferris", "title": "other site"}),
                ],
            )
            .await
            .unwrap();

        let rows = vec![location("jjs", 1, "JJ's Place")];
        replace_locations(&store, "jjs", &rows).await.unwrap();

        let remaining = store.rows(tables::LOCATIONS);
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().any(|r| r["title"] == "other site"));
        assert!(remaining.iter().any(|r| r["title"] == "JJ's Place"));
        assert!(!remaining.iter().any(|r| r["title"] == "stale"));
    }

    #[tokio::test]
    async fn test_replace_delete_precedes_insert() {
        let store = MemoryStore::new();
        let rows = vec![location("jjs", 1, "JJ's Place")];
        replace_locations(&store, "jjs", &rows).await.unwrap();

        assert_eq!(
            store.operations(),
            vec![
                StoreOp::Delete {
                    table: tables::LOCATIONS.to_string(),
                    matched: 0,
                },
                StoreOp::Insert {
                    table: tables::LOCATIONS.to_string(),
                    rows: 1,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_replace_empty_batch_still_clears_stale_rows() {
        let store = MemoryStore::new();
        store
            .insert(tables::TERMS, &[json!({"site_id": "jjs", "title": "stale term"})])
            .await
            .unwrap();

        replace_terms(&store, "jjs", &[]).await.unwrap();

        assert!(store.rows(tables::TERMS).is_empty());
        // Delete ran, insert was skipped.
        assert_eq!(
            store.operations().last(),
            Some(&StoreOp::Delete {
                table: tables::TERMS.to_string(),
                matched: 1,
            })
        );
    }

    #[tokio::test]
    async fn test_replace_is_idempotent() {
        let store = MemoryStore::new();
        let rows = vec![location("jjs", 1, "JJ's Place"), location("jjs", 2, "Annex")];

        replace_locations(&store, "jjs", &rows).await.unwrap();
        let after_first = store.rows(tables::LOCATIONS);
        replace_locations(&store, "jjs", &rows).await.unwrap();
        let after_second = store.rows(tables::LOCATIONS);

        assert_eq!(after_first, after_second);
        assert_eq!(after_second.len(), 2);
    }

    #[tokio::test]
    async fn test_replace_menu_items_scopes_to_observed_dates() {
        let store = MemoryStore::new();
        store
            .insert(
                tables::MENU_ITEMS,
                &[
                    json!({"site_id": "jjs", "date": "2025-03-03", "meal_title": "stale"}),
                    json!({"site_id": "jjs", "date": "2025-03-04", "meal_title": "other date"}),
                    json!({"site_id": "ferris", "date": "2025-03-03", "meal_title": "other site"}),
                ],
            )
            .await
            .unwrap();

        let batch = vec![menu_row("jjs", Some("2025-03-03"), "fresh")];
        replace_menu_items(&store, "jjs", &batch).await.unwrap();

        let remaining = store.rows(tables::MENU_ITEMS);
        assert_eq!(remaining.len(), 3);
        // Only the (jjs, 2025-03-03) partition was replaced.
        assert!(remaining.iter().any(|r| r["meal_title"] == "fresh"));
        assert!(remaining.iter().any(|r| r["meal_title"] == "other date"));
        assert!(remaining.iter().any(|r| r["meal_title"] == "other site"));
        assert!(!remaining.iter().any(|r| r["meal_title"] == "stale"));
    }

    #[tokio::test]
    async fn test_replace_menu_items_undated_rows_do_not_duplicate() {
        let store = MemoryStore::new();
        let batch = vec![menu_row("jjs", None, "Chef's Special")];

        replace_menu_items(&store, "jjs", &batch).await.unwrap();
        replace_menu_items(&store, "jjs", &batch).await.unwrap();

        let rows = store.rows(tables::MENU_ITEMS);
        assert_eq!(rows.len(), 1);
        assert!(rows[0]["date"].is_null());
    }

    #[tokio::test]
    async fn test_replace_menu_items_mixed_batch_issues_both_deletes() {
        let store = MemoryStore::new();
        let batch = vec![
            menu_row("jjs", Some("2025-03-03"), "dated"),
            menu_row("jjs", None, "undated"),
        ];
        replace_menu_items(&store, "jjs", &batch).await.unwrap();

        let ops = store.operations();
        assert_eq!(ops.len(), 3);
        assert!(matches!(ops[0], StoreOp::Delete { .. }));
        assert!(matches!(ops[1], StoreOp::Delete { .. }));
        assert_eq!(
            ops[2],
            StoreOp::Insert {
                table: tables::MENU_ITEMS.to_string(),
                rows: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_replace_menu_items_empty_batch_touches_nothing() {
        let store = MemoryStore::new();
        store
            .insert(
                tables::MENU_ITEMS,
                &[json!({"site_id": "jjs", "date": "2025-03-03", "meal_title": "kept"})],
            )
            .await
            .unwrap();
        let ops_before = store.operations().len();

        replace_menu_items(&store, "jjs", &[]).await.unwrap();

        // No partitions observed, so no deletes and no insert.
        assert_eq!(store.operations().len(), ops_before);
        assert_eq!(store.rows(tables::MENU_ITEMS).len(), 1);
    }

    #[tokio::test]
    async fn test_replace_menu_items_dedupes_dates_in_filter() {
        let store = MemoryStore::new();
        let batch = vec![
            menu_row("jjs", Some("2025-03-03"), "breakfast"),
            menu_row("jjs", Some("2025-03-03"), "lunch"),
            menu_row("jjs", Some("2025-03-04"), "dinner"),
        ];
        replace_menu_items(&store, "jjs", &batch).await.unwrap();

        // One dated delete covering both distinct dates, then one insert.
        let ops = store.operations();
        assert_eq!(ops.len(), 2);
        assert_eq!(store.rows(tables::MENU_ITEMS).len(), 3);
    }
}
