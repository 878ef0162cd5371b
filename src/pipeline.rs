//! The per-site ingestion driver.
//!
//! For each configured site, strictly in order: fetch the page, extract the
//! three embedded variables, flatten whichever are present, and reconcile
//! each family of rows against the store. Sites are processed one at a time
//! because the dining host challenges concurrent clients and because
//! reconciliation writes must not race on shared partitions.
//!
//! Forward progress is the rule at every level. A failed fetch skips the
//! site; a missing or undecodable variable skips that family; a store
//! failure skips that family's remaining work. Nothing a single source does
//! can block another source's ingestion. The only state shared across sites
//! is the [`RunSummary`].
//!
//! Absence and emptiness are handled differently on purpose. A family whose
//! variable is missing from the page is not reconciled at all, so a
//! transient page glitch never wipes previously stored rows. A family whose
//! variable is present but flattens to zero rows still reconciles: the
//! source genuinely reports nothing, and stale rows must go.

use crate::extract::extract_or_log;
use crate::fetch::{FetchError, Fetcher};
use crate::flatten;
use crate::models::SourceSite;
use crate::reconcile::{self, tables};
use crate::store::{Store, StoreError};
use tracing::{debug, error, info, instrument, warn};

// The three embedded variables every dining page may carry.
const DINING_NODES: &str = "dining_nodes";
const DINING_TERMS: &str = "dining_terms";
const MENU_DATA: &str = "menu_data";

/// Counters accumulated over one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Sites whose page was fetched and processed.
    pub sites_processed: usize,
    /// Sites skipped because their fetch failed.
    pub sites_failed: usize,
    /// Location rows reconciled.
    pub locations: usize,
    /// Operating-hours rows reconciled.
    pub hours: usize,
    /// Term rows reconciled.
    pub terms: usize,
    /// Menu item rows reconciled.
    pub menu_items: usize,
    /// Reconciliations that failed at the store (family granularity).
    pub write_failures: usize,
}

/// Ingest every site in order, accumulating a [`RunSummary`].
///
/// A site whose fetch fails is logged and skipped; everything downstream of
/// a successful fetch absorbs its own failures.
pub async fn run<F: Fetcher, S: Store>(
    sites: &[SourceSite],
    fetcher: &F,
    store: &S,
) -> RunSummary {
    let mut summary = RunSummary::default();

    for site in sites {
        info!(site = %site.id, url = %site.fetch_url, "Ingesting site");
        match ingest_site(site, fetcher, store, &mut summary).await {
            Ok(()) => summary.sites_processed += 1,
            Err(e) => {
                warn!(site = %site.id, error = %e, "Fetch failed; skipping site");
                summary.sites_failed += 1;
            }
        }
    }

    summary
}

/// One site's pass: fetch, extract ×3, flatten, reconcile per family.
///
/// Only the fetch error propagates (the site has nothing to work with);
/// store failures are counted on the summary and the pass continues.
#[instrument(level = "info", skip_all, fields(site = %site.id))]
async fn ingest_site<F: Fetcher, S: Store>(
    site: &SourceSite,
    fetcher: &F,
    store: &S,
    summary: &mut RunSummary,
) -> Result<(), FetchError> {
    let page = fetcher.fetch(&site.fetch_url).await?;
    debug!(bytes = page.len(), "Fetched page text");

    // Three independent extractions; each may be absent on its own.
    let nodes = extract_or_log(DINING_NODES, &page);
    let terms = extract_or_log(DINING_TERMS, &page);
    let menus = extract_or_log(MENU_DATA, &page);

    if let Some(nodes) = nodes {
        let (locations, hours) = flatten::locations::flatten(&site.id, &nodes);
        info!(
            locations = locations.len(),
            hours = hours.len(),
            "Flattened dining_nodes"
        );
        match reconcile::replace_locations(store, &site.id, &locations).await {
            Ok(()) => summary.locations += locations.len(),
            Err(e) => note_write_failure(summary, &site.id, tables::LOCATIONS, &e),
        }
        match reconcile::replace_hours(store, &site.id, &hours).await {
            Ok(()) => summary.hours += hours.len(),
            Err(e) => note_write_failure(summary, &site.id, tables::HOURS, &e),
        }
    }

    if let Some(terms) = terms {
        let rows = flatten::terms::flatten(&site.id, &terms);
        info!(terms = rows.len(), "Flattened dining_terms");
        match reconcile::replace_terms(store, &site.id, &rows).await {
            Ok(()) => summary.terms += rows.len(),
            Err(e) => note_write_failure(summary, &site.id, tables::TERMS, &e),
        }
    }

    if let Some(menus) = menus {
        let rows = flatten::menu::flatten(&site.id, &menus);
        info!(menu_items = rows.len(), "Flattened menu_data");
        match reconcile::replace_menu_items(store, &site.id, &rows).await {
            Ok(()) => summary.menu_items += rows.len(),
            Err(e) => note_write_failure(summary, &site.id, tables::MENU_ITEMS, &e),
        }
    }

    Ok(())
}

fn note_write_failure(summary: &mut RunSummary, site_id: &str, table: &str, error: &StoreError) {
    error!(site = %site_id, table, error = %error, "Reconciliation failed; continuing");
    summary.write_failures += 1;
}
