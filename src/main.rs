//! # dining_sync
//!
//! An ingestion pipeline that scrapes the JSON embedded in campus dining
//! pages (locations, operating hours, and menus), flattens it into
//! relational row sets, and reconciles those rows into a PostgREST-backed
//! store so repeated runs never leave duplicates or stale data behind.
//!
//! ## Features
//!
//! - Extracts the `dining_nodes`, `dining_terms`, and `menu_data`
//!   template-literal assignments from raw page markup, decoding their
//!   JavaScript string escapes before JSON parsing
//! - Resolves free-text menu titles ("Monday, March 3, 2025", "Lunch 3/3/25")
//!   into canonical ISO dates plus weekday labels
//! - Flattens three nested schemas into location, hour, term, and menu-item
//!   rows, each keyed by its originating site
//! - Replaces each site's partition with delete-then-insert writes, so
//!   re-ingestion is idempotent
//! - `--dry-run` exercises the whole pipeline against an in-memory store
//!
//! ## Usage
//!
//! ```sh
//! dining_sync --store-url https://PROJECT.supabase.co/rest/v1 --store-key KEY
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture, one site at a time:
//! 1. **Fetching**: Download the site's page markup
//! 2. **Extraction**: Locate and decode the three embedded variables
//! 3. **Flattening**: Convert each present payload into flat row sets
//! 4. **Reconciliation**: Delete the superseded partition, insert the new rows
//!
//! Every stage absorbs its own failures; one site's malformed data never
//! blocks another site's ingestion.

use clap::Parser;
use std::error::Error;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod dates;
mod extract;
mod fetch;
mod flatten;
mod models;
mod pipeline;
mod reconcile;
mod sites;
mod store;
mod utils;

use cli::Cli;
use fetch::HttpFetcher;
use store::{MemoryStore, RestStore};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("dining_sync starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.sites, dry_run = args.dry_run, "Parsed CLI arguments");

    // --- Site list ---
    let sites = match &args.sites {
        Some(path) => sites::load_sites(path).await?,
        None => sites::default_sites(),
    };
    if sites.is_empty() {
        warn!("Site list is empty; nothing to ingest");
    }
    info!(count = sites.len(), "Loaded site list");

    let fetcher = HttpFetcher::new()?;

    // --- Run the pipeline against the chosen store ---
    let summary = if args.dry_run {
        info!("Dry run: writes go to an in-memory store");
        let store = MemoryStore::new();
        let summary = pipeline::run(&sites, &fetcher, &store).await;
        for (table, rows) in store.table_counts() {
            info!(%table, rows, "Dry-run table");
        }
        summary
    } else {
        // clap enforces the store flags unless --dry-run; this is the
        // fatal configuration check at the binary boundary.
        let (Some(store_url), Some(store_key)) = (&args.store_url, &args.store_key) else {
            return Err("store URL and key are required unless --dry-run".into());
        };
        let store = RestStore::new(store_url, store_key)?;
        pipeline::run(&sites, &fetcher, &store).await
    };

    info!(
        sites_processed = summary.sites_processed,
        sites_failed = summary.sites_failed,
        locations = summary.locations,
        hours = summary.hours,
        terms = summary.terms,
        menu_items = summary.menu_items,
        write_failures = summary.write_failures,
        "Run summary"
    );

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
