//! Command-line interface definitions for dining_sync.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Store credentials can be provided via command-line flags or the standard
//! Supabase environment variables.

use clap::Parser;

/// Command-line arguments for the dining_sync application.
///
/// The store flags are required for a real run and may come from the
/// environment; `--dry-run` lifts that requirement and routes every write
/// into an in-memory store instead.
///
/// # Examples
///
/// ```sh
/// # Sync the built-in site list into a Supabase project
/// dining_sync --store-url https://PROJECT.supabase.co/rest/v1 --store-key KEY
///
/// # Same, with credentials from SUPABASE_URL / SUPABASE_SERVICE_ROLE_KEY
/// dining_sync
///
/// # Custom site list, nothing written remotely
/// dining_sync --dry-run --sites sites.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// PostgREST root the record tables hang off, e.g.
    /// https://PROJECT.supabase.co/rest/v1
    #[arg(long, env = "SUPABASE_URL", required_unless_present = "dry_run")]
    pub store_url: Option<String>,

    /// Service-role key for the store (sent as apikey and bearer token)
    #[arg(
        long,
        env = "SUPABASE_SERVICE_ROLE_KEY",
        hide_env_values = true,
        required_unless_present = "dry_run"
    )]
    pub store_key: Option<String>,

    /// Optional path to a YAML site list overriding the built-in one
    #[arg(short, long)]
    pub sites: Option<String>,

    /// Run the full pipeline against an in-memory store and report row
    /// counts, without touching the remote store
    #[arg(long)]
    pub dry_run: bool,
}
