//! Source-site configuration.
//!
//! The pipeline runs over an ordered list of [`SourceSite`] entries. The
//! built-in list covers the Columbia dining halls; `--sites <file.yaml>`
//! swaps in a different list (a YAML sequence of `{id, fetch_url}` maps)
//! without touching the defaults.

use crate::models::SourceSite;
use std::error::Error;
use tokio::fs;
use tracing::{info, instrument};

/// The built-in site list, in ingestion order.
pub fn default_sites() -> Vec<SourceSite> {
    vec![
        SourceSite::new("jjs", "https://dining.columbia.edu/content/jjs-place-0"),
        SourceSite::new("john_jay", "https://dining.columbia.edu/content/john-jay-dining-hall"),
        SourceSite::new("ferris", "https://dining.columbia.edu/content/ferris-booth-commons-0"),
        SourceSite::new("mikes", "https://dining.columbia.edu/chef-mikes"),
        SourceSite::new("dons", "https://dining.columbia.edu/content/chef-dons-pizza-pi-ft-blue-java"),
        SourceSite::new("grace_dodge", "https://dining.columbia.edu/content/grace-dodge-dining-hall-0"),
        SourceSite::new("fac_shack", "https://dining.columbia.edu/content/fac-shack-0"),
        SourceSite::new("fac_house", "https://dining.columbia.edu/content/faculty-house-0"),
        SourceSite::new("johnnys", "https://dining.columbia.edu/johnnys"),
    ]
}

/// Parse a YAML sequence of `{id, fetch_url}` entries.
pub fn parse_sites(yaml: &str) -> Result<Vec<SourceSite>, serde_yaml::Error> {
    serde_yaml::from_str(yaml)
}

/// Load a site list from a YAML file.
///
/// An unreadable or malformed file is a configuration error and fatal to
/// the run; there is no fallback to the built-in list once a file was
/// asked for.
#[instrument(level = "info", skip_all, fields(%path))]
pub async fn load_sites(path: &str) -> Result<Vec<SourceSite>, Box<dyn Error>> {
    let text = fs::read_to_string(path).await?;
    let sites = parse_sites(&text)?;
    info!(count = sites.len(), "Loaded site list from file");
    Ok(sites)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_sites_cover_all_halls() {
        let sites = default_sites();
        assert_eq!(sites.len(), 9);
        assert_eq!(sites[0].id, "jjs");
        assert_eq!(sites[8].id, "johnnys");
        assert!(sites.iter().all(|s| s.fetch_url.starts_with("https://dining.columbia.edu/")));
    }

    #[test]
    fn test_default_site_ids_are_unique() {
        let sites = default_sites();
        let ids: HashSet<&str> = sites.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids.len(), sites.len());
    }

    #[test]
    fn test_parse_sites_preserves_order() {
        let yaml = "\
- id: north_hall
  fetch_url: https://dining.example.edu/north
- id: south_hall
  fetch_url: https://dining.example.edu/south
";
        let sites = parse_sites(yaml).unwrap();
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].id, "north_hall");
        assert_eq!(sites[1].fetch_url, "https://dining.example.edu/south");
    }

    #[test]
    fn test_parse_sites_rejects_malformed_yaml() {
        assert!(parse_sites("id: not-a-sequence").is_err());
        assert!(parse_sites("- id: missing_url\n").is_err());
    }

    #[tokio::test]
    async fn test_load_sites_round_trip() {
        let path = std::env::temp_dir().join(format!("dining_sync_sites_{}.yaml", std::process::id()));
        let yaml = "- id: test_hall\n  fetch_url: https://dining.example.edu/test\n";
        tokio::fs::write(&path, yaml).await.unwrap();

        let sites = load_sites(path.to_str().unwrap()).await.unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].id, "test_hall");

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_load_sites_missing_file_is_an_error() {
        assert!(load_sites("/nonexistent/sites.yaml").await.is_err());
    }
}
