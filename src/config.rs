// src/config.rs
use std::env;
use std::path::PathBuf;

use crate::catalog::SourcePreference;

/// Catalog loading configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Local dataset file tried first.
    pub dataset_path: PathBuf,
    /// Bearer token for the remote discovery API. `None` skips that source.
    pub remote_api_key: Option<String>,
    /// Source pin; defaults to the full fallback chain.
    pub source_preference: SourcePreference,
    /// Blocklist file for the guardrail keyword screen.
    pub blocklist_path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("data/catalog_titles.csv"),
            remote_api_key: None,
            source_preference: SourcePreference::Auto,
            blocklist_path: PathBuf::from("config/guardrail.toml"),
        }
    }
}

impl CatalogConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            dataset_path: env::var("CATALOG_DATASET_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.dataset_path),
            remote_api_key: env::var("TMDB_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            source_preference: env::var("CATALOG_SOURCE")
                .map(|v| SourcePreference::parse(&v))
                .unwrap_or(defaults.source_preference),
            blocklist_path: env::var("GUARDRAIL_BLOCKLIST_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.blocklist_path),
        }
    }
}
