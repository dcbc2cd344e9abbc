// src/catalog/mod.rs
//! Catalog loading and storage.
//!
//! Three sources, tried in order until one yields data:
//! local CSV file, remote discovery API, generated sample. The generated
//! sample cannot fail, so startup always ends with a usable catalog.

pub mod remote;
pub mod sample;
pub mod store;
pub mod types;

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::Datelike;
use serde::Deserialize;

use crate::config::CatalogConfig;
pub use store::{Catalog, CatalogHandle, DataSource};
pub use types::{ContentKind, ContentRecord};

use types::{
    clamp_release_year, or_sentinel, split_multivalue, UNKNOWN_COUNTRY, UNKNOWN_DESCRIPTION,
    UNKNOWN_DURATION, UNKNOWN_GENRE, UNKNOWN_RATING,
};

/// Which source the loader should insist on, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourcePreference {
    /// CSV, then remote, then sample.
    #[default]
    Auto,
    Csv,
    Remote,
    Sample,
}

impl SourcePreference {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "csv" | "local" => Self::Csv,
            "remote" | "api" => Self::Remote,
            "sample" | "generated" => Self::Sample,
            _ => Self::Auto,
        }
    }
}

/// Load the catalog according to the configured preference.
///
/// In `Auto` mode each source failure is logged and the next source is
/// tried; a pinned preference propagates its failure instead.
pub async fn load(cfg: &CatalogConfig) -> Result<Catalog> {
    match cfg.source_preference {
        SourcePreference::Csv => load_csv_source(&cfg.dataset_path),
        SourcePreference::Remote => load_remote_source(cfg).await,
        SourcePreference::Sample => Ok(sample_source()),
        SourcePreference::Auto => {
            match load_csv_source(&cfg.dataset_path) {
                Ok(catalog) => return Ok(catalog),
                Err(err) => {
                    tracing::warn!(path = %cfg.dataset_path.display(), %err, "csv source unavailable");
                }
            }
            match load_remote_source(cfg).await {
                Ok(catalog) => return Ok(catalog),
                Err(err) => {
                    tracing::warn!(%err, "remote source unavailable");
                }
            }
            Ok(sample_source())
        }
    }
}

fn load_csv_source(path: &Path) -> Result<Catalog> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening dataset {}", path.display()))?;
    let records = read_csv_records(file)?;
    if records.is_empty() {
        return Err(anyhow!("dataset {} has no usable rows", path.display()));
    }
    tracing::info!(rows = records.len(), path = %path.display(), "catalog loaded from csv");
    Ok(Catalog::new(records, DataSource::LocalCsv))
}

async fn load_remote_source(cfg: &CatalogConfig) -> Result<Catalog> {
    let api_key = cfg
        .remote_api_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| anyhow!("no remote api key configured"))?;
    let client = remote::RemoteCatalogClient::new(api_key)?;
    let records = dedupe(client.fetch_all().await?);
    tracing::info!(rows = records.len(), "catalog loaded from remote api");
    Ok(Catalog::new(records, DataSource::RemoteApi))
}

fn sample_source() -> Catalog {
    let records = sample::sample_catalog();
    tracing::info!(rows = records.len(), "catalog loaded from generated sample");
    Catalog::new(records, DataSource::Sample)
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    show_id: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    title: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    release_year: Option<String>,
    #[serde(default)]
    rating: Option<String>,
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    listed_in: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Parse a CSV stream into normalized records.
///
/// Rows missing a title or an unrecognized type are skipped, not fatal.
/// Duplicate (title, kind) pairs keep the first occurrence.
pub fn read_csv_records<R: std::io::Read>(reader: R) -> Result<Vec<ContentRecord>> {
    let current_year = chrono::Utc::now().year();
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for (idx, row) in csv_reader.deserialize::<CsvRow>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                tracing::debug!(row = idx + 1, %err, "skipping malformed csv row");
                skipped += 1;
                continue;
            }
        };
        let Some(title) = row.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            skipped += 1;
            continue;
        };
        let Some(kind) = row.kind.as_deref().and_then(ContentKind::parse) else {
            skipped += 1;
            continue;
        };
        let year = row
            .release_year
            .as_deref()
            .and_then(|y| y.trim().parse::<i32>().ok());
        records.push(ContentRecord {
            id: row
                .show_id
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("row_{}", idx + 1)),
            kind,
            title: title.to_string(),
            countries: split_multivalue(row.country.as_deref(), UNKNOWN_COUNTRY),
            genres: split_multivalue(row.listed_in.as_deref(), UNKNOWN_GENRE),
            release_year: clamp_release_year(year, current_year),
            rating: or_sentinel(row.rating.as_deref(), UNKNOWN_RATING),
            duration_text: or_sentinel(row.duration.as_deref(), UNKNOWN_DURATION),
            description: or_sentinel(row.description.as_deref(), UNKNOWN_DESCRIPTION),
        });
    }
    if skipped > 0 {
        tracing::debug!(skipped, "csv rows dropped during normalization");
    }
    Ok(dedupe(records))
}

fn dedupe(records: Vec<ContentRecord>) -> Vec<ContentRecord> {
    let mut seen: BTreeSet<(String, ContentKind)> = BTreeSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert((r.title.to_ascii_lowercase(), r.kind)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
show_id,type,title,director,cast,country,date_added,release_year,rating,duration,listed_in,description
s1,Movie,Extraction,Sam Hargrave,Chris Hemsworth,United States,\"April 24, 2020\",2020,R,116 min,\"Action & Adventure, Thrillers\",A mercenary takes a job.
s2,TV Show,Kingdom,,,South Korea,,2019,TV-MA,2 Seasons,\"Korean TV Shows, TV Dramas\",Zombies in Joseon.
s3,Movie,,,,United States,,2020,PG,90 min,Comedies,No title here.
s4,Movie,Extraction,,,India,,2021,R,100 min,Dramas,Duplicate title.
s5,Podcast,Odd One,,,,,2020,,,,Unknown type.
s6,Movie,Mystery Reel,,,,,3020,,,,\"Year out of range.\"
";

    #[test]
    fn reads_and_normalizes_rows() {
        let records = read_csv_records(CSV.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);

        let extraction = &records[0];
        assert_eq!(extraction.kind, ContentKind::Movie);
        assert!(extraction.genres.contains("Thrillers"));
        assert!(extraction.countries.contains("United States"));

        let kingdom = &records[1];
        assert_eq!(kingdom.kind, ContentKind::Series);
        assert_eq!(kingdom.release_year, 2019);
    }

    #[test]
    fn fills_sentinels_and_clamps_year() {
        let records = read_csv_records(CSV.as_bytes()).unwrap();
        let mystery = records.iter().find(|r| r.title == "Mystery Reel").unwrap();
        assert_eq!(mystery.rating, UNKNOWN_RATING);
        assert_eq!(mystery.duration_text, UNKNOWN_DURATION);
        assert!(mystery.countries.contains(UNKNOWN_COUNTRY));
        assert!(mystery.release_year <= chrono::Utc::now().year());
    }

    #[test]
    fn dedupes_on_title_and_kind() {
        let records = read_csv_records(CSV.as_bytes()).unwrap();
        let extractions: Vec<_> = records.iter().filter(|r| r.title == "Extraction").collect();
        assert_eq!(extractions.len(), 1);
        assert!(extractions[0].countries.contains("United States"));
    }

    #[test]
    fn source_preference_parsing() {
        assert_eq!(SourcePreference::parse("CSV"), SourcePreference::Csv);
        assert_eq!(SourcePreference::parse("api"), SourcePreference::Remote);
        assert_eq!(SourcePreference::parse("sample"), SourcePreference::Sample);
        assert_eq!(SourcePreference::parse("whatever"), SourcePreference::Auto);
    }
}
