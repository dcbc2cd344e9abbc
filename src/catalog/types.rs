// src/catalog/types.rs
//! Core record types for the in-memory catalog and the field normalization
//! applied to every row regardless of which source produced it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

// Sentinels used for missing textual fields. Downstream code never sees
// an empty/None field, it sees one of these.
pub const UNKNOWN_COUNTRY: &str = "Unknown Country";
pub const UNKNOWN_GENRE: &str = "Unknown Genre";
pub const UNKNOWN_DURATION: &str = "Unknown Duration";
pub const UNKNOWN_RATING: &str = "Not Rated";
pub const UNKNOWN_DESCRIPTION: &str = "No description available";

/// Release years are clamped to this lower bound; the upper bound is the
/// current year at load time.
pub const MIN_RELEASE_YEAR: i32 = 1900;
/// Year substituted when a row carries no parseable release year.
pub const DEFAULT_RELEASE_YEAR: i32 = 2020;

/// Closed content-kind enum. Rows with an unrecognized kind are dropped at
/// load time rather than mapped to a sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContentKind {
    Movie,
    Series,
}

impl ContentKind {
    /// Parse the `type` column of the tabular input ("Movie" / "TV Show").
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "movie" => Some(ContentKind::Movie),
            "tv show" | "series" | "tv" | "show" => Some(ContentKind::Series),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Movie => "Movie",
            ContentKind::Series => "TV Show",
        }
    }
}

/// One catalog entry, fully normalized. Immutable after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: String,
    pub kind: ContentKind,
    pub title: String,
    /// Producing countries; may be empty only in the sense of holding the
    /// sentinel value, never a truly empty set after normalization.
    pub countries: BTreeSet<String>,
    pub genres: BTreeSet<String>,
    pub release_year: i32,
    pub rating: String,
    /// Unstructured: "120 min" or "3 Seasons".
    pub duration_text: String,
    pub description: String,
}

impl ContentRecord {
    /// Case-insensitive substring test against any producing country.
    /// Matches "South Korea" for needle "korea".
    pub fn country_contains(&self, needle: &str) -> bool {
        let needle = needle.to_ascii_lowercase();
        self.countries
            .iter()
            .any(|c| c.to_ascii_lowercase().contains(&needle))
    }
}

/// Split a comma-separated multi-valued field ("Dramas, Korean TV Shows")
/// into a trimmed set; an empty/missing field yields `{sentinel}`.
pub fn split_multivalue(raw: Option<&str>, sentinel: &str) -> BTreeSet<String> {
    let mut out: BTreeSet<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if out.is_empty() {
        out.insert(sentinel.to_string());
    }
    out
}

/// Fill a missing/blank textual field with its sentinel.
pub fn or_sentinel(raw: Option<&str>, sentinel: &str) -> String {
    match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => sentinel.to_string(),
    }
}

/// Clamp a parsed release year into `[MIN_RELEASE_YEAR, current_year]`,
/// substituting the default when absent or unparseable.
pub fn clamp_release_year(raw: Option<i32>, current_year: i32) -> i32 {
    raw.unwrap_or(DEFAULT_RELEASE_YEAR)
        .clamp(MIN_RELEASE_YEAR, current_year)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_known_labels() {
        assert_eq!(ContentKind::parse("Movie"), Some(ContentKind::Movie));
        assert_eq!(ContentKind::parse("TV Show"), Some(ContentKind::Series));
        assert_eq!(ContentKind::parse(" series "), Some(ContentKind::Series));
        assert_eq!(ContentKind::parse("Podcast"), None);
    }

    #[test]
    fn multivalue_splits_and_trims() {
        let set = split_multivalue(Some("Dramas, Korean TV Shows , Thrillers"), UNKNOWN_GENRE);
        assert_eq!(set.len(), 3);
        assert!(set.contains("Korean TV Shows"));
    }

    #[test]
    fn multivalue_empty_gets_sentinel() {
        let set = split_multivalue(None, UNKNOWN_COUNTRY);
        assert_eq!(set.len(), 1);
        assert!(set.contains(UNKNOWN_COUNTRY));
        let blank = split_multivalue(Some("  "), UNKNOWN_COUNTRY);
        assert!(blank.contains(UNKNOWN_COUNTRY));
    }

    #[test]
    fn year_clamps_both_ends() {
        assert_eq!(clamp_release_year(Some(1850), 2026), 1900);
        assert_eq!(clamp_release_year(Some(2099), 2026), 2026);
        assert_eq!(clamp_release_year(Some(2015), 2026), 2015);
        assert_eq!(clamp_release_year(None, 2026), DEFAULT_RELEASE_YEAR);
    }

    #[test]
    fn country_substring_match_is_case_insensitive() {
        let rec = ContentRecord {
            id: "s1".into(),
            kind: ContentKind::Series,
            title: "Kingdom".into(),
            countries: ["South Korea".to_string()].into_iter().collect(),
            genres: ["Horror".to_string()].into_iter().collect(),
            release_year: 2019,
            rating: "TV-MA".into(),
            duration_text: "2 Seasons".into(),
            description: "Palace zombies.".into(),
        };
        assert!(rec.country_contains("korea"));
        assert!(rec.country_contains("KOREA"));
        assert!(!rec.country_contains("japan"));
    }
}
