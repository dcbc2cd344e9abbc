// src/aggregate.rs
//! Pure aggregations over the catalog.
//!
//! Each function takes an immutable catalog snapshot and returns a serde
//! report struct; no IO, no shared state, fully deterministic. Ties in the
//! ranked reports break alphabetically so repeated runs serialize
//! identically.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::catalog::{Catalog, ContentKind, ContentRecord};
use crate::intent::AnalyticIntent;

/// Years covered by the trend analysis.
pub const TREND_YEARS: std::ops::RangeInclusive<i32> = 2018..=2023;
/// Titles released in or after this year count as "recent".
pub const RECENT_YEAR: i32 = 2020;

const TOP_GENRES_LIMIT: usize = 15;
const TOP_COUNTRIES_LIMIT: usize = 10;
const TOP_INTERNATIONAL_COUNTRIES_LIMIT: usize = 10;
const TOP_SUBSET_GENRES_LIMIT: usize = 5;

const DOMESTIC_COUNTRY: &str = "united states";

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn percentage(part: usize, whole: usize, decimals: u8) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let raw = part as f64 / whole as f64 * 100.0;
    match decimals {
        1 => round1(raw),
        _ => round2(raw),
    }
}

/// Count occurrences and rank by count descending, name ascending on ties.
fn ranked_counts<'a, I>(items: I) -> Vec<(String, usize)>
where
    I: Iterator<Item = &'a String>,
{
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for item in items {
        *counts.entry(item.as_str()).or_default() += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

fn mean_release_year(records: &[&ContentRecord]) -> i32 {
    if records.is_empty() {
        return RECENT_YEAR;
    }
    let sum: i64 = records.iter().map(|r| r.release_year as i64).sum();
    (sum / records.len() as i64) as i32
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NamedCount {
    pub name: String,
    pub titles: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KoreanShareReport {
    pub total_korean_titles: usize,
    pub total_catalog_titles: usize,
    pub percentage: f64,
    pub korean_movies: usize,
    pub korean_series: usize,
    pub top_korean_genres: Vec<NamedCount>,
    pub recent_korean_titles: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct YearSlice {
    pub year: i32,
    pub total_titles: usize,
    pub us_titles: usize,
    pub international_titles: usize,
    pub us_percentage: f64,
    pub international_percentage: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrendReport {
    pub total_titles: usize,
    pub us_titles: usize,
    pub international_titles: usize,
    pub us_percentage: f64,
    pub international_percentage: f64,
    pub yearly_trends: Vec<YearSlice>,
    pub top_international_countries: Vec<NamedCount>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenreStat {
    pub genre: String,
    pub total_titles: usize,
    pub percentage_of_catalog: f64,
    pub movies: usize,
    pub series: usize,
    pub average_release_year: i32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenreReport {
    pub top_genres: Vec<GenreStat>,
    pub recent_top_genres: Vec<NamedCount>,
    pub unique_genres: usize,
    pub average_genres_per_title: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CountryStat {
    pub country: String,
    pub total_titles: usize,
    pub percentage: f64,
    pub movies: usize,
    pub series: usize,
    pub average_release_year: i32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CountryReport {
    pub countries: Vec<CountryStat>,
    pub distinct_countries: usize,
}

/// A computed analysis, ready for response assembly.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum AggregationResult {
    KoreanShare(KoreanShareReport),
    Trend(TrendReport),
    Genres(GenreReport),
    Countries(CountryReport),
}

impl AggregationResult {
    /// One-sentence summary used as the response answer.
    pub fn headline(&self) -> String {
        match self {
            AggregationResult::KoreanShare(r) => format!(
                "{}% of the catalog is Korean content ({} out of {} titles)",
                r.percentage, r.total_korean_titles, r.total_catalog_titles
            ),
            AggregationResult::Trend(r) => format!(
                "International content represents {}% of the catalog ({} out of {} titles)",
                r.international_percentage, r.international_titles, r.total_titles
            ),
            AggregationResult::Genres(r) => match r.top_genres.first() {
                Some(top) => format!(
                    "Most popular genre is '{}' with {} titles ({}% of the catalog)",
                    top.genre,
                    top.total_titles,
                    round1(top.percentage_of_catalog)
                ),
                None => "No genre data available".to_string(),
            },
            AggregationResult::Countries(r) => match r.countries.first() {
                Some(top) => format!(
                    "Top content-producing country is {} with {} titles ({}% of the catalog)",
                    top.country,
                    top.total_titles,
                    round1(top.percentage)
                ),
                None => "No country data available".to_string(),
            },
        }
    }
}

/// Run the aggregation matching a recognized intent.
///
/// Returns `None` only for [`AnalyticIntent::Unrecognized`].
pub fn run(intent: AnalyticIntent, catalog: &Catalog) -> Option<AggregationResult> {
    match intent {
        AnalyticIntent::KoreanContentShare => {
            Some(AggregationResult::KoreanShare(korean_share(catalog)))
        }
        AnalyticIntent::InternationalVsDomesticTrend => {
            Some(AggregationResult::Trend(trend(catalog)))
        }
        AnalyticIntent::TopGenres => Some(AggregationResult::Genres(top_genres(catalog))),
        AnalyticIntent::TopCountries => Some(AggregationResult::Countries(top_countries(catalog))),
        AnalyticIntent::Unrecognized => None,
    }
}

pub fn korean_share(catalog: &Catalog) -> KoreanShareReport {
    let total = catalog.len();
    let korean: Vec<&ContentRecord> = catalog
        .records
        .iter()
        .filter(|r| r.country_contains("korea"))
        .collect();

    let top_korean_genres = ranked_counts(korean.iter().flat_map(|r| r.genres.iter()))
        .into_iter()
        .take(TOP_SUBSET_GENRES_LIMIT)
        .map(|(name, titles)| NamedCount { name, titles })
        .collect();

    KoreanShareReport {
        total_korean_titles: korean.len(),
        total_catalog_titles: total,
        percentage: percentage(korean.len(), total, 2),
        korean_movies: korean.iter().filter(|r| r.kind == ContentKind::Movie).count(),
        korean_series: korean.iter().filter(|r| r.kind == ContentKind::Series).count(),
        top_korean_genres,
        recent_korean_titles: korean
            .iter()
            .filter(|r| r.release_year >= RECENT_YEAR)
            .count(),
    }
}

pub fn trend(catalog: &Catalog) -> TrendReport {
    let total = catalog.len();
    let us_total = catalog
        .records
        .iter()
        .filter(|r| r.country_contains(DOMESTIC_COUNTRY))
        .count();
    let international_total = total - us_total;

    // Years with no releases are omitted rather than reported as zeros.
    let yearly_trends = TREND_YEARS
        .filter_map(|year| {
            let in_year: Vec<&ContentRecord> = catalog
                .records
                .iter()
                .filter(|r| r.release_year == year)
                .collect();
            if in_year.is_empty() {
                return None;
            }
            let us = in_year
                .iter()
                .filter(|r| r.country_contains(DOMESTIC_COUNTRY))
                .count();
            Some(YearSlice {
                year,
                total_titles: in_year.len(),
                us_titles: us,
                international_titles: in_year.len() - us,
                us_percentage: percentage(us, in_year.len(), 1),
                international_percentage: percentage(in_year.len() - us, in_year.len(), 1),
            })
        })
        .collect();

    let top_international_countries = ranked_counts(
        catalog
            .records
            .iter()
            .filter(|r| !r.country_contains(DOMESTIC_COUNTRY))
            .flat_map(|r| r.countries.iter()),
    )
    .into_iter()
    .take(TOP_INTERNATIONAL_COUNTRIES_LIMIT)
    .map(|(name, titles)| NamedCount { name, titles })
    .collect();

    TrendReport {
        total_titles: total,
        us_titles: us_total,
        international_titles: international_total,
        us_percentage: percentage(us_total, total, 1),
        international_percentage: percentage(international_total, total, 1),
        yearly_trends,
        top_international_countries,
    }
}

pub fn top_genres(catalog: &Catalog) -> GenreReport {
    let total = catalog.len();
    let ranked = ranked_counts(catalog.records.iter().flat_map(|r| r.genres.iter()));
    let unique_genres = ranked.len();
    let genre_mentions: usize = ranked.iter().map(|(_, c)| c).sum();

    let top_genres = ranked
        .iter()
        .take(TOP_GENRES_LIMIT)
        .map(|(genre, count)| {
            let in_genre: Vec<&ContentRecord> = catalog
                .records
                .iter()
                .filter(|r| r.genres.contains(genre))
                .collect();
            GenreStat {
                genre: genre.clone(),
                total_titles: *count,
                percentage_of_catalog: percentage(*count, total, 2),
                movies: in_genre.iter().filter(|r| r.kind == ContentKind::Movie).count(),
                series: in_genre.iter().filter(|r| r.kind == ContentKind::Series).count(),
                average_release_year: mean_release_year(&in_genre),
            }
        })
        .collect();

    let recent_top_genres = ranked_counts(
        catalog
            .records
            .iter()
            .filter(|r| r.release_year >= RECENT_YEAR)
            .flat_map(|r| r.genres.iter()),
    )
    .into_iter()
    .take(TOP_SUBSET_GENRES_LIMIT)
    .map(|(name, titles)| NamedCount { name, titles })
    .collect();

    GenreReport {
        top_genres,
        recent_top_genres,
        unique_genres,
        average_genres_per_title: if total == 0 {
            0.0
        } else {
            round1(genre_mentions as f64 / total as f64)
        },
    }
}

pub fn top_countries(catalog: &Catalog) -> CountryReport {
    let total = catalog.len();
    let ranked = ranked_counts(catalog.records.iter().flat_map(|r| r.countries.iter()));
    let distinct_countries = ranked.len();

    let countries = ranked
        .into_iter()
        .take(TOP_COUNTRIES_LIMIT)
        .map(|(country, count)| {
            let in_country: Vec<&ContentRecord> = catalog
                .records
                .iter()
                .filter(|r| r.countries.contains(&country))
                .collect();
            CountryStat {
                country,
                total_titles: count,
                percentage: percentage(count, total, 2),
                movies: in_country.iter().filter(|r| r.kind == ContentKind::Movie).count(),
                series: in_country.iter().filter(|r| r.kind == ContentKind::Series).count(),
                average_release_year: mean_release_year(&in_country),
            }
        })
        .collect();

    CountryReport {
        countries,
        distinct_countries,
    }
}

/// Rating frequency, ranked. Used by the dataset info endpoint.
pub fn rating_counts(catalog: &Catalog) -> Vec<NamedCount> {
    ranked_counts(catalog.records.iter().map(|r| &r.rating))
        .into_iter()
        .map(|(name, titles)| NamedCount { name, titles })
        .collect()
}

/// Per-year title counts in ascending year order.
pub fn yearly_counts(catalog: &Catalog) -> Vec<YearCount> {
    let mut by_year: BTreeMap<i32, usize> = BTreeMap::new();
    for r in catalog.records.iter() {
        *by_year.entry(r.release_year).or_default() += 1;
    }
    by_year
        .into_iter()
        .map(|(year, titles)| YearCount { year, titles })
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct YearCount {
    pub year: i32,
    pub titles: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{sample::sample_catalog, Catalog, DataSource};

    fn catalog() -> Catalog {
        Catalog::new(sample_catalog(), DataSource::Sample)
    }

    fn empty() -> Catalog {
        Catalog::new(Vec::new(), DataSource::Sample)
    }

    #[test]
    fn korean_share_on_sample() {
        let report = korean_share(&catalog());
        assert_eq!(report.total_catalog_titles, 200);
        assert_eq!(report.total_korean_titles, 30);
        assert_eq!(report.percentage, 15.0);
        assert_eq!(report.korean_movies + report.korean_series, 30);
        assert!(report.top_korean_genres.len() <= 5);
        assert!(!report.top_korean_genres.is_empty());
        assert!(report.recent_korean_titles <= report.total_korean_titles);
    }

    #[test]
    fn trend_on_sample() {
        let report = trend(&catalog());
        assert_eq!(report.total_titles, 200);
        assert_eq!(report.us_titles, 80);
        assert_eq!(report.international_titles, 120);
        assert_eq!(report.international_percentage, 60.0);
        // All sample years fall into the analysis window.
        assert_eq!(report.yearly_trends.len(), 6);
        for slice in &report.yearly_trends {
            assert_eq!(slice.us_titles + slice.international_titles, slice.total_titles);
        }
        assert!(report.top_international_countries.len() <= 10);
        assert_eq!(report.top_international_countries[0].name, "South Korea");
    }

    #[test]
    fn genres_on_sample() {
        let report = top_genres(&catalog());
        assert!(report.top_genres.len() <= 15);
        assert!(!report.top_genres.is_empty());
        // Ranked by count descending.
        for pair in report.top_genres.windows(2) {
            assert!(pair[0].total_titles >= pair[1].total_titles);
        }
        assert!(report.average_genres_per_title > 0.0);
        assert!(report.unique_genres >= report.top_genres.len());
    }

    #[test]
    fn countries_on_sample() {
        let report = top_countries(&catalog());
        assert_eq!(report.countries[0].country, "United States");
        assert_eq!(report.countries[0].total_titles, 80);
        assert_eq!(report.countries[0].percentage, 40.0);
        // 12 distinct producers in the sample, capped to the top 10.
        assert_eq!(report.countries.len(), 10);
        assert_eq!(report.distinct_countries, 12);
        for stat in &report.countries {
            assert_eq!(stat.movies + stat.series, stat.total_titles);
            assert!(stat.average_release_year >= 2018 && stat.average_release_year <= 2023);
        }
    }

    #[test]
    fn empty_catalog_yields_zeroed_reports() {
        let report = korean_share(&empty());
        assert_eq!(report.percentage, 0.0);
        assert_eq!(report.total_korean_titles, 0);

        let report = trend(&empty());
        assert_eq!(report.us_percentage, 0.0);
        assert!(report.yearly_trends.is_empty());

        let report = top_genres(&empty());
        assert!(report.top_genres.is_empty());
        assert_eq!(report.average_genres_per_title, 0.0);

        let report = top_countries(&empty());
        assert!(report.countries.is_empty());
    }

    #[test]
    fn rating_and_year_rollups() {
        let cat = catalog();
        let ratings = rating_counts(&cat);
        assert_eq!(ratings.iter().map(|r| r.titles).sum::<usize>(), 200);
        assert_eq!(ratings[0].name, "TV-MA");

        let years = yearly_counts(&cat);
        assert_eq!(years.first().unwrap().year, 2018);
        assert_eq!(years.last().unwrap().year, 2023);
        assert_eq!(years.iter().map(|y| y.titles).sum::<usize>(), 200);
    }

    #[test]
    fn results_are_deterministic() {
        let cat = catalog();
        let a = serde_json::to_string(&run(AnalyticIntent::TopGenres, &cat).unwrap()).unwrap();
        let b = serde_json::to_string(&run(AnalyticIntent::TopGenres, &cat).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn headlines_mention_the_numbers() {
        let cat = catalog();
        let korean = run(AnalyticIntent::KoreanContentShare, &cat).unwrap();
        assert!(korean.headline().contains("15%"));
        let trend = run(AnalyticIntent::InternationalVsDomesticTrend, &cat).unwrap();
        assert!(trend.headline().contains("60%"));
        assert!(run(AnalyticIntent::Unrecognized, &cat).is_none());
    }
}
