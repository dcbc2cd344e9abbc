// src/catalog/remote.rs
//! Remote catalog source backed by a TMDB-compatible discovery API.
//!
//! Pulls paginated movie and TV discovery results, maps numeric genre ids to
//! names via the genre list endpoints, and normalizes everything into
//! [`ContentRecord`]s. Rate limiting (HTTP 429) is handled by a single fixed
//! backoff and retry per page.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use super::types::{
    clamp_release_year, ContentKind, ContentRecord, UNKNOWN_COUNTRY, UNKNOWN_DESCRIPTION,
    UNKNOWN_DURATION, UNKNOWN_GENRE, UNKNOWN_RATING,
};

const API_BASE: &str = "https://api.themoviedb.org/3";
const MOVIE_PAGES: u32 = 25;
const TV_PAGES: u32 = 15;
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct GenreListBody {
    genres: Vec<GenreEntry>,
}

#[derive(Debug, Deserialize)]
struct GenreEntry {
    id: u32,
    name: String,
}

#[derive(Debug, Deserialize)]
struct DiscoverBody {
    #[serde(default)]
    results: Vec<DiscoverEntry>,
}

#[derive(Debug, Deserialize)]
struct DiscoverEntry {
    id: u64,
    title: Option<String>,
    name: Option<String>,
    #[serde(default)]
    genre_ids: Vec<u32>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    overview: Option<String>,
    #[serde(default)]
    origin_country: Vec<String>,
}

pub struct RemoteCatalogClient {
    http: reqwest::Client,
    api_key: String,
}

impl RemoteCatalogClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .context("building http client")?;
        Ok(Self {
            http,
            api_key: api_key.into(),
        })
    }

    /// Fetch both discovery feeds and return the raw record list.
    pub async fn fetch_all(&self) -> Result<Vec<ContentRecord>> {
        let movie_genres = self
            .fetch_genre_map("movie")
            .await
            .unwrap_or_else(|err| {
                tracing::warn!(%err, "movie genre list failed, using builtin map");
                builtin_genre_map()
            });
        let tv_genres = self.fetch_genre_map("tv").await.unwrap_or_else(|err| {
            tracing::warn!(%err, "tv genre list failed, using builtin map");
            builtin_genre_map()
        });

        let mut records = Vec::new();
        for page in 1..=MOVIE_PAGES {
            let body = self.fetch_discover_page("movie", page).await?;
            for entry in body.results {
                records.push(map_entry(entry, ContentKind::Movie, &movie_genres));
            }
        }
        for page in 1..=TV_PAGES {
            let body = self.fetch_discover_page("tv", page).await?;
            for entry in body.results {
                records.push(map_entry(entry, ContentKind::Series, &tv_genres));
            }
        }

        if records.is_empty() {
            return Err(anyhow!("remote api returned no usable records"));
        }
        Ok(records)
    }

    async fn fetch_genre_map(&self, media: &str) -> Result<HashMap<u32, String>> {
        let url = format!("{API_BASE}/genre/{media}/list");
        let body: GenreListBody = self.get_json(&url, &[]).await?;
        Ok(body.genres.into_iter().map(|g| (g.id, g.name)).collect())
    }

    async fn fetch_discover_page(&self, media: &str, page: u32) -> Result<DiscoverBody> {
        let url = format!("{API_BASE}/discover/{media}");
        let page_str = page.to_string();
        self.get_json(&url, &[("sort_by", "popularity.desc"), ("page", &page_str)])
            .await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let mut attempts = 0u8;
        loop {
            let resp = self
                .http
                .get(url)
                .bearer_auth(&self.api_key)
                .query(query)
                .send()
                .await
                .with_context(|| format!("GET {url}"))?;

            if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS && attempts == 0 {
                attempts += 1;
                tracing::warn!(url, "rate limited, backing off before retry");
                tokio::time::sleep(RATE_LIMIT_BACKOFF).await;
                continue;
            }

            let resp = resp
                .error_for_status()
                .with_context(|| format!("status for {url}"))?;
            return resp.json::<T>().await.with_context(|| format!("body of {url}"));
        }
    }
}

fn map_entry(
    entry: DiscoverEntry,
    kind: ContentKind,
    genre_names: &HashMap<u32, String>,
) -> ContentRecord {
    let (id_prefix, title, date) = match kind {
        ContentKind::Movie => ("tm_m", entry.title, entry.release_date),
        ContentKind::Series => ("tm_t", entry.name, entry.first_air_date),
    };
    let title = title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled".to_string());

    let genres: BTreeSet<String> = entry
        .genre_ids
        .iter()
        .filter_map(|id| genre_names.get(id).cloned())
        .collect();
    let genres = if genres.is_empty() {
        [UNKNOWN_GENRE.to_string()].into_iter().collect()
    } else {
        genres
    };

    let countries: BTreeSet<String> = entry
        .origin_country
        .iter()
        .filter_map(|code| country_name(code))
        .map(|c| c.to_string())
        .collect();
    let countries = if countries.is_empty() {
        [UNKNOWN_COUNTRY.to_string()].into_iter().collect()
    } else {
        countries
    };

    let year = date
        .as_deref()
        .and_then(|d| d.get(0..4))
        .and_then(|y| y.parse::<i32>().ok());

    ContentRecord {
        id: format!("{id_prefix}_{}", entry.id),
        kind,
        title,
        countries,
        genres,
        release_year: clamp_release_year(year, chrono::Datelike::year(&chrono::Utc::now())),
        rating: UNKNOWN_RATING.to_string(),
        duration_text: UNKNOWN_DURATION.to_string(),
        description: entry
            .overview
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| UNKNOWN_DESCRIPTION.to_string()),
    }
}

/// ISO 3166-1 alpha-2 codes seen in discovery payloads, mapped to the names
/// the aggregations expect. Unlisted codes fall through to the raw code.
fn country_name(code: &str) -> Option<&str> {
    let name = match code {
        "US" => "United States",
        "KR" => "South Korea",
        "GB" => "United Kingdom",
        "JP" => "Japan",
        "IN" => "India",
        "ES" => "Spain",
        "FR" => "France",
        "DE" => "Germany",
        "BR" => "Brazil",
        "CA" => "Canada",
        "AU" => "Australia",
        "MX" => "Mexico",
        "IT" => "Italy",
        "CN" => "China",
        "TR" => "Turkey",
        "CO" => "Colombia",
        "AR" => "Argentina",
        "TH" => "Thailand",
        "PL" => "Poland",
        "NL" => "Netherlands",
        "SE" => "Sweden",
        "DK" => "Denmark",
        "NO" => "Norway",
        "" => return None,
        other => other,
    };
    Some(name)
}

/// Fallback genre map used when the genre list endpoints are unavailable.
fn builtin_genre_map() -> HashMap<u32, String> {
    [
        (28, "Action & Adventure"),
        (12, "Action & Adventure"),
        (16, "Anime Features"),
        (35, "Comedies"),
        (80, "Crime"),
        (99, "Documentaries"),
        (18, "Dramas"),
        (10751, "Children & Family"),
        (14, "Sci-Fi & Fantasy"),
        (36, "Dramas"),
        (27, "Horror"),
        (10402, "Music & Musicals"),
        (9648, "Thrillers"),
        (10749, "Romance"),
        (878, "Sci-Fi & Fantasy"),
        (53, "Thrillers"),
        (10752, "Dramas"),
        (37, "Action & Adventure"),
        (10759, "Action & Adventure"),
        (10762, "Kids' TV"),
        (10763, "Docuseries"),
        (10764, "Reality TV"),
        (10765, "Sci-Fi & Fantasy"),
        (10766, "TV Dramas"),
        (10767, "Stand-Up Comedy & Talk Shows"),
        (10768, "TV Dramas"),
    ]
    .into_iter()
    .map(|(id, name)| (id, name.to_string()))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, date: &str, genres: &[u32], countries: &[&str]) -> DiscoverEntry {
        DiscoverEntry {
            id: 7,
            title: Some(title.to_string()),
            name: None,
            genre_ids: genres.to_vec(),
            release_date: Some(date.to_string()),
            first_air_date: None,
            overview: Some("A story.".to_string()),
            origin_country: countries.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn maps_movie_entry() {
        let genres = builtin_genre_map();
        let rec = map_entry(entry("Heat", "1995-12-15", &[28, 80], &["US"]), ContentKind::Movie, &genres);
        assert_eq!(rec.id, "tm_m_7");
        assert_eq!(rec.kind, ContentKind::Movie);
        assert_eq!(rec.release_year, 1995);
        assert!(rec.countries.contains("United States"));
        assert!(rec.genres.contains("Crime"));
        assert_eq!(rec.rating, UNKNOWN_RATING);
    }

    #[test]
    fn missing_fields_get_sentinels() {
        let rec = map_entry(
            DiscoverEntry {
                id: 9,
                title: None,
                name: Some("Untamed".to_string()),
                genre_ids: vec![],
                release_date: None,
                first_air_date: None,
                overview: None,
                origin_country: vec![],
            },
            ContentKind::Series,
            &builtin_genre_map(),
        );
        assert_eq!(rec.id, "tm_t_9");
        assert_eq!(rec.title, "Untamed");
        assert!(rec.genres.contains(UNKNOWN_GENRE));
        assert!(rec.countries.contains(UNKNOWN_COUNTRY));
        assert_eq!(rec.description, UNKNOWN_DESCRIPTION);
    }

    #[test]
    fn unknown_country_code_passes_through() {
        assert_eq!(country_name("ZA"), Some("ZA"));
        assert_eq!(country_name(""), None);
        assert_eq!(country_name("KR"), Some("South Korea"));
    }
}
