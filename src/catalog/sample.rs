// src/catalog/sample.rs
//! Deterministic generated catalog used when no external source is
//! available. Fixed cardinality and fixed distributions so development and
//! tests always see the same data. This source cannot fail.

use std::collections::BTreeSet;

use super::types::{ContentKind, ContentRecord};

/// Number of generated rows: 120 movies followed by 80 series.
pub const SAMPLE_SIZE: usize = 200;
const SAMPLE_MOVIES: usize = 120;

/// A handful of recognizable titles up front; the rest are generated.
const NAMED_TITLES: &[&str] = &[
    "The Irishman",
    "Bird Box",
    "Extraction",
    "The Old Guard",
    "Enola Holmes",
    "Red Notice",
    "Don't Look Up",
    "The Adam Project",
    "The Gray Man",
    "Purple Hearts",
    "Glass Onion",
    "All Quiet on the Western Front",
    "The Sea Beast",
    "Space Sweepers",
    "Carter",
    "RRR",
    "Stranger Things",
    "The Crown",
    "Ozark",
    "Bridgerton",
    "The Witcher",
    "Wednesday",
    "Squid Game",
    "All of Us Are Dead",
    "Kingdom",
    "My Name",
    "Hellbound",
    "Money Heist",
    "Elite",
    "Who Killed Sara?",
];

// (country, row count) (sums to SAMPLE_SIZE).
const COUNTRY_BLOCKS: &[(&str, usize)] = &[
    ("United States", 80),
    ("South Korea", 30),
    ("United Kingdom", 20),
    ("Spain", 15),
    ("India", 15),
    ("Japan", 10),
    ("Germany", 8),
    ("France", 7),
    ("Brazil", 5),
    ("Canada", 5),
    ("Australia", 3),
    ("Mexico", 2),
];

// (release year, row count) (sums to SAMPLE_SIZE).
const YEAR_BLOCKS: &[(i32, usize)] = &[
    (2023, 40),
    (2022, 50),
    (2021, 45),
    (2020, 35),
    (2019, 20),
    (2018, 10),
];

// (rating, row count) (sums to SAMPLE_SIZE).
const RATING_BLOCKS: &[(&str, usize)] = &[
    ("TV-MA", 60),
    ("PG-13", 50),
    ("R", 30),
    ("TV-14", 25),
    ("PG", 20),
    ("TV-PG", 15),
];

const GENRE_CYCLE: &[&str] = &[
    "Action & Adventure, Crime, Dramas",
    "Horror, Thrillers",
    "Action & Adventure, International Movies",
    "Action & Adventure, Sci-Fi & Fantasy",
    "Children & Family, Comedies",
    "Comedies, Romance",
    "Comedies, Dramas",
    "Action & Adventure, Thrillers",
    "Crime, Dramas, International Movies",
    "Documentaries, International Movies",
    "Horror, International Movies, Thrillers",
    "International TV Shows, Korean TV Shows, TV Dramas",
    "International TV Shows, Spanish-Language TV Shows",
    "Kids & Family, TV Comedies",
    "Crime, International TV Shows, TV Dramas",
    "Anime, International TV Shows",
];

fn expand_blocks<T: Copy>(blocks: &[(T, usize)]) -> Vec<T> {
    blocks
        .iter()
        .flat_map(|(v, n)| std::iter::repeat(*v).take(*n))
        .collect()
}

fn genres_for(i: usize, country: &str, kind: ContentKind) -> BTreeSet<String> {
    // Country-flavored overrides mirror the source distribution; everything
    // else cycles through the fixed genre combinations.
    let base = match country {
        "South Korea" => "International Movies, Korean Movies, Dramas",
        "Spain" => "International Movies, Spanish-Language Movies, Thrillers",
        "India" => "International Movies, Bollywood Movies, Dramas",
        _ => GENRE_CYCLE[i % GENRE_CYCLE.len()],
    };
    let adjusted = match kind {
        ContentKind::Series => base.replace("Movies", "TV Shows"),
        ContentKind::Movie => base.to_string(),
    };
    adjusted.split(',').map(|g| g.trim().to_string()).collect()
}

/// Build the full sample catalog. Deterministic: two calls yield identical
/// records in identical order.
pub fn sample_catalog() -> Vec<ContentRecord> {
    let countries = expand_blocks(COUNTRY_BLOCKS);
    let years = expand_blocks(YEAR_BLOCKS);
    let ratings = expand_blocks(RATING_BLOCKS);

    (0..SAMPLE_SIZE)
        .map(|i| {
            let kind = if i < SAMPLE_MOVIES {
                ContentKind::Movie
            } else {
                ContentKind::Series
            };
            let title = NAMED_TITLES
                .get(i)
                .map(|t| t.to_string())
                .unwrap_or_else(|| format!("Sample Title {}", i + 1));
            let country = countries[i];
            let duration_text = match kind {
                ContentKind::Movie => format!("{} min", 90 + (i % 60)),
                ContentKind::Series => {
                    let seasons = 1 + (i % 5);
                    if seasons == 1 {
                        "1 Season".to_string()
                    } else {
                        format!("{seasons} Seasons")
                    }
                }
            };
            let flavor = ["drama", "comedy", "thriller", "action", "romance"][i % 5];
            ContentRecord {
                id: format!("s{}", i + 1),
                kind,
                title,
                countries: [country.to_string()].into_iter().collect(),
                genres: genres_for(i, country, kind),
                release_year: years[i],
                rating: ratings[i].to_string(),
                duration_text,
                description: format!(
                    "An engaging {flavor} that captivates audiences with its compelling storyline."
                ),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_is_deterministic_and_sized() {
        let a = sample_catalog();
        let b = sample_catalog();
        assert_eq!(a.len(), SAMPLE_SIZE);
        assert_eq!(a, b);
    }

    #[test]
    fn sample_kind_split() {
        let cat = sample_catalog();
        let movies = cat.iter().filter(|r| r.kind == ContentKind::Movie).count();
        assert_eq!(movies, 120);
        assert_eq!(cat.len() - movies, 80);
    }

    #[test]
    fn sample_has_korean_block() {
        let cat = sample_catalog();
        let korean = cat.iter().filter(|r| r.country_contains("korea")).count();
        assert_eq!(korean, 30);
    }

    #[test]
    fn sample_titles_are_unique_per_kind() {
        let cat = sample_catalog();
        let mut seen = std::collections::BTreeSet::new();
        for r in &cat {
            assert!(seen.insert((r.title.clone(), r.kind)), "dup: {}", r.title);
        }
    }

    #[test]
    fn series_genres_use_tv_labels() {
        let cat = sample_catalog();
        for r in cat.iter().filter(|r| r.kind == ContentKind::Series) {
            assert!(
                !r.genres.iter().any(|g| g.contains("Movies")),
                "series row {} kept a movie genre label: {:?}",
                r.id,
                r.genres
            );
        }
    }
}
