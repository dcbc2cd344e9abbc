// src/intent.rs
//! Keyword-based intent classification for analytic questions.
//!
//! Rules are evaluated in order and the first match wins, so more specific
//! patterns sit above broader ones (country questions mentioning "korean"
//! route to the Korean share analysis, not the generic country breakdown).
//! Matching is case and whitespace insensitive over the normalized query.

/// The analytic question a free-text query maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticIntent {
    /// Share of Korean-produced titles in the catalog.
    KoreanContentShare,
    /// International versus domestic output over recent years.
    InternationalVsDomesticTrend,
    /// Most common genres across the catalog.
    TopGenres,
    /// Most prolific producing countries.
    TopCountries,
    /// No rule matched.
    Unrecognized,
}

struct IntentRule {
    /// Every phrase must appear.
    all: &'static [&'static str],
    /// At least one phrase must appear (empty slice means no constraint).
    any: &'static [&'static str],
    intent: AnalyticIntent,
}

// Order matters: first matching rule wins.
const RULES: &[IntentRule] = &[
    IntentRule {
        all: &["korean"],
        any: &["percentage", "percent", "share"],
        intent: AnalyticIntent::KoreanContentShare,
    },
    IntentRule {
        all: &["international", "us", "trend"],
        any: &[],
        intent: AnalyticIntent::InternationalVsDomesticTrend,
    },
    IntentRule {
        all: &[],
        any: &["popular genres", "top genres"],
        intent: AnalyticIntent::TopGenres,
    },
    IntentRule {
        all: &[],
        any: &["country", "countries"],
        intent: AnalyticIntent::TopCountries,
    },
];

/// Classify a free-text query.
pub fn classify(query: &str) -> AnalyticIntent {
    let text = normalize(query);
    for rule in RULES {
        let all_ok = rule.all.iter().all(|p| text.contains(p));
        let any_ok = rule.any.is_empty() || rule.any.iter().any(|p| text.contains(p));
        if all_ok && any_ok {
            return rule.intent;
        }
    }
    AnalyticIntent::Unrecognized
}

/// Example questions surfaced when a query is not recognized.
pub fn suggested_queries() -> Vec<String> {
    [
        "What percentage of content is Korean?",
        "Show me international vs US content trends",
        "What are the most popular genres?",
        "Which countries produce the most content?",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_space = false;
    for ch in input.chars() {
        let lc = ch.to_ascii_lowercase();
        if lc.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.push(lc);
            last_space = false;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn korean_share_queries() {
        assert_eq!(
            classify("What percentage of content is Korean?"),
            AnalyticIntent::KoreanContentShare
        );
        assert_eq!(
            classify("korean content SHARE please"),
            AnalyticIntent::KoreanContentShare
        );
    }

    #[test]
    fn korean_without_metric_word_is_unrecognized() {
        assert_eq!(classify("tell me about korean dramas"), AnalyticIntent::Unrecognized);
    }

    #[test]
    fn trend_needs_all_three_words() {
        assert_eq!(
            classify("Show international vs US content trends"),
            AnalyticIntent::InternationalVsDomesticTrend
        );
        assert_eq!(classify("international trends"), AnalyticIntent::Unrecognized);
    }

    #[test]
    fn genre_phrases() {
        assert_eq!(classify("what are the most popular genres?"), AnalyticIntent::TopGenres);
        assert_eq!(classify("top   genres on the platform"), AnalyticIntent::TopGenres);
        // "genres" alone is not enough.
        assert_eq!(classify("list some genres"), AnalyticIntent::Unrecognized);
    }

    #[test]
    fn country_words() {
        assert_eq!(
            classify("which countries produce the most content?"),
            AnalyticIntent::TopCountries
        );
        assert_eq!(classify("content by country"), AnalyticIntent::TopCountries);
    }

    #[test]
    fn specific_rules_win_over_broad_ones() {
        // Mentions a country word but the Korean share rule sits first.
        assert_eq!(
            classify("what share of content comes from the country of South Korea, korean titles?"),
            AnalyticIntent::KoreanContentShare
        );
    }

    #[test]
    fn unmatched_falls_through() {
        assert_eq!(classify("how is the weather"), AnalyticIntent::Unrecognized);
        assert_eq!(classify(""), AnalyticIntent::Unrecognized);
    }
}
