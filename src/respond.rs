// src/respond.rs
//! Response assembly.
//!
//! Pure merge of aggregation output, narrative prose, and the safety
//! evaluation into the wire shape. Degraded stages are substituted with
//! sentinels or omitted; they never turn a computed answer into an error.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate::AggregationResult;
use crate::availability::BestEffort;
use crate::catalog::{Catalog, ContentKind};
use crate::guardrail::SafetyEvaluation;
use crate::intent::suggested_queries;
use crate::narrative::Narrative;

/// Narrative field sentinel used when the augmenter is unavailable.
pub const NARRATIVE_UNAVAILABLE: &str = "Narrative analysis not available";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessBlock {
    pub query: String,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed_breakdown: Option<AggregationResult>,
    pub narrative_insights: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    pub total_records: usize,
    pub source: &'static str,
    pub movies: usize,
    pub series: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_range: Option<(i32, i32)>,
    pub distinct_countries: usize,
    pub loaded_at: DateTime<Utc>,
}

impl DatasetMetadata {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        Self {
            total_records: catalog.len(),
            source: catalog.source.label(),
            movies: catalog.count_kind(ContentKind::Movie),
            series: catalog.count_kind(ContentKind::Series),
            year_range: catalog.year_range(),
            distinct_countries: catalog.distinct_countries(),
            loaded_at: catalog.loaded_at,
        }
    }
}

/// The wire shape for `POST /query`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_intelligence: Option<BusinessBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guardrail_evaluation: Option<SafetyEvaluation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_queries: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_metadata: Option<DatasetMetadata>,
    pub timestamp: DateTime<Utc>,
}

/// Merge the stages of a recognized query into the response.
///
/// A failed (not unavailable) safety evaluation appends a warning built from
/// its first two recommendations to the narrative field. The aggregation
/// itself is never redacted.
pub fn assemble(
    query: &str,
    result: AggregationResult,
    narrative: BestEffort<Narrative>,
    safety: BestEffort<SafetyEvaluation>,
    catalog: &Catalog,
) -> QueryResponse {
    let answer = result.headline();

    let mut narrative_insights = match &narrative {
        Ok(n) => n.text.clone(),
        Err(reason) => {
            tracing::debug!(%reason, "narrative unavailable");
            NARRATIVE_UNAVAILABLE.to_string()
        }
    };

    let guardrail_evaluation = match safety {
        Ok(eval) => {
            if !eval.passed {
                let warning: Vec<&str> = eval
                    .recommendations
                    .iter()
                    .take(2)
                    .map(String::as_str)
                    .collect();
                if !warning.is_empty() {
                    let level = if eval.overall_score > 0.4 {
                        "warning"
                    } else {
                        "critical"
                    };
                    narrative_insights =
                        format!("{narrative_insights} [content {level}: {}]", warning.join("; "));
                }
            }
            Some(eval)
        }
        Err(reason) => {
            tracing::debug!(%reason, "guardrail unavailable");
            None
        }
    };

    QueryResponse {
        status: ResponseStatus::Success,
        business_intelligence: Some(BusinessBlock {
            query: query.to_string(),
            answer,
            detailed_breakdown: Some(result),
            narrative_insights,
        }),
        guardrail_evaluation,
        suggested_queries: None,
        message: None,
        dataset_metadata: Some(DatasetMetadata::from_catalog(catalog)),
        timestamp: Utc::now(),
    }
}

/// Response for a query no rule matched. Still a success, with examples of
/// what the service understands.
pub fn unrecognized(query: &str, narrative: BestEffort<Narrative>, catalog: &Catalog) -> QueryResponse {
    let narrative_insights = match narrative {
        Ok(n) => n.text,
        Err(_) => NARRATIVE_UNAVAILABLE.to_string(),
    };
    QueryResponse {
        status: ResponseStatus::Success,
        business_intelligence: Some(BusinessBlock {
            query: query.to_string(),
            answer: "No analysis pattern matched this query".to_string(),
            detailed_breakdown: None,
            narrative_insights,
        }),
        guardrail_evaluation: None,
        suggested_queries: Some(suggested_queries()),
        message: None,
        dataset_metadata: Some(DatasetMetadata::from_catalog(catalog)),
        timestamp: Utc::now(),
    }
}

/// Error response, used when the dataset is empty or a request is malformed.
pub fn error(message: impl Into<String>, with_suggestions: bool) -> QueryResponse {
    QueryResponse {
        status: ResponseStatus::Error,
        business_intelligence: None,
        guardrail_evaluation: None,
        suggested_queries: with_suggestions.then(suggested_queries),
        message: Some(message.into()),
        dataset_metadata: None,
        timestamp: Utc::now(),
    }
}
