use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::aggregate;
use crate::catalog::{self, CatalogHandle};
use crate::config::CatalogConfig;
use crate::engine;
use crate::guardrail::{ContentType, GuardContext, Guardrail};
use crate::intent::{classify, suggested_queries};
use crate::metrics;
use crate::narrative::DynNarrativeClient;
use crate::respond::{self, DatasetMetadata, QueryResponse};

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogHandle,
    pub narrative: DynNarrativeClient,
    pub guardrail: Arc<Guardrail>,
    pub config: Arc<CatalogConfig>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/query", post(query))
        .route("/test", post(test_query))
        .route("/dataset-info", get(dataset_info))
        .route("/admin/reload", post(admin_reload))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryReq {
    query: String,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    business_context: Option<String>,
    #[serde(default)]
    bias_type: Option<String>,
}

async fn query(State(state): State<AppState>, Json(body): Json<QueryReq>) -> Json<QueryResponse> {
    let ctx = GuardContext {
        content_type: body
            .content_type
            .as_deref()
            .map(ContentType::parse)
            .unwrap_or_default(),
        business_context: body.business_context,
        bias_type: body.bias_type,
    };
    let snapshot = state.catalog.snapshot();
    let resp = engine::answer_query(
        &body.query,
        &snapshot,
        state.narrative.as_ref(),
        &state.guardrail,
        &ctx,
    )
    .await;
    Json(resp)
}

#[derive(Deserialize)]
struct TestReq {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TestResp {
    status: &'static str,
    echo: String,
    intent: String,
    narrative_provider: &'static str,
    guardrail_transport: &'static str,
    catalog_records: usize,
    timestamp: chrono::DateTime<chrono::Utc>,
}

/// Connectivity probe: classifies the message without running anything.
async fn test_query(State(state): State<AppState>, Json(body): Json<TestReq>) -> Json<TestResp> {
    let message = body.message.unwrap_or_else(|| "ping".to_string());
    let intent = format!("{:?}", classify(&message));
    Json(TestResp {
        status: "success",
        echo: message,
        intent,
        narrative_provider: state.narrative.provider_name(),
        guardrail_transport: state.guardrail.transport_name(),
        catalog_records: state.catalog.snapshot().len(),
        timestamp: chrono::Utc::now(),
    })
}

#[derive(Deserialize)]
struct DatasetInfoParams {
    #[serde(default)]
    detail: Option<String>,
}

/// Detail levels for `/dataset-info`. Each level includes the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum DetailLevel {
    Basic,
    Detailed,
    Full,
}

impl DetailLevel {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("detailed") => Self::Detailed,
            Some("full") => Self::Full,
            _ => Self::Basic,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QualityStats {
    unknown_country: usize,
    unknown_genre: usize,
    unrated: usize,
    missing_description: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DatasetInfoResp {
    status: &'static str,
    dataset_metadata: DatasetMetadata,
    capabilities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_countries: Option<aggregate::CountryReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_genres: Option<aggregate::GenreReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ratings: Option<Vec<aggregate::NamedCount>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    yearly_counts: Option<Vec<aggregate::YearCount>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    columns: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quality: Option<QualityStats>,
    timestamp: chrono::DateTime<chrono::Utc>,
}

async fn dataset_info(
    State(state): State<AppState>,
    Query(params): Query<DatasetInfoParams>,
) -> Json<DatasetInfoResp> {
    let snapshot = state.catalog.snapshot();
    let level = DetailLevel::parse(params.detail.as_deref());
    let detailed = level >= DetailLevel::Detailed;
    let full = level == DetailLevel::Full;
    Json(DatasetInfoResp {
        status: "success",
        dataset_metadata: DatasetMetadata::from_catalog(&snapshot),
        capabilities: suggested_queries(),
        top_countries: detailed.then(|| aggregate::top_countries(&snapshot)),
        top_genres: detailed.then(|| aggregate::top_genres(&snapshot)),
        ratings: detailed.then(|| aggregate::rating_counts(&snapshot)),
        yearly_counts: detailed.then(|| aggregate::yearly_counts(&snapshot)),
        columns: full.then(|| {
            vec![
                "id",
                "kind",
                "title",
                "countries",
                "genres",
                "releaseYear",
                "rating",
                "duration",
                "description",
            ]
        }),
        quality: full.then(|| quality_stats(&snapshot)),
        timestamp: chrono::Utc::now(),
    })
}

fn quality_stats(catalog: &catalog::Catalog) -> QualityStats {
    use crate::catalog::types::{
        UNKNOWN_COUNTRY, UNKNOWN_DESCRIPTION, UNKNOWN_GENRE, UNKNOWN_RATING,
    };
    QualityStats {
        unknown_country: catalog
            .records
            .iter()
            .filter(|r| r.countries.contains(UNKNOWN_COUNTRY))
            .count(),
        unknown_genre: catalog
            .records
            .iter()
            .filter(|r| r.genres.contains(UNKNOWN_GENRE))
            .count(),
        unrated: catalog
            .records
            .iter()
            .filter(|r| r.rating == UNKNOWN_RATING)
            .count(),
        missing_description: catalog
            .records
            .iter()
            .filter(|r| r.description == UNKNOWN_DESCRIPTION)
            .count(),
    }
}

#[derive(Deserialize)]
struct ReloadReq {
    /// "csv" | "remote" | "sample" | "auto"; absent keeps the configured pin.
    #[serde(default)]
    source: Option<String>,
}

/// Reload the catalog and publish the fresh snapshot. Readers keep the old
/// snapshot until the swap. The body is optional; an empty body keeps the
/// configured source preference.
async fn admin_reload(State(state): State<AppState>, body: String) -> Json<QueryResponse> {
    let requested = serde_json::from_str::<ReloadReq>(&body)
        .ok()
        .and_then(|req| req.source)
        .map(|raw| catalog::SourcePreference::parse(&raw));
    let config = match requested {
        Some(preference) => {
            let mut cfg = (*state.config).clone();
            cfg.source_preference = preference;
            cfg
        }
        None => (*state.config).clone(),
    };
    match catalog::load(&config).await {
        Ok(fresh) => {
            let meta_catalog = fresh.clone();
            state.catalog.publish(fresh);
            metrics::inc_catalog_reloads();
            metrics::set_catalog_records(meta_catalog.len());
            tracing::info!(
                rows = meta_catalog.len(),
                source = meta_catalog.source.label(),
                "catalog reloaded"
            );
            Json(QueryResponse {
                status: respond::ResponseStatus::Success,
                business_intelligence: None,
                guardrail_evaluation: None,
                suggested_queries: None,
                message: Some("catalog reloaded".to_string()),
                dataset_metadata: Some(DatasetMetadata::from_catalog(&meta_catalog)),
                timestamp: chrono::Utc::now(),
            })
        }
        Err(err) => {
            tracing::error!(%err, "catalog reload failed");
            Json(respond::error(format!("reload failed: {err}"), false))
        }
    }
}
