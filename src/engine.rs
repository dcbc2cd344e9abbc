//! # Query Engine
//! Maps a free-text query to its full response: classify, aggregate,
//! augment, score, assemble. Every stage after the aggregation is best
//! effort, so a valid JSON response comes back for any input.

use std::sync::Arc;

use crate::aggregate;
use crate::availability::Unavailable;
use crate::catalog::Catalog;
use crate::guardrail::{GuardContext, Guardrail};
use crate::intent::classify;
use crate::metrics;
use crate::narrative::NarrativeClient;
use crate::respond::{self, QueryResponse};

/// Answer one query against a catalog snapshot.
pub async fn answer_query(
    query: &str,
    catalog: &Arc<Catalog>,
    narrative_client: &dyn NarrativeClient,
    guardrail: &Guardrail,
    guard_ctx: &GuardContext,
) -> QueryResponse {
    metrics::inc_queries();

    let query = query.trim();
    if query.is_empty() {
        return respond::error("Query must not be empty", true);
    }
    if catalog.is_empty() {
        return respond::error("No dataset loaded", true);
    }

    let intent = classify(query);
    tracing::info!(?intent, query, "classified query");

    let Some(result) = aggregate::run(intent, catalog) else {
        // Unrecognized queries still get a best-effort narrative so the
        // caller sees something beyond the suggestion list.
        let narrative = narrative_client.narrate(query, "{}").await;
        note_narrative(&narrative);
        return respond::unrecognized(query, narrative, catalog);
    };

    let analysis_json =
        serde_json::to_string(&result).unwrap_or_else(|_| "{}".to_string());
    let narrative = narrative_client.narrate(query, &analysis_json).await;
    note_narrative(&narrative);

    // The scorer sees what the caller will see: headline plus prose.
    let scored_text = match &narrative {
        Ok(n) => format!("{} {}", result.headline(), n.text),
        Err(_) => result.headline(),
    };
    let safety = guardrail.evaluate(&scored_text, guard_ctx).await;
    match &safety {
        Ok(eval) if !eval.passed => metrics::inc_guardrail_failed(),
        Ok(_) => {}
        Err(reason) => {
            tracing::debug!(%reason, "guardrail unavailable");
            metrics::inc_guardrail_unavailable();
        }
    }

    respond::assemble(query, result, narrative, safety, catalog)
}

fn note_narrative(narrative: &Result<crate::narrative::Narrative, Unavailable>) {
    if let Err(reason) = narrative {
        tracing::debug!(%reason, "narrative unavailable");
        metrics::inc_narrative_unavailable();
    }
}
