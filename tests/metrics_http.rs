// tests/metrics_http.rs
//
// Prometheus exposition over the /metrics router. The recorder is a
// process-global, so everything lives in a single test.

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use catalog_insights::metrics::{self, Metrics};

#[tokio::test]
async fn metrics_endpoint_exposes_counters_and_gauge() {
    let m = Metrics::init(200);
    let app = m.router();

    // Touch every series so it shows up in the exposition.
    metrics::inc_queries();
    metrics::inc_narrative_unavailable();
    metrics::inc_guardrail_unavailable();
    metrics::inc_guardrail_failed();
    metrics::inc_catalog_reloads();
    metrics::set_catalog_records(200);

    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap(); // 1 MiB
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    for needle in [
        "queries_total",
        "narrative_unavailable_total",
        "guardrail_unavailable_total",
        "guardrail_failed_total",
        "catalog_reloads_total",
        "catalog_records 200",
    ] {
        assert!(
            text.contains(needle),
            "metrics exposition missing '{needle}'\n{text}"
        );
    }
}
