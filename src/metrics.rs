use axum::{routing::get, Router};
use metrics::{counter, describe_counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static DESCRIBED: OnceCell<()> = OnceCell::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Initialize the Prometheus recorder and describe the counters once.
    pub fn init(catalog_size: usize) -> Self {
        // Default buckets to avoid API differences across crate versions.
        let builder = PrometheusBuilder::new();

        let handle = builder
            .install_recorder()
            .expect("prometheus: install recorder");

        describe_all();
        gauge!("catalog_records").set(catalog_size as f64);

        Self { handle }
    }

    /// Router exposing `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe_all() {
    DESCRIBED.get_or_init(|| {
        describe_counter!("queries_total", "Queries answered by the engine");
        describe_counter!(
            "narrative_unavailable_total",
            "Queries answered without a narrative"
        );
        describe_counter!(
            "guardrail_unavailable_total",
            "Queries answered without a safety evaluation"
        );
        describe_counter!(
            "guardrail_failed_total",
            "Safety evaluations that did not pass"
        );
        describe_counter!("catalog_reloads_total", "Catalog reloads via the admin route");
    });
}

/// Record the catalog size after a reload.
pub fn set_catalog_records(size: usize) {
    gauge!("catalog_records").set(size as f64);
}

pub fn inc_queries() {
    counter!("queries_total").increment(1);
}

pub fn inc_narrative_unavailable() {
    counter!("narrative_unavailable_total").increment(1);
}

pub fn inc_guardrail_unavailable() {
    counter!("guardrail_unavailable_total").increment(1);
}

pub fn inc_guardrail_failed() {
    counter!("guardrail_failed_total").increment(1);
}

pub fn inc_catalog_reloads() {
    counter!("catalog_reloads_total").increment(1);
}
