//! Catalog Insights server entrypoint.
//! Boots the Axum HTTP server, wiring the catalog snapshot, analysis stack,
//! and metrics endpoint.
//!
//! See `README.md` for quickstart.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use catalog_insights::api::{self, AppState};
use catalog_insights::catalog::{self, CatalogHandle};
use catalog_insights::config::CatalogConfig;
use catalog_insights::guardrail::Guardrail;
use catalog_insights::metrics::Metrics;
use catalog_insights::narrative::{build_client_from_config, load_narrative_config};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,catalog_insights=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Arc::new(CatalogConfig::from_env());

    let loaded = catalog::load(&config)
        .await
        .context("initial catalog load failed")?;
    tracing::info!(
        records = loaded.len(),
        source = loaded.source.label(),
        "catalog ready"
    );

    let metrics = Metrics::init(loaded.len());

    let narrative = build_client_from_config(&load_narrative_config());
    tracing::info!(provider = narrative.provider_name(), "narrative client ready");

    let guardrail = Arc::new(Guardrail::from_env(&config.blocklist_path));
    tracing::info!(transport = guardrail.transport_name(), "guardrail ready");

    let state = AppState {
        catalog: CatalogHandle::new(loaded),
        narrative,
        guardrail,
        config,
    };

    let app: Router = api::create_router(state).merge(metrics.router());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
