//! Content Ingest Service — Binary Entrypoint
//! Boots the Axum HTTP server: acquisition + structuring routes and `/metrics`.
//!
//! See `README.md` for quickstart.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing::info;

use content_ingest::{
    api, config, metrics::Metrics, telemetry, ContentAcquisitionService,
};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    // This enables ACQUIRE_CONFIG_PATH / INGEST_LOG_JSON / RUST_LOG from .env.
    let _ = dotenvy::dotenv();

    telemetry::init_tracing();

    let metrics = Metrics::init()?;

    let cfg = config::load_config_default()?;
    info!(
        json_endpoints = cfg.json_endpoints.len(),
        mirrors = cfg.mirrors.len(),
        translation_mirrors = cfg.translation_mirrors.len(),
        "acquisition config loaded"
    );
    let service = Arc::new(ContentAcquisitionService::from_config(cfg)?);

    let router = api::router(service).merge(metrics.router());

    Ok(router.into())
}
