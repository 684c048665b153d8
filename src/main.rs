//! News Trust Analyzer — Binary Entrypoint
//! Boots the Axum HTTP server, wiring config, store, telemetry and routes.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use news_trust_analyzer::api::{create_router, AppState};
use news_trust_analyzer::config::AnalysisConfig;
use news_trust_analyzer::metrics::Telemetry;
use news_trust_analyzer::store::build_store;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let config = Arc::new(AnalysisConfig::load()?);
    let store = build_store(&config).await?;
    let telemetry = Telemetry::init(config.corroboration.threshold);

    let state = AppState {
        store,
        config: config.clone(),
    };
    let router = create_router(state).merge(telemetry.router());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(%port, "news-trust-analyzer listening");
    axum::serve(listener, router).await?;
    Ok(())
}
