//! HTTP surface: thin JSON marshalling around the pure engine and the
//! analysis store. No analysis semantics live here.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::article::{ArticleInput, CorroborationMatch, EnrichedAnalysis, StoreSummary};
use crate::config::AnalysisConfig;
use crate::engine;
use crate::ingest;
use crate::store::AnalysisStore;
use crate::trends::{self, MetricsReport};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AnalysisStore>,
    pub config: Arc<AnalysisConfig>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        .route("/trends", get(trends_report))
        .route("/summaries", get(summaries))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Store-level failures become an explicit JSON error; everything else is
/// absorbed into neutral defaults well before reaching a handler.
struct ApiError(anyhow::Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": self.0.to_string() })),
        )
            .into_response()
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let store_ok = state.store.summarize().await.is_ok();
    Json(json!({
        "ok": true,
        "service": "news-trust-analyzer",
        "store": if store_ok { "connected" } else { "degraded" },
    }))
}

#[derive(serde::Serialize)]
struct AnalyzeStats {
    confidence: f64,
    bayesian_posterior: f64,
    corroboration_count: u32,
    corroboration_strength: f64,
}

#[derive(serde::Serialize)]
struct AnalyzeResponse {
    success: bool,
    analysis: EnrichedAnalysis,
    corroborations: Vec<CorroborationMatch>,
    stats: AnalyzeStats,
}

/// Full pipeline on one article: resolve → score → corroborate → fuse →
/// persist. The recent window is loaded BEFORE the append so a fresh
/// article can never corroborate itself.
async fn analyze(
    State(state): State<AppState>,
    Json(input): Json<ArticleInput>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let article = ingest::resolve(input);
    let anon_id = ingest::short_hash(&article.id);

    let recent = state
        .store
        .load_recent(state.config.corroboration.window_days)
        .await;
    let outcome = engine::analyze(article, &recent, &state.config);

    if let Err(e) = state.store.append(std::slice::from_ref(&outcome.analysis)).await {
        warn!(error = ?e, id = %anon_id, "analysis append failed");
        metrics::counter!("store_errors_total").increment(1);
        return Err(ApiError(e));
    }

    metrics::counter!("analyses_total").increment(1);
    metrics::counter!("corroborations_found_total")
        .increment(outcome.analysis.corroboration_count as u64);
    info!(
        id = %anon_id,
        confidence = outcome.analysis.confidence,
        posterior = outcome.analysis.bayesian_posterior,
        corroborations = outcome.analysis.corroboration_count,
        "analysis complete"
    );

    let stats = AnalyzeStats {
        confidence: outcome.analysis.confidence,
        bayesian_posterior: outcome.analysis.bayesian_posterior,
        corroboration_count: outcome.analysis.corroboration_count,
        corroboration_strength: outcome.analysis.corroboration_strength,
    };
    Ok(Json(AnalyzeResponse {
        success: true,
        analysis: outcome.analysis,
        corroborations: outcome.corroborations,
        stats,
    }))
}

#[derive(serde::Deserialize)]
struct TrendsQuery {
    #[serde(default)]
    days: Option<u32>,
}

async fn trends_report(
    State(state): State<AppState>,
    Query(q): Query<TrendsQuery>,
) -> Json<MetricsReport> {
    let days = q
        .days
        .unwrap_or(state.config.trends.default_days)
        .clamp(1, 365);
    Json(trends::compute_metrics(state.store.as_ref(), days).await)
}

async fn summaries(State(state): State<AppState>) -> Json<StoreSummary> {
    match state.store.summarize().await {
        Ok(s) => Json(s),
        Err(e) => {
            warn!(error = ?e, "summaries unavailable; computing over recent window");
            metrics::counter!("store_errors_total").increment(1);
            let window = state.store.load_recent(30).await;
            Json(StoreSummary::from_articles(&window))
        }
    }
}
