// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod article;
pub mod config;
pub mod corroboration;
pub mod engine;
pub mod fusion;
pub mod ingest;
pub mod metrics;
pub mod scoring;
pub mod store;
pub mod trends;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::article::{Article, CorroborationMatch, EnrichedAnalysis, StoreSummary};
pub use crate::config::AnalysisConfig;
pub use crate::corroboration::{find_corroborations, similarity};
pub use crate::engine::{analyze, AnalysisOutcome};
pub use crate::fusion::bayesian_fusion;
pub use crate::scoring::{confidence_from_features, explain_confidence, normalize_score};
pub use crate::store::{build_store, AnalysisStore};
pub use crate::trends::{compute_metrics, compute_metrics_from_articles, MetricsReport};
