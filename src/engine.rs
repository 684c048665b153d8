//! # Analysis Engine
//! Pure, testable composition of the fusion pipeline:
//! confidence scoring → corroboration matching → Bayesian fusion.
//! No I/O; the HTTP layer supplies the recent-article window and persists
//! the result.

use crate::article::{Article, CorroborationMatch, EnrichedAnalysis};
use crate::config::AnalysisConfig;
use crate::corroboration::find_corroborations;
use crate::fusion::bayesian_fusion;
use crate::scoring::{
    confidence_from_features, FeatureSet, FEATURE_CREDIBILITY, FEATURE_SOURCE_RELIABILITY,
    FEATURE_THEME_RELEVANCE,
};

/// Raw article features absent from the input default to an uninformative
/// midpoint, not to zero — an unknown source is not a discredited one.
const NEUTRAL_FEATURE: f64 = 0.5;

/// The full result of analyzing one article against a recent window.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub analysis: EnrichedAnalysis,
    pub corroborations: Vec<CorroborationMatch>,
}

/// Analyze `article` against `recent`, producing the enriched record.
///
/// Posterior = fuse(prior = confidence,
///                  [corroboration_strength, source_reliability]) —
/// the likelihood order is fixed; the fold is order-sensitive.
pub fn analyze(
    article: Article,
    recent: &[EnrichedAnalysis],
    config: &AnalysisConfig,
) -> AnalysisOutcome {
    let mut features = FeatureSet::new();
    features.insert(
        FEATURE_CREDIBILITY.to_string(),
        article.credibility.unwrap_or(NEUTRAL_FEATURE),
    );
    features.insert(
        FEATURE_SOURCE_RELIABILITY.to_string(),
        article.source_reliability.unwrap_or(NEUTRAL_FEATURE),
    );
    features.insert(
        FEATURE_THEME_RELEVANCE.to_string(),
        article.theme_relevance.unwrap_or(NEUTRAL_FEATURE),
    );
    let confidence = confidence_from_features(&features, &config.confidence.weights);

    let corroborations = find_corroborations(&article, recent, config.corroboration.threshold);
    let corroboration_count = corroborations.len() as u32;
    let corroboration_strength = if corroborations.is_empty() {
        0.0
    } else {
        corroborations.iter().map(|c| c.similarity).sum::<f64>() / corroborations.len() as f64
    };

    let source_reliability = article.source_reliability.unwrap_or(NEUTRAL_FEATURE);
    let bayesian_posterior = bayesian_fusion(
        confidence.confidence,
        &[corroboration_strength, source_reliability],
    );

    let analysis = EnrichedAnalysis {
        article,
        confidence: confidence.confidence,
        confidence_label: confidence.explanation.to_string(),
        corroboration_count,
        corroboration_strength,
        bayesian_posterior,
    };

    AnalysisOutcome {
        analysis,
        corroborations,
    }
}
