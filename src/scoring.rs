//! Feature normalization and weighted confidence scoring.
//!
//! A `FeatureSet` maps feature names (credibility, source_reliability,
//! theme_relevance, ...) to raw floats that are *expected* in [0,1] but not
//! guaranteed — every value goes through `normalize_score` before use.
//!
//! Confidence = Σ w_i * norm(feature_i) / Σ w_i over the weight table, so the
//! result stays in [0,1] even if the table is edited to not sum to 1.

use std::collections::HashMap;

use serde::Serialize;

pub type FeatureSet = HashMap<String, f64>;

pub const FEATURE_CREDIBILITY: &str = "credibility";
pub const FEATURE_SOURCE_RELIABILITY: &str = "source_reliability";
pub const FEATURE_THEME_RELEVANCE: &str = "theme_relevance";

/// Confidence plus its human-readable band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceResult {
    /// In [0, 1], rounded to 3 decimals.
    pub confidence: f64,
    pub explanation: &'static str,
}

/// Linearly rescale `value` from [min, max] into [0, 1], clamped.
///
/// Total: absent values and degenerate ranges (max == min) yield 0.0
/// ("no signal"), never an error.
pub fn normalize_score(value: Option<f64>, min_value: f64, max_value: f64) -> f64 {
    let Some(v) = value else {
        return 0.0;
    };
    if !v.is_finite() || max_value == min_value {
        return 0.0;
    }
    ((v - min_value) / (max_value - min_value)).clamp(0.0, 1.0)
}

/// Weighted confidence over normalized features.
///
/// Features missing from the set count as 0 after normalization; features
/// absent from the weight table are ignored. An empty weight table yields 0.
pub fn confidence_from_features(
    features: &FeatureSet,
    weights: &HashMap<String, f64>,
) -> ConfidenceResult {
    let mut total = 0.0;
    let mut weight_sum = 0.0;
    for (name, w) in weights {
        let v = normalize_score(features.get(name).copied(), 0.0, 1.0);
        total += v * w;
        weight_sum += w;
    }

    let confidence = if weight_sum > 0.0 {
        round3(total / weight_sum)
    } else {
        0.0
    };

    ConfidenceResult {
        confidence,
        explanation: explain_confidence(confidence),
    }
}

/// Map a confidence value to its band. The four bands partition [0,1]
/// at 0.45 / 0.65 / 0.85 (closed lower bounds).
pub fn explain_confidence(confidence: f64) -> &'static str {
    if confidence >= 0.85 {
        "Très fiable"
    } else if confidence >= 0.65 {
        "Assez fiable"
    } else if confidence >= 0.45 {
        "Modérément fiable"
    } else {
        "Faible fiabilité"
    }
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights() -> HashMap<String, f64> {
        HashMap::from([
            (FEATURE_CREDIBILITY.to_string(), 0.5),
            (FEATURE_SOURCE_RELIABILITY.to_string(), 0.3),
            (FEATURE_THEME_RELEVANCE.to_string(), 0.2),
        ])
    }

    #[test]
    fn normalize_is_total() {
        assert_eq!(normalize_score(None, 0.0, 1.0), 0.0);
        assert_eq!(normalize_score(Some(0.5), 1.0, 1.0), 0.0);
        assert_eq!(normalize_score(Some(f64::NAN), 0.0, 1.0), 0.0);
    }

    #[test]
    fn normalize_clamps_out_of_range() {
        assert_eq!(normalize_score(Some(-3.0), 0.0, 1.0), 0.0);
        assert_eq!(normalize_score(Some(7.0), 0.0, 1.0), 1.0);
    }

    #[test]
    fn normalize_is_idempotent_in_range() {
        for v in [0.0, 0.25, 0.5, 0.99, 1.0] {
            let once = normalize_score(Some(v), 0.0, 1.0);
            let twice = normalize_score(Some(once), 0.0, 1.0);
            assert!((once - v).abs() < 1e-12);
            assert!((twice - once).abs() < 1e-12);
        }
    }

    #[test]
    fn normalize_is_monotonic() {
        let mut prev = normalize_score(Some(-1.0), 0.0, 1.0);
        for i in 0..=40 {
            let v = -1.0 + i as f64 * 0.075;
            let n = normalize_score(Some(v), 0.0, 1.0);
            assert!(n >= prev, "normalize must be non-decreasing at {v}");
            prev = n;
        }
    }

    #[test]
    fn normalize_rescales_wider_ranges() {
        assert!((normalize_score(Some(5.0), 0.0, 10.0) - 0.5).abs() < 1e-12);
        assert_eq!(normalize_score(Some(-5.0), 0.0, 10.0), 0.0);
    }

    #[test]
    fn confidence_reference_case() {
        // 0.5*0.8 + 0.3*0.6 + 0.2*0.9 = 0.76
        let features = HashMap::from([
            (FEATURE_CREDIBILITY.to_string(), 0.8),
            (FEATURE_SOURCE_RELIABILITY.to_string(), 0.6),
            (FEATURE_THEME_RELEVANCE.to_string(), 0.9),
        ]);
        let r = confidence_from_features(&features, &weights());
        assert!((r.confidence - 0.760).abs() < 1e-9);
        assert_eq!(r.explanation, "Assez fiable");
    }

    #[test]
    fn confidence_empty_features() {
        let r = confidence_from_features(&FeatureSet::new(), &weights());
        assert_eq!(r.confidence, 0.0);
        assert_eq!(r.explanation, "Faible fiabilité");
    }

    #[test]
    fn confidence_ignores_unknown_features() {
        let features = HashMap::from([
            (FEATURE_CREDIBILITY.to_string(), 1.0),
            ("mystery_signal".to_string(), 1.0),
        ]);
        let r = confidence_from_features(&features, &weights());
        // 0.5*1.0 / 1.0 — the unknown feature contributes nothing.
        assert!((r.confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn confidence_stays_in_unit_interval_for_wild_inputs() {
        let features = HashMap::from([
            (FEATURE_CREDIBILITY.to_string(), 42.0),
            (FEATURE_SOURCE_RELIABILITY.to_string(), -7.0),
            (FEATURE_THEME_RELEVANCE.to_string(), f64::INFINITY),
        ]);
        let r = confidence_from_features(&features, &weights());
        assert!((0.0..=1.0).contains(&r.confidence));
    }

    #[test]
    fn confidence_divides_by_applied_weight_sum() {
        // A table that does not sum to 1 must still land in [0,1].
        let weights = HashMap::from([
            (FEATURE_CREDIBILITY.to_string(), 2.0),
            (FEATURE_SOURCE_RELIABILITY.to_string(), 2.0),
        ]);
        let features = HashMap::from([
            (FEATURE_CREDIBILITY.to_string(), 1.0),
            (FEATURE_SOURCE_RELIABILITY.to_string(), 1.0),
        ]);
        let r = confidence_from_features(&features, &weights);
        assert!((r.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn explanation_bands_partition_unit_interval() {
        assert_eq!(explain_confidence(0.0), "Faible fiabilité");
        assert_eq!(explain_confidence(0.449), "Faible fiabilité");
        assert_eq!(explain_confidence(0.45), "Modérément fiable");
        assert_eq!(explain_confidence(0.649), "Modérément fiable");
        assert_eq!(explain_confidence(0.65), "Assez fiable");
        assert_eq!(explain_confidence(0.849), "Assez fiable");
        assert_eq!(explain_confidence(0.85), "Très fiable");
        assert_eq!(explain_confidence(1.0), "Très fiable");
    }
}
