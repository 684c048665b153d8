//! article.rs — canonical data model for analyzed articles.
//!
//! Incoming articles are tolerant, loosely-shaped JSON (the aggregator
//! upstream sends several historical field spellings and value shapes).
//! Everything is resolved ONCE at ingestion into the typed forms below;
//! downstream code never branches on input shape again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentiment bucket attached to an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

/// Canonical sentiment: numeric score in [-1, 1] plus its bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub score: f64,
    pub label: SentimentLabel,
}

impl Default for Sentiment {
    fn default() -> Self {
        Self {
            score: 0.0,
            label: SentimentLabel::Neutral,
        }
    }
}

/// Bucket a numeric sentiment score: > 0.1 positive, < -0.1 negative.
pub fn label_from_score(score: f64) -> SentimentLabel {
    if score > 0.1 {
        SentimentLabel::Positive
    } else if score < -0.1 {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    }
}

/// Bucket a textual sentiment: substring match, case-insensitive.
pub fn label_from_text(raw: &str) -> SentimentLabel {
    let s = raw.to_lowercase();
    if s.contains("pos") {
        SentimentLabel::Positive
    } else if s.contains("neg") {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    }
}

/// The sentiment shapes seen in the wild: a bare number, a bare label,
/// or an object with optional score/label fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SentimentInput {
    Score(f64),
    Label(String),
    Detailed {
        #[serde(default)]
        score: Option<f64>,
        #[serde(default, alias = "sentiment")]
        label: Option<String>,
    },
}

impl SentimentInput {
    /// Resolve into the canonical form. An explicit label wins over the
    /// score-derived bucket; a lone label keeps a neutral numeric score.
    pub fn resolve(self) -> Sentiment {
        match self {
            SentimentInput::Score(v) => {
                let score = clamp_score(v);
                Sentiment {
                    score,
                    label: label_from_score(score),
                }
            }
            SentimentInput::Label(s) => Sentiment {
                score: 0.0,
                label: label_from_text(&s),
            },
            SentimentInput::Detailed { score, label } => {
                let score = clamp_score(score.unwrap_or(0.0));
                let label = match label {
                    Some(s) => label_from_text(&s),
                    None => label_from_score(score),
                };
                Sentiment { score, label }
            }
        }
    }
}

fn clamp_score(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// The theme shapes seen in the wild. Variant order matters for the
/// untagged deserializer: `Named` must be tried before `Keyed`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ThemeInput {
    List(Vec<serde_json::Value>),
    Named { names: Vec<String> },
    Keyed(BTreeMap<String, serde_json::Value>),
    Single(String),
}

impl ThemeInput {
    /// Flatten into trimmed, non-empty theme names.
    pub fn resolve(self) -> Vec<String> {
        let raw: Vec<String> = match self {
            ThemeInput::List(items) => items.into_iter().filter_map(scalar_to_theme).collect(),
            ThemeInput::Named { names } => names,
            ThemeInput::Keyed(map) => map.into_keys().collect(),
            ThemeInput::Single(s) => vec![s],
        };
        raw.into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

fn scalar_to_theme(v: serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Loose input shape accepted by the API. Field aliases cover the key
/// spellings the upstream aggregator has used over time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "content")]
    pub summary: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default, alias = "pubDate", alias = "published")]
    pub date: Option<String>,
    #[serde(default, alias = "tone", alias = "sentiment_label")]
    pub sentiment: Option<SentimentInput>,
    #[serde(default, alias = "detected_themes", alias = "topics", alias = "theme")]
    pub themes: Option<ThemeInput>,
    #[serde(default)]
    pub credibility: Option<f64>,
    #[serde(default)]
    pub source_reliability: Option<f64>,
    #[serde(default)]
    pub theme_relevance: Option<f64>,
}

/// Canonical article after ingestion. All analysis code works on this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub date: DateTime<Utc>,
    pub sentiment: Sentiment,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credibility: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_reliability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_relevance: Option<f64>,
}

/// One corroborating candidate above the similarity threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorroborationMatch {
    pub id: String,
    pub title: String,
    pub source: String,
    /// Combined similarity in [0, 1], rounded to 3 decimals.
    pub similarity: f64,
}

/// The article plus everything the fusion pipeline derived from it.
/// Append-only once persisted; the aggregator reads these back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedAnalysis {
    #[serde(flatten)]
    pub article: Article,
    /// Weighted-feature confidence in [0, 1], rounded to 3 decimals.
    pub confidence: f64,
    pub confidence_label: String,
    pub corroboration_count: u32,
    /// Mean similarity over matches, 0.0 if none.
    pub corroboration_strength: f64,
    /// Posterior after sequential fusion, rounded to 4 decimals.
    pub bayesian_posterior: f64,
}

/// Store-wide aggregate, as returned by `AnalysisStore::summarize`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSummary {
    pub total_articles: u64,
    pub avg_confidence: f64,
    pub avg_posterior: f64,
    pub avg_corroboration: f64,
}

impl StoreSummary {
    /// Direct computation over a loaded window; the fallback when the
    /// store cannot produce its own aggregate.
    pub fn from_articles(articles: &[EnrichedAnalysis]) -> Self {
        let n = articles.len();
        if n == 0 {
            return Self::default();
        }
        let mean = |f: fn(&EnrichedAnalysis) -> f64| -> f64 {
            articles.iter().map(f).sum::<f64>() / n as f64
        };
        Self {
            total_articles: n as u64,
            avg_confidence: mean(|a| a.confidence),
            avg_posterior: mean(|a| a.bayesian_posterior),
            avg_corroboration: mean(|a| a.corroboration_strength),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_score_buckets() {
        assert_eq!(label_from_score(0.5), SentimentLabel::Positive);
        assert_eq!(label_from_score(0.1), SentimentLabel::Neutral);
        assert_eq!(label_from_score(-0.1), SentimentLabel::Neutral);
        assert_eq!(label_from_score(-0.11), SentimentLabel::Negative);
    }

    #[test]
    fn sentiment_text_buckets() {
        assert_eq!(label_from_text("Positive"), SentimentLabel::Positive);
        assert_eq!(label_from_text("très négatif"), SentimentLabel::Negative);
        assert_eq!(label_from_text("mixed"), SentimentLabel::Neutral);
    }

    #[test]
    fn sentiment_shapes_resolve() {
        let n: SentimentInput = serde_json::from_str("0.7").unwrap();
        assert_eq!(n.resolve().label, SentimentLabel::Positive);

        let s: SentimentInput = serde_json::from_str("\"negative\"").unwrap();
        assert_eq!(s.resolve().label, SentimentLabel::Negative);

        let d: SentimentInput =
            serde_json::from_str(r#"{"score": -0.4, "sentiment": "negative"}"#).unwrap();
        let resolved = d.resolve();
        assert_eq!(resolved.label, SentimentLabel::Negative);
        assert!((resolved.score + 0.4).abs() < 1e-9);

        // Out-of-range scores are clamped, not rejected.
        let wild: SentimentInput = serde_json::from_str("4.2").unwrap();
        assert!((wild.resolve().score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn theme_shapes_resolve_to_same_list() {
        let list: ThemeInput = serde_json::from_str(r#"["economy", " geopolitics "]"#).unwrap();
        let named: ThemeInput =
            serde_json::from_str(r#"{"names": ["economy", "geopolitics"]}"#).unwrap();
        let single: ThemeInput = serde_json::from_str(r#""economy""#).unwrap();

        assert_eq!(list.resolve(), vec!["economy", "geopolitics"]);
        assert_eq!(named.resolve(), vec!["economy", "geopolitics"]);
        assert_eq!(single.resolve(), vec!["economy"]);
    }

    #[test]
    fn keyed_themes_use_keys() {
        let keyed: ThemeInput =
            serde_json::from_str(r#"{"economy": 3, "geopolitics": 1}"#).unwrap();
        assert_eq!(keyed.resolve(), vec!["economy", "geopolitics"]);
    }

    #[test]
    fn blank_themes_are_dropped() {
        let list: ThemeInput = serde_json::from_str(r#"["", "  ", "energy", null]"#).unwrap();
        assert_eq!(list.resolve(), vec!["energy"]);
    }

    #[test]
    fn summary_from_articles_empty() {
        assert_eq!(StoreSummary::from_articles(&[]), StoreSummary::default());
    }
}
