//! Analysis configuration: TOML file + environment overrides.
//!
//! The file is optional — built-in defaults cover every section — and the
//! few knobs that matter operationally (threshold, store location) can be
//! overridden per-environment without touching the file.

use anyhow::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "config/analysis.toml";

pub const ENV_CONFIG_PATH: &str = "ANALYSIS_CONFIG_PATH";
pub const ENV_CORROBORATION_THRESHOLD: &str = "CORROBORATION_THRESHOLD";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_DATA_DIR: &str = "ANALYSIS_DATA_DIR";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub confidence: ConfidenceSection,
    #[serde(default)]
    pub corroboration: CorroborationSection,
    #[serde(default)]
    pub trends: TrendsSection,
    #[serde(default)]
    pub store: StoreSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfidenceSection {
    /// Feature-name → weight table. Scoring divides by the applied weight
    /// sum, so the table does not have to sum to 1.
    #[serde(default = "default_feature_weights")]
    pub weights: HashMap<String, f64>,
}

impl Default for ConfidenceSection {
    fn default() -> Self {
        Self {
            weights: default_feature_weights(),
        }
    }
}

fn default_feature_weights() -> HashMap<String, f64> {
    HashMap::from([
        ("credibility".to_string(), 0.5),
        ("source_reliability".to_string(), 0.3),
        ("theme_relevance".to_string(), 0.2),
    ])
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorroborationSection {
    /// Minimum combined similarity for a candidate to corroborate.
    #[serde(default = "default_corroboration_threshold")]
    pub threshold: f64,
    /// How many days of recent analyses form the candidate window.
    #[serde(default = "default_window_days")]
    pub window_days: i64,
}

impl Default for CorroborationSection {
    fn default() -> Self {
        Self {
            threshold: default_corroboration_threshold(),
            window_days: default_window_days(),
        }
    }
}

fn default_corroboration_threshold() -> f64 {
    0.65
}

fn default_window_days() -> i64 {
    3
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrendsSection {
    /// Window used when the caller does not pass `days`.
    #[serde(default = "default_trend_days")]
    pub default_days: u32,
}

impl Default for TrendsSection {
    fn default() -> Self {
        Self {
            default_days: default_trend_days(),
        }
    }
}

fn default_trend_days() -> u32 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSection {
    /// SQLite URL or bare path; when set, the durable backend is used.
    #[serde(default)]
    pub database_url: Option<String>,
    /// Directory for JSON batch files when no database is configured.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            database_url: None,
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> String {
    "data/analyses".to_string()
}

impl AnalysisConfig {
    /// Load from `ANALYSIS_CONFIG_PATH` (or the default path), falling back
    /// to built-in defaults when the file is absent, then apply env
    /// overrides and clamp values into their valid ranges.
    pub fn load() -> Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut cfg = match fs::read_to_string(&path) {
            Ok(content) => Self::from_toml_str(&content)?,
            Err(_) => {
                info!(path = %path.display(), "analysis config not found; using built-in defaults");
                Self::default()
            }
        };

        cfg.apply_env_overrides();
        cfg.sanitize();
        Ok(cfg)
    }

    /// Parse from a TOML string (used by tests and `load`).
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let mut cfg: AnalysisConfig = toml::from_str(toml_str)?;
        cfg.sanitize();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(t) = parse_threshold_env(std::env::var(ENV_CORROBORATION_THRESHOLD).ok()) {
            self.corroboration.threshold = t;
        }
        if let Ok(url) = std::env::var(ENV_DATABASE_URL) {
            if !url.trim().is_empty() {
                self.store.database_url = Some(url);
            }
        }
        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            if !dir.trim().is_empty() {
                self.store.data_dir = dir;
            }
        }
    }

    fn sanitize(&mut self) {
        if !self.corroboration.threshold.is_finite() {
            self.corroboration.threshold = default_corroboration_threshold();
        }
        self.corroboration.threshold = self.corroboration.threshold.clamp(0.0, 1.0);
        self.corroboration.window_days = self.corroboration.window_days.max(1);
        self.trends.default_days = self.trends.default_days.clamp(1, 365);
        self.confidence
            .weights
            .retain(|_, w| w.is_finite() && *w > 0.0);
        if self.confidence.weights.is_empty() {
            self.confidence.weights = default_feature_weights();
        }
    }
}

// parse optional float env and clamp to <0.0..=1.0>
fn parse_threshold_env(raw: Option<String>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .map(|v| v.clamp(0.0, 1.0))
}
