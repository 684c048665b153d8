//! # Trend Aggregator
//! Date-bucketed sentiment and theme evolution over the analysis corpus,
//! plus a corpus-wide summary.
//!
//! Split like the rest of the pipeline: a pure, deterministic
//! `compute_metrics_from_articles` (unit-testable, explicit `today`) and a
//! thin store-reading wrapper.

use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

use crate::article::{EnrichedAnalysis, SentimentLabel, StoreSummary};
use crate::store::AnalysisStore;

/// How many themes the ranking keeps.
const TOP_THEMES: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentPoint {
    pub date: String,
    pub positive: u32,
    pub neutral: u32,
    pub negative: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemePoint {
    pub date: String,
    #[serde(rename = "themeCounts")]
    pub theme_counts: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeCount {
    pub name: String,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub summary: StoreSummary,
    /// ISO dates spanning the requested window, oldest first.
    pub periods: Vec<String>,
    pub sentiment_evolution: Vec<SentimentPoint>,
    pub theme_evolution: Vec<ThemePoint>,
    pub top_themes: Vec<ThemeCount>,
}

/// The `days` most recent calendar dates up to and including `today`,
/// oldest first, as ISO date strings.
pub fn prepare_date_buckets(today: NaiveDate, days: u32) -> Vec<String> {
    (0..days.max(1))
        .rev()
        .map(|i| (today - Days::new(i as u64)).to_string())
        .collect()
}

/// Pure aggregation over an already-loaded corpus window.
///
/// Articles dated outside the window are skipped, never errors. Every
/// in-window article lands in exactly one sentiment bucket.
pub fn compute_metrics_from_articles(
    articles: &[EnrichedAnalysis],
    days: u32,
    today: NaiveDate,
    summary: StoreSummary,
) -> MetricsReport {
    let periods = prepare_date_buckets(today, days);
    let period_index: HashMap<&str, usize> = periods
        .iter()
        .enumerate()
        .map(|(i, d)| (d.as_str(), i))
        .collect();

    let mut sentiment_buckets: Vec<SentimentPoint> = periods
        .iter()
        .map(|d| SentimentPoint {
            date: d.clone(),
            positive: 0,
            neutral: 0,
            negative: 0,
        })
        .collect();
    let mut theme_buckets: Vec<BTreeMap<String, u32>> =
        periods.iter().map(|_| BTreeMap::new()).collect();

    // Global theme counter with stable first-encounter ordering for ties.
    let mut theme_totals: HashMap<String, u32> = HashMap::new();
    let mut theme_order: Vec<String> = Vec::new();

    for analysis in articles {
        let date_key = analysis.article.date.date_naive().to_string();
        let Some(&idx) = period_index.get(date_key.as_str()) else {
            continue;
        };

        let point = &mut sentiment_buckets[idx];
        match analysis.article.sentiment.label {
            SentimentLabel::Positive => point.positive += 1,
            SentimentLabel::Neutral => point.neutral += 1,
            SentimentLabel::Negative => point.negative += 1,
        }

        for theme in &analysis.article.themes {
            let name = theme.trim();
            if name.is_empty() {
                continue;
            }
            *theme_buckets[idx].entry(name.to_string()).or_insert(0) += 1;
            match theme_totals.get_mut(name) {
                Some(total) => *total += 1,
                None => {
                    theme_totals.insert(name.to_string(), 1);
                    theme_order.push(name.to_string());
                }
            }
        }
    }

    // Stable sort keeps first-encounter order among equal counts.
    let mut top_themes: Vec<ThemeCount> = theme_order
        .into_iter()
        .map(|name| {
            let total = theme_totals[&name];
            ThemeCount { name, total }
        })
        .collect();
    top_themes.sort_by(|a, b| b.total.cmp(&a.total));
    top_themes.truncate(TOP_THEMES);

    let theme_evolution = periods
        .iter()
        .zip(theme_buckets)
        .map(|(date, theme_counts)| ThemePoint {
            date: date.clone(),
            theme_counts,
        })
        .collect();

    MetricsReport {
        summary,
        periods,
        sentiment_evolution: sentiment_buckets,
        theme_evolution,
        top_themes,
    }
}

/// Load the recent window and aggregate it. The store's own summary is
/// preferred; on failure the summary is computed over the loaded window.
pub async fn compute_metrics(store: &dyn AnalysisStore, days: u32) -> MetricsReport {
    let articles = store.load_recent(days as i64).await;
    let summary = match store.summarize().await {
        Ok(s) => s,
        Err(e) => {
            warn!(error = ?e, "store summary unavailable; computing over loaded window");
            metrics::counter!("store_errors_total").increment(1);
            StoreSummary::from_articles(&articles)
        }
    };
    compute_metrics_from_articles(&articles, days, Utc::now().date_naive(), summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::{Article, Sentiment};
    use chrono::{TimeZone, Utc};

    fn analysis(date: &str, label: SentimentLabel, themes: &[&str]) -> EnrichedAnalysis {
        let day: NaiveDate = date.parse().expect("test date");
        EnrichedAnalysis {
            article: Article {
                id: format!("id-{date}"),
                title: "t".into(),
                summary: "s".into(),
                source: "src".into(),
                link: None,
                date: Utc
                    .from_utc_datetime(&day.and_hms_opt(12, 0, 0).expect("test time")),
                sentiment: Sentiment { score: 0.0, label },
                themes: themes.iter().map(|t| t.to_string()).collect(),
                credibility: None,
                source_reliability: None,
                theme_relevance: None,
            },
            confidence: 0.6,
            confidence_label: "Modérément fiable".into(),
            corroboration_count: 0,
            corroboration_strength: 0.0,
            bayesian_posterior: 0.5,
        }
    }

    fn today() -> NaiveDate {
        "2026-04-10".parse().unwrap()
    }

    #[test]
    fn buckets_are_consecutive_and_end_today() {
        let periods = prepare_date_buckets(today(), 7);
        assert_eq!(periods.len(), 7);
        assert_eq!(periods[0], "2026-04-04");
        assert_eq!(periods[6], "2026-04-10");
        for pair in periods.windows(2) {
            let a: NaiveDate = pair[0].parse().unwrap();
            let b: NaiveDate = pair[1].parse().unwrap();
            assert_eq!(a + Days::new(1), b);
        }
    }

    #[test]
    fn report_has_exactly_n_periods() {
        for days in [1u32, 5, 30] {
            let r = compute_metrics_from_articles(&[], days, today(), StoreSummary::default());
            assert_eq!(r.periods.len(), days as usize);
            assert_eq!(r.sentiment_evolution.len(), days as usize);
            assert_eq!(r.theme_evolution.len(), days as usize);
        }
    }

    #[test]
    fn out_of_window_articles_are_skipped() {
        let corpus = vec![
            analysis("2026-04-09", SentimentLabel::Positive, &["economy"]),
            analysis("2025-01-01", SentimentLabel::Negative, &["history"]),
        ];
        let r = compute_metrics_from_articles(&corpus, 7, today(), StoreSummary::default());
        let total: u32 = r
            .sentiment_evolution
            .iter()
            .map(|p| p.positive + p.neutral + p.negative)
            .sum();
        assert_eq!(total, 1);
        assert!(r.top_themes.iter().all(|t| t.name != "history"));
    }

    #[test]
    fn sentiment_counts_cover_every_in_window_article() {
        let corpus = vec![
            analysis("2026-04-10", SentimentLabel::Positive, &[]),
            analysis("2026-04-10", SentimentLabel::Neutral, &[]),
            analysis("2026-04-09", SentimentLabel::Negative, &[]),
            analysis("2026-04-08", SentimentLabel::Neutral, &[]),
        ];
        let r = compute_metrics_from_articles(&corpus, 7, today(), StoreSummary::default());
        let total: u32 = r
            .sentiment_evolution
            .iter()
            .map(|p| p.positive + p.neutral + p.negative)
            .sum();
        assert_eq!(total, corpus.len() as u32);

        let last = r.sentiment_evolution.last().unwrap();
        assert_eq!((last.positive, last.neutral, last.negative), (1, 1, 0));
    }

    #[test]
    fn theme_evolution_counts_per_period() {
        let corpus = vec![
            analysis("2026-04-10", SentimentLabel::Neutral, &["economy", "energy"]),
            analysis("2026-04-10", SentimentLabel::Neutral, &["economy"]),
            analysis("2026-04-09", SentimentLabel::Neutral, &["energy"]),
        ];
        let r = compute_metrics_from_articles(&corpus, 2, today(), StoreSummary::default());
        let last = r.theme_evolution.last().unwrap();
        assert_eq!(last.theme_counts["economy"], 2);
        assert_eq!(last.theme_counts["energy"], 1);
    }

    #[test]
    fn top_themes_rank_by_total_with_stable_ties() {
        let corpus = vec![
            analysis("2026-04-10", SentimentLabel::Neutral, &["beta", "alpha"]),
            analysis("2026-04-09", SentimentLabel::Neutral, &["beta", "alpha"]),
            analysis("2026-04-08", SentimentLabel::Neutral, &["beta"]),
        ];
        let r = compute_metrics_from_articles(&corpus, 7, today(), StoreSummary::default());
        assert_eq!(r.top_themes[0].name, "beta");
        assert_eq!(r.top_themes[0].total, 3);
        assert_eq!(r.top_themes[1].name, "alpha");
        assert_eq!(r.top_themes[1].total, 2);
    }

    #[test]
    fn top_themes_are_capped() {
        let names: Vec<String> = (0..40).map(|i| format!("theme-{i:02}")).collect();
        let refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
        let corpus = vec![analysis("2026-04-10", SentimentLabel::Neutral, &refs)];
        let r = compute_metrics_from_articles(&corpus, 1, today(), StoreSummary::default());
        assert_eq!(r.top_themes.len(), 30);
    }

    #[test]
    fn summary_is_passed_through() {
        let summary = StoreSummary {
            total_articles: 12,
            avg_confidence: 0.61,
            avg_posterior: 0.7,
            avg_corroboration: 0.2,
        };
        let r = compute_metrics_from_articles(&[], 3, today(), summary.clone());
        assert_eq!(r.summary, summary);
    }
}
