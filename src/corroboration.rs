//! Corroboration matching across a window of recent analyses.
//!
//! Similarity: lowercase, tokenize, sort tokens, then
//! `strsim::normalized_levenshtein` — a token-order-tolerant fuzzy match
//! in [0, 1]. Combined per-candidate score weights title 0.6, summary 0.3
//! and exact source equality 0.1.
//!
//! The matcher does NOT exclude the target from the candidate window;
//! identity exclusion is the caller's responsibility (the analyze handler
//! loads the window before persisting the target, so a fresh article can
//! never self-match).

use strsim::normalized_levenshtein;

use crate::article::{Article, CorroborationMatch, EnrichedAnalysis};

pub const DEFAULT_CORROBORATION_THRESHOLD: f64 = 0.65;

const WEIGHT_TITLE: f64 = 0.6;
const WEIGHT_SUMMARY: f64 = 0.3;
const WEIGHT_SOURCE: f64 = 0.1;

/// Token-order-tolerant similarity in [0, 1]. Empty (or token-free) text
/// on either side yields 0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let ka = token_sort_key(a);
    let kb = token_sort_key(b);
    if ka.is_empty() || kb.is_empty() {
        return 0.0;
    }
    normalized_levenshtein(&ka, &kb)
}

/// Lowercased alphanumeric tokens, sorted and re-joined. Two texts with the
/// same words in a different order map to the same key.
fn token_sort_key(s: &str) -> String {
    let mut tokens: Vec<String> = s
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect();
    tokens.sort();
    tokens.join(" ")
}

/// Combined multi-field similarity between a target article and one
/// candidate's fields.
pub fn combined_similarity(target: &Article, title: &str, summary: &str, source: &str) -> f64 {
    let score_title = similarity(&target.title, title);
    let score_summary = similarity(&target.summary, summary);
    let score_source = if !target.source.is_empty() && target.source == source {
        1.0
    } else {
        0.0
    };
    score_title * WEIGHT_TITLE + score_summary * WEIGHT_SUMMARY + score_source * WEIGHT_SOURCE
}

/// All candidates whose combined similarity reaches `threshold`, in the
/// candidate order given (not re-sorted by similarity).
///
/// The threshold compares against the unrounded score; only the reported
/// similarity is rounded to 3 decimals.
pub fn find_corroborations(
    target: &Article,
    candidates: &[EnrichedAnalysis],
    threshold: f64,
) -> Vec<CorroborationMatch> {
    let mut matches = Vec::new();
    for candidate in candidates {
        let score = combined_similarity(
            target,
            &candidate.article.title,
            &candidate.article.summary,
            &candidate.article.source,
        );
        // 1e-9 tolerance: 0.6 + 0.3 + 0.1 sums just below 1.0 in floats,
        // and an identical candidate must clear a threshold of exactly 1.0.
        if score >= threshold - 1e-9 {
            matches.push(CorroborationMatch {
                id: candidate.article.id.clone(),
                title: candidate.article.title.clone(),
                source: candidate.article.source.clone(),
                similarity: round3(score),
            });
        }
    }
    matches
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
