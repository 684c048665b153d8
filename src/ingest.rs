//! Input normalization: loose article JSON → canonical `Article`.
//!
//! Malformed or missing fields never fail ingestion; they resolve to
//! neutral defaults (empty text, neutral sentiment, "now" dates).

use chrono::{DateTime, NaiveDate, Utc};

use crate::article::{Article, ArticleInput};

/// Normalize text: decode HTML entities, strip tags, normalize typographic
/// quotes, collapse whitespace, trim, drop trailing sentence punctuation.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 5) Strip trailing sentence punctuation (keep quotes)
    while let Some(last) = out.chars().last() {
        if matches!(last, '!' | '?' | '.' | ',') {
            out.pop();
        } else {
            break;
        }
    }

    // 6) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// Tolerant date parsing: RFC 3339 first, then a leading `YYYY-MM-DD`.
/// Unparseable or absent dates resolve to now.
pub fn parse_date(raw: Option<&str>) -> DateTime<Utc> {
    let Some(s) = raw else {
        return Utc::now();
    };
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Some(prefix) = s.get(..10) {
        if let Ok(d) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return dt.and_utc();
            }
        }
    }
    Utc::now()
}

/// Short stable hex id derived from the article's identity fields.
/// Also what we log instead of raw text.
pub fn short_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Resolve a loose input into the canonical `Article`. Total: every input
/// shape produces a structurally valid article.
pub fn resolve(input: ArticleInput) -> Article {
    let title = normalize_text(input.title.as_deref().unwrap_or(""));
    let summary = normalize_text(input.summary.as_deref().unwrap_or(""));
    let source = input.source.unwrap_or_default().trim().to_string();

    let id = match input.id {
        Some(id) if !id.trim().is_empty() => id.trim().to_string(),
        _ => short_hash(&format!("{title}|{source}")),
    };

    Article {
        id,
        title,
        summary,
        source,
        link: input.link,
        date: parse_date(input.date.as_deref()),
        sentiment: input.sentiment.map(|s| s.resolve()).unwrap_or_default(),
        themes: input.themes.map(|t| t.resolve()).unwrap_or_default(),
        credibility: input.credibility,
        source_reliability: input.source_reliability,
        theme_relevance: input.theme_relevance,
    }
}
