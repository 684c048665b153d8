//! Analysis store: append-only persistence for enriched analyses.
//!
//! Two backends behind one trait, selected once at construction:
//! - `SqliteStore`: durable SQLite database (sqlx, WAL).
//! - `JsonFileStore`: local JSON batch files, dev/fallback.
//!
//! Contract: `append` fails loudly on unrecoverable I/O; `load_recent`
//! never fails (degrades to empty, logged); `summarize` may fail and
//! callers fall back to computing over the loaded window.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::article::{EnrichedAnalysis, StoreSummary};
use crate::config::AnalysisConfig;

#[async_trait::async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Persist a batch. Empty batches are a no-op. Batches are isolated:
    /// a failed append must not corrupt previously stored batches.
    async fn append(&self, batch: &[EnrichedAnalysis]) -> Result<()>;

    /// Analyses whose date falls within the last `days` days, newest
    /// first. Degrades to empty on any error.
    async fn load_recent(&self, days: i64) -> Vec<EnrichedAnalysis>;

    /// Store-wide aggregate.
    async fn summarize(&self) -> Result<StoreSummary>;
}

/// Build the store the configuration selects: SQLite when a database is
/// configured, local JSON batches otherwise.
pub async fn build_store(config: &AnalysisConfig) -> Result<Arc<dyn AnalysisStore>> {
    match &config.store.database_url {
        Some(db) => {
            let store = SqliteStore::connect(db)
                .await
                .context("open sqlite analysis store")?;
            info!(database = %db, "using sqlite analysis store");
            Ok(Arc::new(store))
        }
        None => {
            info!(dir = %config.store.data_dir, "using local json analysis store");
            Ok(Arc::new(JsonFileStore::new(&config.store.data_dir)))
        }
    }
}

/* ----------------------------
SQLite backend
---------------------------- */

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Accepts a full `sqlite:` URL or a bare filesystem path.
    pub async fn connect(database: &str) -> Result<Self> {
        let url = if database.starts_with("sqlite:") {
            database.to_string()
        } else {
            if let Some(parent) = Path::new(database).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("create {}", parent.display()))?;
                }
            }
            format!("sqlite://{database}?mode=rwc")
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .with_context(|| format!("connect {url}"))?;

        // WAL keeps readers unblocked while the analyzer appends.
        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

        Self::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// Idempotent schema init.
    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS analyses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                article_id TEXT NOT NULL,
                title TEXT,
                source TEXT,
                date TEXT NOT NULL,
                summary TEXT,
                confidence REAL NOT NULL DEFAULT 0,
                corroboration_count INTEGER NOT NULL DEFAULT 0,
                corroboration_strength REAL NOT NULL DEFAULT 0,
                bayesian_posterior REAL NOT NULL DEFAULT 0,
                raw TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_analyses_date ON analyses(date)")
            .execute(pool)
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl AnalysisStore for SqliteStore {
    async fn append(&self, batch: &[EnrichedAnalysis]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.context("begin append")?;
        for analysis in batch {
            let raw = serde_json::to_string(analysis).context("serialize analysis")?;
            sqlx::query(
                r#"
                INSERT INTO analyses
                    (article_id, title, source, date, summary, confidence,
                     corroboration_count, corroboration_strength, bayesian_posterior, raw)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(&analysis.article.id)
            .bind(&analysis.article.title)
            .bind(&analysis.article.source)
            .bind(analysis.article.date.to_rfc3339())
            .bind(&analysis.article.summary)
            .bind(analysis.confidence)
            .bind(analysis.corroboration_count as i64)
            .bind(analysis.corroboration_strength)
            .bind(analysis.bayesian_posterior)
            .bind(raw)
            .execute(&mut *tx)
            .await
            .context("insert analysis")?;
        }
        tx.commit().await.context("commit append")?;
        Ok(())
    }

    async fn load_recent(&self, days: i64) -> Vec<EnrichedAnalysis> {
        let cutoff = (Utc::now() - Duration::days(days.max(0))).to_rfc3339();
        let rows = match sqlx::query(
            "SELECT raw FROM analyses WHERE date >= ?1 ORDER BY date DESC LIMIT 1000",
        )
        .bind(&cutoff)
        .fetch_all(&self.pool)
        .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = ?e, "load_recent failed; returning empty window");
                return Vec::new();
            }
        };

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let raw: String = match row.try_get("raw") {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(error = ?e, "analysis row without raw payload; skipped");
                    continue;
                }
            };
            match serde_json::from_str::<EnrichedAnalysis>(&raw) {
                Ok(a) => out.push(a),
                Err(e) => warn!(error = ?e, "malformed stored analysis; skipped"),
            }
        }
        out
    }

    async fn summarize(&self) -> Result<StoreSummary> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_articles,
                AVG(confidence) AS avg_confidence,
                AVG(bayesian_posterior) AS avg_posterior,
                AVG(corroboration_strength) AS avg_corroboration
            FROM analyses
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("summarize analyses")?;

        let total: i64 = row.try_get("total_articles")?;
        Ok(StoreSummary {
            total_articles: total.max(0) as u64,
            avg_confidence: row.try_get::<Option<f64>, _>("avg_confidence")?.unwrap_or(0.0),
            avg_posterior: row.try_get::<Option<f64>, _>("avg_posterior")?.unwrap_or(0.0),
            avg_corroboration: row
                .try_get::<Option<f64>, _>("avg_corroboration")?
                .unwrap_or(0.0),
        })
    }
}

/* ----------------------------
Local JSON batch backend
---------------------------- */

/// One file per appended batch under a data directory. Reads look at the
/// newest files only, matching the dev fallback of the original deployment.
pub struct JsonFileStore {
    dir: PathBuf,
}

/// How many newest batch files `load_recent` will read.
const MAX_BATCH_FILES: usize = 10;

static BATCH_SEQ: AtomicU64 = AtomicU64::new(0);

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    fn batch_path(&self) -> PathBuf {
        let seq = BATCH_SEQ.fetch_add(1, Ordering::Relaxed);
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        self.dir.join(format!("batch_{stamp}_{seq:04}.json"))
    }
}

#[async_trait::async_trait]
impl AnalysisStore for JsonFileStore {
    async fn append(&self, batch: &[EnrichedAnalysis]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create {}", self.dir.display()))?;
        let path = self.batch_path();
        let json = serde_json::to_string_pretty(batch).context("serialize batch")?;
        std::fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    async fn load_recent(&self, days: i64) -> Vec<EnrichedAnalysis> {
        let cutoff = Utc::now() - Duration::days(days.max(0));

        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
            .collect();
        files.sort();
        files.reverse();

        let mut out = Vec::new();
        for path in files.into_iter().take(MAX_BATCH_FILES) {
            let content = match std::fs::read_to_string(&path) {
                Ok(c) => c,
                Err(e) => {
                    warn!(error = ?e, path = %path.display(), "unreadable batch file; skipped");
                    continue;
                }
            };
            match serde_json::from_str::<Vec<EnrichedAnalysis>>(&content) {
                Ok(batch) => out.extend(batch.into_iter().filter(|a| a.article.date >= cutoff)),
                Err(e) => warn!(error = ?e, path = %path.display(), "malformed batch file; skipped"),
            }
        }

        out.sort_by(|a, b| b.article.date.cmp(&a.article.date));
        out
    }

    async fn summarize(&self) -> Result<StoreSummary> {
        let window = self.load_recent(30).await;
        Ok(StoreSummary::from_articles(&window))
    }
}

/* ----------------------------
In-memory test double
---------------------------- */

/// Keeps everything in a mutex-guarded vec; used by tests and available
/// for embedding.
#[derive(Default)]
pub struct MemoryStore {
    items: std::sync::Mutex<Vec<EnrichedAnalysis>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl AnalysisStore for MemoryStore {
    async fn append(&self, batch: &[EnrichedAnalysis]) -> Result<()> {
        self.items
            .lock()
            .expect("memory store mutex poisoned")
            .extend_from_slice(batch);
        Ok(())
    }

    async fn load_recent(&self, days: i64) -> Vec<EnrichedAnalysis> {
        let cutoff = Utc::now() - Duration::days(days.max(0));
        let mut out: Vec<EnrichedAnalysis> = self
            .items
            .lock()
            .expect("memory store mutex poisoned")
            .iter()
            .filter(|a| a.article.date >= cutoff)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.article.date.cmp(&a.article.date));
        out
    }

    async fn summarize(&self) -> Result<StoreSummary> {
        let items = self.items.lock().expect("memory store mutex poisoned");
        Ok(StoreSummary::from_articles(&items))
    }
}
