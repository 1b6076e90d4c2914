//! Upstream response cache
//!
//! Parsed source payloads are stored as JSON under the source's cache key.
//! Reads miss on expiry and on any storage or decode problem; writes are
//! best-effort. A broken cache therefore only costs network round trips.

use crate::sources::{FetchError, ForecastSource, SourceData, SourceKind};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Key/value store for upstream payloads
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Cached value if it was stored no longer than `max_age` ago
    async fn get(&self, key: &str, max_age: Duration) -> Option<Value>;

    /// Store `value` under `key`, replacing any previous entry
    async fn put(&self, key: &str, value: Value);
}

fn is_fresh(stored_at: DateTime<Utc>, max_age: Duration) -> bool {
    // Entries stamped in the future (clock step) count as fresh
    (Utc::now() - stored_at)
        .to_std()
        .map(|age| age <= max_age)
        .unwrap_or(true)
}

// ============================================================================
// In-memory cache
// ============================================================================

/// Process-local cache
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (DateTime<Utc>, Value)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with an explicit timestamp
    pub async fn put_at(&self, key: &str, value: Value, stored_at: DateTime<Utc>) {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), (stored_at, value));
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(&self, key: &str, max_age: Duration) -> Option<Value> {
        let entries = self.entries.lock().await;
        let (stored_at, value) = entries.get(key)?;
        is_fresh(*stored_at, max_age).then(|| value.clone())
    }

    async fn put(&self, key: &str, value: Value) {
        self.put_at(key, value, Utc::now()).await;
    }
}

// ============================================================================
// SQLite cache
// ============================================================================

/// Cache persisted in the service's SQLite database
pub struct SqliteCache {
    pool: SqlitePool,
}

impl SqliteCache {
    /// Open (creating if needed) the cache database at `db_path`
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        debug!("Connecting to cache database: {}", db_url);

        let pool = SqlitePool::connect(&db_url).await?;
        Self::with_pool(pool).await
    }

    /// Use an existing pool, creating the cache table if missing
    pub async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS api_cache (
                key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                stored_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Handle to the underlying database, shared with other stores
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    /// Store with an explicit timestamp
    pub async fn put_at(&self, key: &str, value: &Value, stored_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO api_cache (key, payload, stored_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                payload = excluded.payload,
                stored_at = excluded.stored_at
            "#,
        )
        .bind(key)
        .bind(serde_json::to_string(value)?)
        .bind(stored_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<(DateTime<Utc>, Value)>> {
        let row = sqlx::query("SELECT payload, stored_at FROM api_cache WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let payload: String = row.try_get("payload")?;
        let stored_at: DateTime<Utc> = row.try_get("stored_at")?;
        Ok(Some((stored_at, serde_json::from_str(&payload)?)))
    }
}

#[async_trait]
impl ResponseCache for SqliteCache {
    async fn get(&self, key: &str, max_age: Duration) -> Option<Value> {
        match self.load(key).await {
            Ok(Some((stored_at, value))) => is_fresh(stored_at, max_age).then_some(value),
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "Cache read failed");
                None
            }
        }
    }

    async fn put(&self, key: &str, value: Value) {
        if let Err(e) = self.put_at(key, &value, Utc::now()).await {
            warn!(key, error = %e, "Cache write failed");
        }
    }
}

// ============================================================================
// Cache-first source decorator
// ============================================================================

/// Serves a fresh cached payload, otherwise fetches and stores the result
pub struct CachedSource {
    inner: Arc<dyn ForecastSource>,
    cache: Arc<dyn ResponseCache>,
    max_age: Duration,
}

impl CachedSource {
    /// Wrap `inner` using its kind's default freshness window
    pub fn new(inner: Arc<dyn ForecastSource>, cache: Arc<dyn ResponseCache>) -> Self {
        let max_age = inner.kind().default_max_age();
        Self::with_max_age(inner, cache, max_age)
    }

    pub fn with_max_age(
        inner: Arc<dyn ForecastSource>,
        cache: Arc<dyn ResponseCache>,
        max_age: Duration,
    ) -> Self {
        Self {
            inner,
            cache,
            max_age,
        }
    }

    async fn cached(&self, kind: SourceKind, key: &str) -> Option<SourceData> {
        let value = self.cache.get(key, self.max_age).await?;
        match serde_json::from_value::<SourceData>(value) {
            Ok(data) if data.kind() == kind => Some(data),
            Ok(data) => {
                warn!(source = %kind, cached = %data.kind(), "Cached payload has wrong kind");
                None
            }
            Err(e) => {
                warn!(source = %kind, error = %e, "Cached payload could not be decoded");
                None
            }
        }
    }
}

#[async_trait]
impl ForecastSource for CachedSource {
    fn kind(&self) -> SourceKind {
        self.inner.kind()
    }

    fn cache_key(&self) -> String {
        self.inner.cache_key()
    }

    async fn fetch(&self) -> Result<SourceData, FetchError> {
        let kind = self.kind();
        let key = self.inner.cache_key();

        if let Some(data) = self.cached(kind, &key).await {
            debug!(source = %kind, "Serving from cache");
            return Ok(data);
        }

        let data = self.inner.fetch().await?;
        match serde_json::to_value(&data) {
            Ok(value) => self.cache.put(&key, value).await,
            Err(e) => warn!(source = %kind, error = %e, "Payload could not be cached"),
        }
        Ok(data)
    }
}

/// Wrap every source in a [`CachedSource`] sharing one cache
pub fn with_cache(
    sources: Vec<Arc<dyn ForecastSource>>,
    cache: Arc<dyn ResponseCache>,
) -> Vec<Arc<dyn ForecastSource>> {
    sources
        .into_iter()
        .map(|source| {
            Arc::new(CachedSource::new(source, Arc::clone(&cache))) as Arc<dyn ForecastSource>
        })
        .collect()
}
