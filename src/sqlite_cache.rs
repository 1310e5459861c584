//! SQLite-backed [`CacheBackend`].
//!
//! One row per key in `cache_entries`. Multi-key writes (a dataset plus its
//! timestamp) go through a single transaction so a reader never sees a new
//! dataset paired with an old timestamp.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;

use draw_harness_core::store::memory::{DisabledBackend, MemoryBackend};
use draw_harness_core::store::CacheBackend;

use crate::config::Config;
use crate::{db, migrate};

pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Open the database at `path` and make sure the schema exists.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = db::connect(path).await?;
        migrate::apply(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl CacheBackend for SqliteBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM cache_entries WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO cache_entries (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn put_many(&self, entries: &[(String, String)]) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;
        for (key, value) in entries {
            sqlx::query(
                "INSERT INTO cache_entries (key, value, updated_at) VALUES (?, ?, ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            )
            .bind(key)
            .bind(value)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM cache_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Build the backend selected by `[cache] backend`.
///
/// An unopenable SQLite database degrades to [`DisabledBackend`]: the
/// pipeline keeps working, it just cannot persist anything.
pub async fn open_backend(config: &Config) -> Arc<dyn CacheBackend> {
    match config.cache.backend.as_str() {
        "memory" => Arc::new(MemoryBackend::new()),
        "disabled" => Arc::new(DisabledBackend),
        _ => match SqliteBackend::open(&config.cache.path).await {
            Ok(backend) => Arc::new(backend),
            Err(e) => {
                tracing::warn!(
                    path = %config.cache.path.display(),
                    error = %e,
                    "cache database unavailable, continuing without persistence"
                );
                Arc::new(DisabledBackend)
            }
        },
    }
}
