use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Create the cache schema at the configured path. Used by `draws init`.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(&config.cache.path).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Idempotently create the cache tables on an open pool.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cache_entries (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_cache_entries_updated_at ON cache_entries(updated_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
