//! Schema creation for the corpus database.
//!
//! Idempotent: every statement is `IF NOT EXISTS`, so `integrity init` can
//! run against an existing database.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create the corpus tables on an open pool.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // `seq` fixes insertion order for ranking ties
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS academic_sources (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            title TEXT,
            authors TEXT,
            publication_year INTEGER,
            abstract TEXT,
            full_text TEXT NOT NULL DEFAULT '',
            source_type TEXT NOT NULL DEFAULT 'paper',
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS source_embeddings (
            source_id TEXT PRIMARY KEY,
            model TEXT NOT NULL,
            dims INTEGER NOT NULL,
            content_hash TEXT NOT NULL,
            embedding BLOB NOT NULL,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (source_id) REFERENCES academic_sources(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_sources_type ON academic_sources(source_type)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Whether the corpus tables exist.
pub async fn is_initialized(pool: &SqlitePool) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) = 2 FROM sqlite_master WHERE type='table' \
         AND name IN ('academic_sources', 'source_embeddings')",
    )
    .fetch_one(pool)
    .await?;
    Ok(exists)
}
