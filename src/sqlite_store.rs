//! SQLite-backed [`CorpusStore`] implementation.
//!
//! Sources live in `academic_sources`; their vectors live in
//! `source_embeddings` as little-endian f32 BLOBs together with the model
//! name and a hash of the embedded text. Ranking loads every embedded row
//! in `seq` order and scores it with [`rank_candidates`], so similarity
//! ties keep insertion order.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use integrity_harness_core::embedding::{blob_to_vec, vec_to_blob};
use integrity_harness_core::error::StoreError;
use integrity_harness_core::models::{
    NewSource, RankedSource, SourceRecord, SourceSummary, SourceType,
};
use integrity_harness_core::store::{
    check_dims, rank_candidates, CorpusStore, EmbeddingMeta, SourceEmbeddingStatus,
};

const SOURCE_COLUMNS: &str = "s.id, s.title, s.authors, s.publication_year, s.abstract, \
                              s.full_text, s.source_type";

pub struct SqliteCorpus {
    pool: SqlitePool,
    dims: usize,
}

impl SqliteCorpus {
    pub fn new(pool: SqlitePool, dims: usize) -> Self {
        Self { pool, dims }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Missing tables and connection failures mean the store is unavailable;
/// anything else is a query failure.
fn store_err(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(err.to_string())
        }
        sqlx::Error::Database(db) if db.message().contains("no such table") => {
            StoreError::Unavailable(db.message().to_string())
        }
        _ => StoreError::query(err),
    }
}

fn row_to_record(row: &SqliteRow) -> Result<SourceRecord, sqlx::Error> {
    let source_type: String = row.try_get("source_type")?;
    let blob: Option<Vec<u8>> = row.try_get("embedding")?;
    Ok(SourceRecord {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        authors: row.try_get("authors")?,
        publication_year: row.try_get("publication_year")?,
        abstract_text: row.try_get("abstract")?,
        full_text: row.try_get("full_text")?,
        source_type: SourceType::from(source_type),
        embedding: blob.map(|b| blob_to_vec(&b)),
    })
}

fn row_to_meta(row: &SqliteRow) -> Result<Option<EmbeddingMeta>, sqlx::Error> {
    let model: Option<String> = row.try_get("model")?;
    let content_hash: Option<String> = row.try_get("content_hash")?;
    Ok(model.map(|model| EmbeddingMeta {
        model,
        content_hash: content_hash.unwrap_or_default(),
    }))
}

#[async_trait]
impl CorpusStore for SqliteCorpus {
    fn dims(&self) -> usize {
        self.dims
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let initialized = crate::migrate::is_initialized(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        if !initialized {
            return Err(StoreError::Unavailable(
                "corpus tables missing; run `integrity init`".to_string(),
            ));
        }
        Ok(())
    }

    async fn count_sources(&self) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM academic_sources")
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(count as usize)
    }

    async fn count_embedded(&self) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM source_embeddings e \
             JOIN academic_sources s ON s.id = e.source_id",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(count as usize)
    }

    async fn rank_by_similarity(
        &self,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<RankedSource>, StoreError> {
        check_dims(self.dims, query)?;

        let rows = sqlx::query(&format!(
            "SELECT {SOURCE_COLUMNS}, e.embedding FROM academic_sources s \
             JOIN source_embeddings e ON e.source_id = s.id \
             ORDER BY s.seq ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row.try_get("embedding").map_err(store_err)?;
            let record = row_to_record(row).map_err(store_err)?;
            candidates.push((SourceSummary::from(&record), blob_to_vec(&blob)));
        }

        rank_candidates(query, candidates, limit)
    }

    async fn insert_source(&self, source: &NewSource) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO academic_sources (id, title, authors, publication_year, abstract,
                                          full_text, source_type, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&source.title)
        .bind(&source.authors)
        .bind(source.publication_year)
        .bind(&source.abstract_text)
        .bind(&source.full_text)
        .bind(source.source_type.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(id)
    }

    async fn set_embedding(
        &self,
        source_id: &str,
        vector: &[f32],
        meta: &EmbeddingMeta,
    ) -> Result<(), StoreError> {
        check_dims(self.dims, vector)?;

        let exists: bool =
            sqlx::query_scalar("SELECT COUNT(*) > 0 FROM academic_sources WHERE id = ?")
                .bind(source_id)
                .fetch_one(&self.pool)
                .await
                .map_err(store_err)?;
        if !exists {
            return Err(StoreError::Query(format!("no source with id {source_id}")));
        }

        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO source_embeddings (source_id, model, dims, content_hash, embedding, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(source_id) DO UPDATE SET
                model = excluded.model,
                dims = excluded.dims,
                content_hash = excluded.content_hash,
                embedding = excluded.embedding,
                created_at = excluded.created_at
            "#,
        )
        .bind(source_id)
        .bind(&meta.model)
        .bind(vector.len() as i64)
        .bind(&meta.content_hash)
        .bind(vec_to_blob(vector))
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    async fn get_source(&self, id: &str) -> Result<Option<SourceRecord>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {SOURCE_COLUMNS}, e.embedding FROM academic_sources s \
             LEFT JOIN source_embeddings e ON e.source_id = s.id \
             WHERE s.id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row.as_ref()
            .map(row_to_record)
            .transpose()
            .map_err(store_err)
    }

    async fn embedding_status(&self) -> Result<Vec<SourceEmbeddingStatus>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {SOURCE_COLUMNS}, e.embedding, e.model, e.content_hash \
             FROM academic_sources s \
             LEFT JOIN source_embeddings e ON e.source_id = s.id \
             ORDER BY s.seq ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.iter()
            .map(|row| {
                Ok(SourceEmbeddingStatus {
                    source: row_to_record(row)?,
                    embedding: row_to_meta(row)?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(store_err)
    }
}
