//! Corpus storage abstraction.
//!
//! The [`CorpusStore`] trait covers everything the engine needs from the
//! persisted reference corpus: liveness, embedded-record counts, ranked
//! nearest-neighbor retrieval, and the ingestion writes used to build it.
//! The engine only reads during search; mutual exclusion belongs to the
//! backend.
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`ping`](CorpusStore::ping) | Does the store exist and respond |
//! | [`count_sources`](CorpusStore::count_sources) | Number of records |
//! | [`count_embedded`](CorpusStore::count_embedded) | Records with an embedding |
//! | [`rank_by_similarity`](CorpusStore::rank_by_similarity) | Top-k by cosine similarity |
//! | [`insert_source`](CorpusStore::insert_source) | Add a record |
//! | [`set_embedding`](CorpusStore::set_embedding) | Store or replace a record's vector |
//! | [`get_source`](CorpusStore::get_source) | Fetch one record |
//! | [`embedding_status`](CorpusStore::embedding_status) | All records with embedding metadata |

pub mod memory;

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::error::StoreError;
use crate::models::{NewSource, RankedSource, SourceRecord, SourceSummary};

/// Metadata recorded alongside a stored embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMeta {
    pub model: String,
    pub content_hash: String,
}

/// A record together with the metadata of its current embedding, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEmbeddingStatus {
    pub source: SourceRecord,
    pub embedding: Option<EmbeddingMeta>,
}

#[async_trait]
pub trait CorpusStore: Send + Sync {
    /// Dimensionality every stored vector must have.
    fn dims(&self) -> usize;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn count_sources(&self) -> Result<usize, StoreError>;

    async fn count_embedded(&self) -> Result<usize, StoreError>;

    /// Rank embedded records by similarity to `query`, best first, ties in
    /// insertion order, at most `limit` entries.
    async fn rank_by_similarity(
        &self,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<RankedSource>, StoreError>;

    /// Insert a record; returns its new id.
    async fn insert_source(&self, source: &NewSource) -> Result<String, StoreError>;

    async fn set_embedding(
        &self,
        source_id: &str,
        vector: &[f32],
        meta: &EmbeddingMeta,
    ) -> Result<(), StoreError>;

    async fn get_source(&self, id: &str) -> Result<Option<SourceRecord>, StoreError>;

    async fn embedding_status(&self) -> Result<Vec<SourceEmbeddingStatus>, StoreError>;
}

/// Reject vectors that do not have the corpus dimensionality.
pub fn check_dims(expected: usize, vector: &[f32]) -> Result<(), StoreError> {
    if vector.len() != expected {
        return Err(StoreError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}

/// Brute-force cosine ranking shared by the store backends.
///
/// `candidates` must be in insertion order; the sort is stable, so equal
/// similarities keep that order on every call. Any vector whose length
/// differs from the query's is a hard error.
pub fn rank_candidates<I>(
    query: &[f32],
    candidates: I,
    limit: usize,
) -> Result<Vec<RankedSource>, StoreError>
where
    I: IntoIterator<Item = (SourceSummary, Vec<f32>)>,
{
    let mut ranked = Vec::new();
    for (source, vector) in candidates {
        check_dims(query.len(), &vector)?;
        let similarity = cosine_similarity(query, &vector) as f64;
        ranked.push(RankedSource { source, similarity });
    }

    ranked.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(limit);
    Ok(ranked)
}
