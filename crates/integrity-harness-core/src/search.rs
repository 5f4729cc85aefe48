//! Semantic search over the reference corpus.
//!
//! # Algorithm
//!
//! 1. Ping the store and count embedded records. Unreachable or empty →
//!    serve the [`FallbackCorpus`].
//! 2. Embed the query through [`EmbeddingService`] (never fails).
//! 3. Rank embedded records by cosine similarity (`1 - cosine_distance`),
//!    ties in insertion order, and keep the top `limit`.
//! 4. Fill absent metadata with defaults and clamp scores to `[0, 1]`.
//!
//! Any store error during ranking also falls back. The returned
//! [`SearchOutcome`] says which path produced the results.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::fallback::FallbackCorpus;
use crate::models::QueryResult;
use crate::outcome::{Degradation, Outcome};
use crate::service::EmbeddingService;
use crate::store::CorpusStore;

/// Ranked results, tagged with the degradation that produced them, if any.
pub type SearchOutcome = Outcome<Vec<QueryResult>>;

/// The retrieval capability the detector depends on.
#[async_trait]
pub trait SourceRetriever: Send + Sync {
    async fn retrieve(&self, query: &str, limit: usize) -> Result<SearchOutcome>;
}

/// Clamp a similarity into `[0, 1]`; NaN becomes `0.0`.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Map a caller-supplied limit onto `>= 1`.
pub fn normalize_limit(limit: i64) -> usize {
    usize::try_from(limit).unwrap_or(0).max(1)
}

pub struct SimilaritySearch {
    service: Arc<EmbeddingService>,
    store: Arc<dyn CorpusStore>,
    fallback: FallbackCorpus,
}

impl SimilaritySearch {
    pub fn new(
        service: Arc<EmbeddingService>,
        store: Arc<dyn CorpusStore>,
        fallback: FallbackCorpus,
    ) -> Self {
        Self {
            service,
            store,
            fallback,
        }
    }

    pub fn service(&self) -> &Arc<EmbeddingService> {
        &self.service
    }

    pub fn store(&self) -> &Arc<dyn CorpusStore> {
        &self.store
    }

    pub fn fallback(&self) -> &FallbackCorpus {
        &self.fallback
    }

    /// Return at most `limit` results (a limit of 0 is treated as 1).
    pub async fn search(&self, query: &str, limit: usize) -> SearchOutcome {
        let limit = limit.max(1);
        match self.search_corpus(query, limit).await {
            Ok(outcome) => outcome,
            Err(reason) => {
                self.service.stats().record_search_fallback();
                warn!(reason = %reason, "serving fallback sources");
                Outcome::degraded(self.fallback.take(limit), reason)
            }
        }
    }

    async fn search_corpus(
        &self,
        query: &str,
        limit: usize,
    ) -> std::result::Result<SearchOutcome, Degradation> {
        self.store.ping().await.map_err(store_degradation)?;

        let embedded = self
            .store
            .count_embedded()
            .await
            .map_err(store_degradation)?;
        debug!(embedded, "corpus sources with embeddings");
        if embedded == 0 {
            return Err(Degradation::EmptyCorpus);
        }

        let query_vec = self.service.embed(query).await;
        let ranked = self
            .store
            .rank_by_similarity(query_vec.value(), limit)
            .await
            .map_err(store_degradation)?;

        let results: Vec<QueryResult> = ranked
            .into_iter()
            .map(|r| QueryResult::from_summary(r.source, clamp_score(r.similarity)))
            .collect();
        debug!(results = results.len(), "vector search completed");

        Ok(match query_vec.reason() {
            Some(reason) => Outcome::degraded(results, reason.clone()),
            None => Outcome::Success(results),
        })
    }
}

fn store_degradation(err: StoreError) -> Degradation {
    match err {
        StoreError::Unavailable(message) => Degradation::StoreUnavailable { message },
        other => Degradation::SearchFailed {
            message: other.to_string(),
        },
    }
}

#[async_trait]
impl SourceRetriever for SimilaritySearch {
    async fn retrieve(&self, query: &str, limit: usize) -> Result<SearchOutcome> {
        Ok(self.search(query, limit).await)
    }
}
