//! In-memory [`CorpusStore`] implementation for tests and embedding into
//! other hosts.
//!
//! Records live in a `Vec` in insertion order behind a tokio `RwLock`.
//! Ranking is brute-force cosine similarity via [`rank_candidates`].

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::models::{NewSource, RankedSource, SourceRecord, SourceSummary};

use super::{check_dims, rank_candidates, CorpusStore, EmbeddingMeta, SourceEmbeddingStatus};

struct StoredSource {
    record: SourceRecord,
    meta: Option<EmbeddingMeta>,
}

pub struct InMemoryCorpus {
    dims: usize,
    sources: RwLock<Vec<StoredSource>>,
    next_id: RwLock<u64>,
    offline: AtomicBool,
}

impl InMemoryCorpus {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            sources: RwLock::new(Vec::new()),
            next_id: RwLock::new(1),
            offline: AtomicBool::new(false),
        }
    }

    /// Simulate an outage: every call fails with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Insert a record with an embedding in one step.
    pub async fn insert_embedded(
        &self,
        source: &NewSource,
        vector: Vec<f32>,
    ) -> Result<String, StoreError> {
        let id = self.insert_source(source).await?;
        let meta = EmbeddingMeta {
            model: "direct".to_string(),
            content_hash: String::new(),
        };
        self.set_embedding(&id, &vector, &meta).await?;
        Ok(id)
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory corpus offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CorpusStore for InMemoryCorpus {
    fn dims(&self) -> usize {
        self.dims
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_online()
    }

    async fn count_sources(&self) -> Result<usize, StoreError> {
        self.check_online()?;
        Ok(self.sources.read().await.len())
    }

    async fn count_embedded(&self) -> Result<usize, StoreError> {
        self.check_online()?;
        Ok(self
            .sources
            .read()
            .await
            .iter()
            .filter(|s| s.record.embedding.is_some())
            .count())
    }

    async fn rank_by_similarity(
        &self,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<RankedSource>, StoreError> {
        self.check_online()?;
        let sources = self.sources.read().await;
        let candidates = sources.iter().filter_map(|s| {
            s.record
                .embedding
                .as_ref()
                .map(|v| (SourceSummary::from(&s.record), v.clone()))
        });
        rank_candidates(query, candidates, limit)
    }

    async fn insert_source(&self, source: &NewSource) -> Result<String, StoreError> {
        self.check_online()?;
        let mut next_id = self.next_id.write().await;
        let id = format!("mem-{}", *next_id);
        *next_id += 1;

        self.sources.write().await.push(StoredSource {
            record: SourceRecord {
                id: id.clone(),
                title: source.title.clone(),
                authors: source.authors.clone(),
                publication_year: source.publication_year,
                abstract_text: source.abstract_text.clone(),
                full_text: source.full_text.clone(),
                source_type: source.source_type.clone(),
                embedding: None,
            },
            meta: None,
        });
        Ok(id)
    }

    async fn set_embedding(
        &self,
        source_id: &str,
        vector: &[f32],
        meta: &EmbeddingMeta,
    ) -> Result<(), StoreError> {
        self.check_online()?;
        check_dims(self.dims, vector)?;
        let mut sources = self.sources.write().await;
        let stored = sources
            .iter_mut()
            .find(|s| s.record.id == source_id)
            .ok_or_else(|| StoreError::Query(format!("no source with id {source_id}")))?;
        stored.record.embedding = Some(vector.to_vec());
        stored.meta = Some(meta.clone());
        Ok(())
    }

    async fn get_source(&self, id: &str) -> Result<Option<SourceRecord>, StoreError> {
        self.check_online()?;
        Ok(self
            .sources
            .read()
            .await
            .iter()
            .find(|s| s.record.id == id)
            .map(|s| s.record.clone()))
    }

    async fn embedding_status(&self) -> Result<Vec<SourceEmbeddingStatus>, StoreError> {
        self.check_online()?;
        Ok(self
            .sources
            .read()
            .await
            .iter()
            .map(|s| SourceEmbeddingStatus {
                source: s.record.clone(),
                embedding: s.meta.clone(),
            })
            .collect())
    }
}
