//! Library-level tests wiring the engine from real collaborators.
//!
//! The SQLite corpus and moka cache are real; the embedding provider is a
//! keyword counter so similarity is predictable without network access.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use integrity_harness::cache::MemoryCache;
use integrity_harness::config::Config;
use integrity_harness::engine::Engine;
use integrity_harness::migrate;
use integrity_harness::sqlite_store::SqliteCorpus;
use integrity_harness_core::cache::EmbeddingCache;
use integrity_harness_core::embedding::EmbeddingProvider;
use integrity_harness_core::error::ProviderError;
use integrity_harness_core::ingest::{add_source, refresh_embeddings};
use integrity_harness_core::models::{NewSource, ReportStatus};
use integrity_harness_core::store::CorpusStore;

const TOPICS: [&str; 4] = ["neural", "protein", "market", "poetry"];

/// Counts topic keywords; every text gets a small bias on each axis.
struct KeywordProvider;

#[async_trait]
impl EmbeddingProvider for KeywordProvider {
    fn model_name(&self) -> &str {
        "keyword-test"
    }

    fn dims(&self) -> usize {
        TOPICS.len()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let lower = text.to_lowercase();
        Ok(TOPICS
            .iter()
            .map(|topic| lower.matches(topic).count() as f32 + 0.01)
            .collect())
    }
}

fn source(title: &str, body: &str) -> NewSource {
    NewSource {
        title: Some(title.to_string()),
        authors: Some("Test Author".to_string()),
        publication_year: Some(2020),
        abstract_text: Some(format!("About {}", title)),
        full_text: body.to_string(),
        ..NewSource::default()
    }
}

async fn engine(tmp: &TempDir) -> (Engine, Arc<SqliteCorpus>) {
    let mut config = Config::default();
    config.db.path = tmp.path().join("integrity.sqlite");
    config.embedding.provider = "test".to_string();
    config.embedding.dims = TOPICS.len();
    config.embedding.backoff_base_ms = 0;

    let pool = integrity_harness::db::connect(&config).await.unwrap();
    migrate::apply(&pool).await.unwrap();
    let store = Arc::new(SqliteCorpus::new(pool, TOPICS.len()));
    let cache = EmbeddingCache::new(
        Arc::new(MemoryCache::new(100)),
        "embedding",
        Duration::from_secs(60),
    );

    let engine = Engine::from_parts(&config, store.clone(), Arc::new(KeywordProvider), cache)
        .unwrap();
    (engine, store)
}

async fn seed(engine: &Engine) {
    let sources = [
        source("Neural Nets", "neural networks learn neural features from data"),
        source("Protein Folding", "protein structure prediction and protein design"),
        source("Market Dynamics", "market prices move as the market absorbs news"),
    ];
    for s in &sources {
        let added = add_source(engine.store().as_ref(), engine.service(), s)
            .await
            .unwrap();
        assert!(added.embedded);
    }
}

#[tokio::test]
async fn test_search_ranks_corpus_sources() {
    let tmp = TempDir::new().unwrap();
    let (engine, _store) = engine(&tmp).await;
    seed(&engine).await;

    let outcome = engine.search().search("protein protein protein", 3).await;
    assert!(!outcome.is_degraded());
    let results = outcome.value();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].title, "Protein Folding");
    assert!(results[0].similarity_score > 0.95);
    assert!(results.iter().all(|r| (0.0..=1.0).contains(&r.similarity_score)));

    engine.close().await;
}

#[tokio::test]
async fn test_repeated_embedding_hits_cache() {
    let tmp = TempDir::new().unwrap();
    let (engine, _store) = engine(&tmp).await;

    let first = engine.service().embed("neural market").await;
    let second = engine.service().embed("neural   market").await;
    assert_eq!(first.value(), second.value());

    let stats = engine.stats().snapshot();
    assert_eq!(stats.provider_calls, 1);
    assert_eq!(stats.cache_hits, 1);

    engine.close().await;
}

#[tokio::test]
async fn test_detector_flags_copied_section() {
    let tmp = TempDir::new().unwrap();
    let (engine, _store) = engine(&tmp).await;
    seed(&engine).await;

    let essay = "In this essay we discuss how neural networks learn neural features \
                 from data, and why neural approaches to representation have become \
                 so common in practice across many fields.";
    let report = engine.detector().detect(essay).await;

    assert_eq!(report.status, ReportStatus::Completed);
    assert!(!report.degraded);
    assert_eq!(report.total_chunks_analyzed, 1);
    assert_eq!(report.chunks_flagged, 1);
    assert_eq!(report.distinct_chunks_flagged, 1);
    assert_eq!(report.flagged_sections.len(), 1);
    assert_eq!(report.flagged_sections[0].matched_source, "Neural Nets");
    assert!(report.plagiarism_score > 0.85 && report.plagiarism_score <= 1.0);

    engine.close().await;
}

#[tokio::test]
async fn test_refresh_reembeds_changed_model() {
    let tmp = TempDir::new().unwrap();
    let (engine, store) = engine(&tmp).await;
    seed(&engine).await;

    let summary = refresh_embeddings(store.as_ref(), engine.service(), true)
        .await
        .unwrap();
    assert_eq!(summary.checked, 3);
    assert_eq!(summary.pending, 0);

    store.insert_source(&source("Fresh", "poetry poetry")).await.unwrap();
    let summary = refresh_embeddings(store.as_ref(), engine.service(), false)
        .await
        .unwrap();
    assert_eq!(summary.pending, 1);
    assert_eq!(summary.embedded, 1);
    assert_eq!(store.count_embedded().await.unwrap(), 4);

    engine.close().await;
}
