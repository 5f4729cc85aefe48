//! Engine wiring.
//!
//! [`Engine`] owns every collaborator built from a [`Config`]: the corpus
//! store, embedding provider, cache, search, and detector. Commands receive
//! it explicitly; there is no process-wide state. Call [`Engine::close`]
//! on shutdown to release the database pool.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

use integrity_harness_core::cache::EmbeddingCache;
use integrity_harness_core::detect::PlagiarismDetector;
use integrity_harness_core::embedding::EmbeddingProvider;
use integrity_harness_core::fallback::FallbackCorpus;
use integrity_harness_core::search::SimilaritySearch;
use integrity_harness_core::service::EmbeddingService;
use integrity_harness_core::stats::EngineStats;
use integrity_harness_core::store::CorpusStore;

use crate::cache::create_cache;
use crate::config::Config;
use crate::db;
use crate::embedding::create_provider;
use crate::sqlite_store::SqliteCorpus;

pub struct Engine {
    config: Config,
    pool: Option<SqlitePool>,
    store: Arc<dyn CorpusStore>,
    service: Arc<EmbeddingService>,
    search: Arc<SimilaritySearch>,
    detector: PlagiarismDetector,
    stats: Arc<EngineStats>,
}

impl Engine {
    /// Open the SQLite corpus and build providers from `config`.
    pub async fn connect(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        let store = Arc::new(SqliteCorpus::new(pool.clone(), config.embedding.dims));
        let provider = create_provider(&config.embedding)?;
        let cache = create_cache(&config.cache)?;

        let mut engine = Self::from_parts(config, store, provider, cache)?;
        engine.pool = Some(pool);
        info!(
            provider = engine.service.model_name(),
            db = %config.db.path.display(),
            "engine ready"
        );
        Ok(engine)
    }

    /// Assemble an engine from already-built collaborators.
    pub fn from_parts(
        config: &Config,
        store: Arc<dyn CorpusStore>,
        provider: Arc<dyn EmbeddingProvider>,
        cache: EmbeddingCache,
    ) -> Result<Self> {
        let stats = Arc::new(EngineStats::new());
        let service = Arc::new(EmbeddingService::new(
            provider,
            cache,
            config.embedding.retry_policy(),
            stats.clone(),
        ));
        let fallback = load_fallback(config)?;
        let search = Arc::new(SimilaritySearch::new(
            service.clone(),
            store.clone(),
            fallback,
        ));
        let detector =
            PlagiarismDetector::new(search.clone(), config.detection.params(), stats.clone());

        Ok(Self {
            config: config.clone(),
            pool: None,
            store,
            service,
            search,
            detector,
            stats,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn CorpusStore> {
        &self.store
    }

    pub fn service(&self) -> &Arc<EmbeddingService> {
        &self.service
    }

    pub fn search(&self) -> &SimilaritySearch {
        &self.search
    }

    pub fn detector(&self) -> &PlagiarismDetector {
        &self.detector
    }

    pub fn stats(&self) -> &Arc<EngineStats> {
        &self.stats
    }

    pub async fn close(self) {
        if let Some(pool) = self.pool {
            pool.close().await;
        }
    }
}

fn load_fallback(config: &Config) -> Result<FallbackCorpus> {
    let Some(path) = &config.retrieval.fallback_path else {
        return Ok(FallbackCorpus::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fallback sources: {}", path.display()))?;
    FallbackCorpus::from_json(&content)
        .with_context(|| format!("Failed to parse fallback sources: {}", path.display()))
}
