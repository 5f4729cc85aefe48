//! Corpus seeding from a JSON file.
//!
//! The file holds an array of sources:
//!
//! ```json
//! [
//!   {
//!     "title": "Attention Is All You Need",
//!     "authors": "Vaswani et al.",
//!     "publication_year": 2017,
//!     "abstract": "The dominant sequence transduction models...",
//!     "full_text": "...",
//!     "source_type": "paper"
//!   }
//! ]
//! ```
//!
//! Seeding is skipped when the corpus already has records, unless
//! `--append` is given. Each source is inserted and embedded through
//! [`add_source`]; sources whose embedding degraded stay unembedded until
//! `integrity embed pending` succeeds for them.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::info;

use integrity_harness_core::ingest::add_source;
use integrity_harness_core::models::NewSource;
use integrity_harness_core::service::EmbeddingService;
use integrity_harness_core::store::CorpusStore;

use crate::config::Config;
use crate::engine::Engine;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub total: usize,
    pub inserted: usize,
    pub embedded: usize,
    /// Existing record count when seeding was skipped.
    pub skipped_existing: Option<usize>,
}

pub fn load_sources(path: &Path) -> Result<Vec<NewSource>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read sources file: {}", path.display()))?;
    let sources: Vec<NewSource> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse sources file: {}", path.display()))?;
    Ok(sources)
}

/// Insert and embed `sources` unless the corpus is already populated.
pub async fn seed_sources(
    store: &dyn CorpusStore,
    service: &EmbeddingService,
    sources: &[NewSource],
    append: bool,
) -> Result<SeedSummary> {
    let mut summary = SeedSummary {
        total: sources.len(),
        ..SeedSummary::default()
    };

    let existing = store.count_sources().await?;
    if existing > 0 && !append {
        info!(existing, "corpus already populated, skipping seed");
        summary.skipped_existing = Some(existing);
        return Ok(summary);
    }

    for (idx, source) in sources.iter().enumerate() {
        info!(
            n = idx + 1,
            total = sources.len(),
            title = source.title.as_deref().unwrap_or_default(),
            "ingesting source"
        );
        let added = add_source(store, service, source).await?;
        summary.inserted += 1;
        if added.embedded {
            summary.embedded += 1;
        }
    }

    Ok(summary)
}

pub async fn run_ingest(config: &Config, path: &Path, append: bool) -> Result<()> {
    let sources = load_sources(path)?;
    let engine = Engine::connect(config).await?;

    if engine.store().ping().await.is_err() {
        engine.close().await;
        bail!("Database is not initialized. Run `integrity init` first.");
    }

    let summary = seed_sources(
        engine.store().as_ref(),
        engine.service(),
        &sources,
        append,
    )
    .await?;

    println!("ingest {}", path.display());
    match summary.skipped_existing {
        Some(existing) => {
            println!("  corpus already has {} sources; skipped", existing);
            println!("  (use --append to add anyway)");
        }
        None => {
            println!("  sources read: {}", summary.total);
            println!("  inserted: {}", summary.inserted);
            println!("  embedded: {}", summary.embedded);
            let pending = summary.inserted - summary.embedded;
            if pending > 0 {
                println!(
                    "  pending embeddings: {} (run `integrity embed pending`)",
                    pending
                );
            }
        }
    }

    engine.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::embedding::DisabledProvider;
    use integrity_harness_core::cache::EmbeddingCache;
    use integrity_harness_core::service::RetryPolicy;
    use integrity_harness_core::stats::EngineStats;
    use integrity_harness_core::store::memory::InMemoryCorpus;

    fn service() -> EmbeddingService {
        EmbeddingService::new(
            Arc::new(DisabledProvider::new(4)),
            EmbeddingCache::disabled(),
            RetryPolicy {
                max_attempts: 1,
                base_delay: std::time::Duration::ZERO,
            },
            Arc::new(EngineStats::new()),
        )
    }

    #[test]
    fn test_load_sources_accepts_partial_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.json");
        std::fs::write(
            &path,
            r#"[{"title": "A", "abstract": "About A", "full_text": "Body"},
                {"full_text": "Anonymous", "source_type": "book"}]"#,
        )
        .unwrap();

        let sources = load_sources(&path).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].abstract_text.as_deref(), Some("About A"));
        assert_eq!(sources[1].title, None);
    }

    #[tokio::test]
    async fn test_seed_skips_populated_corpus() {
        let store = InMemoryCorpus::new(4);
        let svc = service();
        let sources = vec![NewSource::default(), NewSource::default()];

        let first = seed_sources(&store, &svc, &sources, false).await.unwrap();
        assert_eq!(first.inserted, 2);
        assert_eq!(first.embedded, 0);

        let second = seed_sources(&store, &svc, &sources, false).await.unwrap();
        assert_eq!(second.skipped_existing, Some(2));
        assert_eq!(store.count_sources().await.unwrap(), 2);

        let appended = seed_sources(&store, &svc, &sources, true).await.unwrap();
        assert_eq!(appended.inserted, 2);
        assert_eq!(store.count_sources().await.unwrap(), 4);
    }
}
