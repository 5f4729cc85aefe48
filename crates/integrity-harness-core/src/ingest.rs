//! Corpus ingestion and re-embedding.
//!
//! A source is embedded from its title, abstract, and the head of its full
//! text. Only vectors from a successful provider call are stored: a degraded
//! embedding would rank arbitrarily, so the record is kept unembedded and
//! picked up again by [`refresh_embeddings`].

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::embedding::fingerprint;
use crate::error::Result;
use crate::models::{NewSource, SourceRecord};
use crate::outcome::Degradation;
use crate::service::EmbeddingService;
use crate::store::{CorpusStore, EmbeddingMeta, SourceEmbeddingStatus};

/// Characters of full text included in the embedding input.
pub const FULL_TEXT_PREFIX_CHARS: usize = 1000;

/// Text fed to the embedding model for a source.
pub fn embedding_text(title: Option<&str>, abstract_text: Option<&str>, full_text: &str) -> String {
    let head: String = full_text.chars().take(FULL_TEXT_PREFIX_CHARS).collect();
    format!(
        "{}. {}. {}",
        title.unwrap_or_default(),
        abstract_text.unwrap_or_default(),
        head
    )
}

fn new_source_text(source: &NewSource) -> String {
    embedding_text(
        source.title.as_deref(),
        source.abstract_text.as_deref(),
        &source.full_text,
    )
}

fn record_text(record: &SourceRecord) -> String {
    embedding_text(
        record.title.as_deref(),
        record.abstract_text.as_deref(),
        &record.full_text,
    )
}

/// Result of adding one source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddedSource {
    pub id: String,
    pub embedded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degradation: Option<Degradation>,
}

/// Insert `source` and store its embedding when the provider produced one.
pub async fn add_source(
    store: &dyn CorpusStore,
    service: &EmbeddingService,
    source: &NewSource,
) -> Result<AddedSource> {
    let id = store.insert_source(source).await?;
    let text = new_source_text(source);
    let outcome = service.embed(&text).await;

    if let Some(reason) = outcome.reason() {
        warn!(id = %id, reason = %reason, "source stored without embedding");
        return Ok(AddedSource {
            id,
            embedded: false,
            degradation: Some(reason.clone()),
        });
    }

    let meta = EmbeddingMeta {
        model: service.model_name().to_string(),
        content_hash: fingerprint(&text),
    };
    store.set_embedding(&id, outcome.value(), &meta).await?;
    info!(id = %id, title = source.title.as_deref().unwrap_or_default(), "source added");

    Ok(AddedSource {
        id,
        embedded: true,
        degradation: None,
    })
}

/// Why a record needs a new embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshReason {
    Missing,
    ModelChanged,
    ContentChanged,
}

/// Decide whether `status` is stale for `model`.
pub fn refresh_reason(status: &SourceEmbeddingStatus, model: &str) -> Option<RefreshReason> {
    let Some(meta) = &status.embedding else {
        return Some(RefreshReason::Missing);
    };
    if meta.model != model {
        return Some(RefreshReason::ModelChanged);
    }
    if meta.content_hash != fingerprint(&record_text(&status.source)) {
        return Some(RefreshReason::ContentChanged);
    }
    None
}

/// Counts from a [`refresh_embeddings`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub checked: usize,
    pub pending: usize,
    pub embedded: usize,
    /// Records left unembedded because the provider degraded.
    pub degraded: usize,
    pub dry_run: bool,
}

/// Re-embed every record that is missing an embedding, was embedded by a
/// different model, or whose text changed since it was embedded.
pub async fn refresh_embeddings(
    store: &dyn CorpusStore,
    service: &EmbeddingService,
    dry_run: bool,
) -> Result<RefreshSummary> {
    let statuses = store.embedding_status().await?;
    let model = service.model_name().to_string();
    let mut summary = RefreshSummary {
        checked: statuses.len(),
        dry_run,
        ..RefreshSummary::default()
    };

    for status in &statuses {
        let Some(reason) = refresh_reason(status, &model) else {
            continue;
        };
        summary.pending += 1;
        debug!(id = %status.source.id, ?reason, "embedding is stale");
        if dry_run {
            continue;
        }

        let text = record_text(&status.source);
        let outcome = service.embed(&text).await;
        if outcome.is_degraded() {
            summary.degraded += 1;
            continue;
        }

        let meta = EmbeddingMeta {
            model: model.clone(),
            content_hash: fingerprint(&text),
        };
        store
            .set_embedding(&status.source.id, outcome.value(), &meta)
            .await?;
        summary.embedded += 1;
    }

    info!(
        checked = summary.checked,
        pending = summary.pending,
        embedded = summary.embedded,
        degraded = summary.degraded,
        dry_run,
        "embedding refresh finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cache::EmbeddingCache;
    use crate::service::test_support::{no_delay, ScriptedProvider};
    use crate::stats::EngineStats;
    use crate::store::memory::InMemoryCorpus;

    const DIMS: usize = 8;

    fn service(provider: ScriptedProvider) -> EmbeddingService {
        EmbeddingService::new(
            Arc::new(provider),
            EmbeddingCache::disabled(),
            no_delay(),
            Arc::new(EngineStats::new()),
        )
    }

    fn source(title: &str) -> NewSource {
        NewSource {
            title: Some(title.to_string()),
            abstract_text: Some("An abstract".to_string()),
            full_text: "x".repeat(1500),
            ..NewSource::default()
        }
    }

    #[test]
    fn test_embedding_text_uses_head_of_full_text() {
        let text = embedding_text(Some("Title"), Some("Abstract"), &"y".repeat(1200));
        assert!(text.starts_with("Title. Abstract. y"));
        assert_eq!(text.chars().count(), "Title. Abstract. ".len() + 1000);
        assert_eq!(embedding_text(None, None, "body"), ". . body");
    }

    #[tokio::test]
    async fn test_add_source_stores_embedding() {
        let store = InMemoryCorpus::new(DIMS);
        let svc = service(ScriptedProvider::healthy(DIMS));

        let added = add_source(&store, &svc, &source("Paper")).await.unwrap();
        assert!(added.embedded);
        assert_eq!(store.count_embedded().await.unwrap(), 1);

        let statuses = store.embedding_status().await.unwrap();
        assert_eq!(refresh_reason(&statuses[0], "scripted"), None);
    }

    #[tokio::test]
    async fn test_degraded_embedding_is_not_stored() {
        let store = InMemoryCorpus::new(DIMS);
        let svc = service(ScriptedProvider::failing(DIMS, usize::MAX));

        let added = add_source(&store, &svc, &source("Paper")).await.unwrap();
        assert!(!added.embedded);
        assert!(matches!(
            added.degradation,
            Some(Degradation::ProviderExhausted { .. })
        ));
        assert_eq!(store.count_sources().await.unwrap(), 1);
        assert_eq!(store.count_embedded().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_refresh_picks_up_missing_and_stale() {
        let store = InMemoryCorpus::new(DIMS);
        store.insert_source(&source("Never embedded")).await.unwrap();
        store
            .insert_embedded(&source("Other model"), vec![1.0; DIMS])
            .await
            .unwrap();
        let svc = service(ScriptedProvider::healthy(DIMS));
        add_source(&store, &svc, &source("Fresh")).await.unwrap();

        let dry = refresh_embeddings(&store, &svc, true).await.unwrap();
        assert_eq!(dry.checked, 3);
        assert_eq!(dry.pending, 2);
        assert_eq!(dry.embedded, 0);
        assert_eq!(store.count_embedded().await.unwrap(), 2);

        let done = refresh_embeddings(&store, &svc, false).await.unwrap();
        assert_eq!(done.embedded, 2);
        assert_eq!(store.count_embedded().await.unwrap(), 3);

        let again = refresh_embeddings(&store, &svc, false).await.unwrap();
        assert_eq!(again.pending, 0);
    }

    #[test]
    fn test_changed_text_is_stale() {
        let record = SourceRecord {
            id: "s1".to_string(),
            title: Some("T".to_string()),
            authors: None,
            publication_year: None,
            abstract_text: None,
            full_text: "edited body".to_string(),
            source_type: Default::default(),
            embedding: Some(vec![0.0; DIMS]),
        };
        let status = SourceEmbeddingStatus {
            source: record,
            embedding: Some(EmbeddingMeta {
                model: "m".to_string(),
                content_hash: fingerprint(&embedding_text(Some("T"), None, "original body")),
            }),
        };
        assert_eq!(refresh_reason(&status, "m"), Some(RefreshReason::ContentChanged));
        assert_eq!(refresh_reason(&status, "n"), Some(RefreshReason::ModelChanged));
    }
}
