//! Component health check for `integrity health`.
//!
//! Probes each collaborator once and folds the results into an overall
//! status:
//!
//! | Component | Degraded when | Unhealthy when |
//! |-----------|---------------|----------------|
//! | cache | backend ping fails | never |
//! | provider | not configured | probe embedding falls back or has the wrong length |
//! | corpus | unreachable or nothing embedded | never |
//!
//! Search keeps answering from the fallback sources in every degraded
//! state, so only a failing configured provider is reported as unhealthy.

use serde::Serialize;

use integrity_harness_core::stats::StatsSnapshot;

use crate::engine::Engine;

const PROBE_TEXT: &str = "test";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct CorpusHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedded: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Components {
    pub cache: String,
    pub provider: String,
    pub corpus: CorpusHealth,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub service: &'static str,
    pub status: HealthStatus,
    pub timestamp: String,
    pub components: Components,
    pub stats: StatsSnapshot,
}

pub async fn check(engine: &Engine) -> HealthReport {
    let mut status = HealthStatus::Healthy;

    let cache = match engine.service().cache().ping().await {
        None => "not_configured".to_string(),
        Some(Ok(())) => "healthy".to_string(),
        Some(Err(e)) => {
            status = status.max(HealthStatus::Degraded);
            format!("unhealthy: {e}")
        }
    };

    let service = engine.service();
    let provider = if service.model_name() == "disabled" {
        status = status.max(HealthStatus::Degraded);
        "not_configured".to_string()
    } else {
        let probe = service.embed(PROBE_TEXT).await;
        if let Some(reason) = probe.reason() {
            status = status.max(HealthStatus::Unhealthy);
            format!("unhealthy: {reason}")
        } else if probe.value().len() != service.dims() {
            status = status.max(HealthStatus::Unhealthy);
            "unhealthy: invalid embedding dimension".to_string()
        } else {
            "healthy".to_string()
        }
    };

    let corpus = check_corpus(engine).await;
    if corpus.status != "healthy" {
        status = status.max(HealthStatus::Degraded);
    }

    HealthReport {
        service: "integrity-harness",
        status,
        timestamp: chrono::Utc::now().to_rfc3339(),
        components: Components {
            cache,
            provider,
            corpus,
        },
        stats: engine.stats().snapshot(),
    }
}

async fn check_corpus(engine: &Engine) -> CorpusHealth {
    let store = engine.store();
    if let Err(e) = store.ping().await {
        return CorpusHealth {
            status: format!("unhealthy: {e}"),
            sources: None,
            embedded: None,
        };
    }

    match (store.count_sources().await, store.count_embedded().await) {
        (Ok(sources), Ok(embedded)) => CorpusHealth {
            status: if embedded == 0 { "empty" } else { "healthy" }.to_string(),
            sources: Some(sources),
            embedded: Some(embedded),
        },
        (Err(e), _) | (_, Err(e)) => CorpusHealth {
            status: format!("unhealthy: {e}"),
            sources: None,
            embedded: None,
        },
    }
}
