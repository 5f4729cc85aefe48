//! `integrity search`: rank corpus sources against a query.

use anyhow::Result;
use serde::Serialize;

use integrity_harness_core::models::QueryResult;
use integrity_harness_core::outcome::Degradation;
use integrity_harness_core::search::{normalize_limit, SearchOutcome};

use crate::config::Config;
use crate::engine::Engine;

/// JSON shape of a search response.
#[derive(Debug, Serialize)]
pub struct SearchResponse<'a> {
    pub query: &'a str,
    pub results: &'a [QueryResult],
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'a Degradation>,
}

impl<'a> SearchResponse<'a> {
    pub fn new(query: &'a str, outcome: &'a SearchOutcome) -> Self {
        Self {
            query,
            results: outcome.value(),
            degraded: outcome.is_degraded(),
            reason: outcome.reason(),
        }
    }
}

pub async fn run_search(config: &Config, query: &str, limit: Option<i64>, json: bool) -> Result<()> {
    let limit = normalize_limit(limit.unwrap_or(config.retrieval.default_limit));
    let engine = Engine::connect(config).await?;
    let outcome = engine.search().search(query, limit).await;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&SearchResponse::new(query, &outcome))?
        );
    } else {
        print_results(&outcome);
    }

    engine.close().await;
    Ok(())
}

fn print_results(outcome: &SearchOutcome) {
    if let Some(reason) = outcome.reason() {
        println!("(degraded: {})", reason);
    }
    if outcome.value().is_empty() {
        println!("No results.");
        return;
    }

    for (i, result) in outcome.value().iter().enumerate() {
        println!(
            "{}. [{:.2}] {} ({})",
            i + 1,
            result.similarity_score,
            result.title,
            result.publication_year
        );
        println!("    authors: {}", result.authors);
        println!("    type: {}", result.source_type);
        println!(
            "    abstract: \"{}\"",
            result.abstract_text.replace('\n', " ").trim()
        );
        println!("    id: {}", result.id);
        println!();
    }
}
