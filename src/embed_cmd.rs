//! `integrity embed pending`: fill in missing and stale embeddings.

use anyhow::{bail, Result};

use integrity_harness_core::ingest::refresh_embeddings;

use crate::config::Config;
use crate::engine::Engine;

/// Embed every source that has no embedding, was embedded by another
/// model, or whose text changed since it was embedded.
pub async fn run_embed_pending(config: &Config, dry_run: bool) -> Result<()> {
    if !config.embedding.is_enabled() && !dry_run {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }

    let engine = Engine::connect(config).await?;
    if engine.store().ping().await.is_err() {
        engine.close().await;
        bail!("Database is not initialized. Run `integrity init` first.");
    }

    let summary = refresh_embeddings(engine.store().as_ref(), engine.service(), dry_run).await?;

    if summary.dry_run {
        println!("embed pending (dry-run)");
        println!("  sources checked: {}", summary.checked);
        println!("  sources needing embeddings: {}", summary.pending);
    } else if summary.pending == 0 {
        println!("embed pending");
        println!("  all sources up to date");
    } else {
        println!("embed pending");
        println!("  total pending: {}", summary.pending);
        println!("  embedded: {}", summary.embedded);
        println!("  failed: {}", summary.degraded);
    }

    engine.close().await;
    Ok(())
}
