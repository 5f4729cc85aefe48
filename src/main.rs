//! # Integrity Harness CLI (`integrity`)
//!
//! ## Usage
//!
//! ```bash
//! integrity --config ./config/integrity.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `integrity init` | Create the SQLite database and run schema migrations |
//! | `integrity ingest <file.json>` | Seed the corpus from a JSON array of sources |
//! | `integrity embed pending` | Backfill missing or stale embeddings |
//! | `integrity search "<query>"` | Rank corpus sources against a query |
//! | `integrity detect <file>` | Score a plain-text document for plagiarism |
//! | `integrity health` | Report cache, provider, and corpus health |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use integrity_harness::health::HealthStatus;
use integrity_harness::{
    config, detect_cmd, embed_cmd, engine, health, ingest, logging, migrate, search,
};

/// Integrity Harness CLI: semantic retrieval and plagiarism scoring over an
/// academic corpus.
#[derive(Parser)]
#[command(
    name = "integrity",
    about = "Integrity Harness: semantic retrieval and plagiarism scoring over an academic corpus",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/integrity.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Seed the corpus from a JSON file of sources.
    ///
    /// Skipped when the corpus already has sources, unless `--append`.
    Ingest {
        /// JSON array of sources (title, authors, publication_year,
        /// abstract, full_text, source_type).
        path: PathBuf,

        /// Add sources even if the corpus is not empty.
        #[arg(long)]
        append: bool,
    },

    /// Manage source embeddings.
    Embed {
        #[command(subcommand)]
        action: EmbedAction,
    },

    /// Rank corpus sources by semantic similarity to a query.
    Search {
        query: String,

        /// Maximum number of results (defaults to `[retrieval].default_limit`).
        #[arg(long)]
        limit: Option<i64>,

        /// Print the response as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Score a plain-text document for plagiarism.
    Detect {
        /// Document path, or `-` for stdin.
        path: PathBuf,

        /// Similarity a match must exceed to be flagged
        /// (defaults to `[detection].threshold`).
        #[arg(long)]
        threshold: Option<f64>,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Check cache, provider, and corpus health.
    Health,
}

#[derive(Subcommand)]
enum EmbedAction {
    /// Embed sources that are missing an embedding or are stale.
    Pending {
        /// Only count what would be embedded.
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    logging::init_logging(&cfg.logging)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { path, append } => {
            ingest::run_ingest(&cfg, &path, append).await?;
        }
        Commands::Embed { action } => match action {
            EmbedAction::Pending { dry_run } => {
                embed_cmd::run_embed_pending(&cfg, dry_run).await?;
            }
        },
        Commands::Search { query, limit, json } => {
            search::run_search(&cfg, &query, limit, json).await?;
        }
        Commands::Detect {
            path,
            threshold,
            json,
        } => {
            detect_cmd::run_detect(&cfg, &path, threshold, json).await?;
        }
        Commands::Health => {
            let engine = engine::Engine::connect(&cfg).await?;
            let report = health::check(&engine).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            engine.close().await;
            if report.status == HealthStatus::Unhealthy {
                anyhow::bail!("service is unhealthy");
            }
        }
    }

    Ok(())
}
