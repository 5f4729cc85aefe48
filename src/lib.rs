//! # Integrity Harness
//!
//! Semantic retrieval and plagiarism scoring for academic-integrity
//! analysis.
//!
//! Integrity Harness embeds a corpus of academic sources, ranks them by
//! cosine similarity against a query, and scores a document for
//! plagiarism by searching each of its chunks. Every path degrades instead
//! of failing: a missing provider yields fallback vectors, an unreachable
//! or empty corpus yields a fixed set of fallback sources, and a failed
//! analysis yields a zero-score report carrying the error.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────────┐   ┌─────────────┐
//! │  Provider  │◀──│ EmbeddingService │──▶│ moka/Redis  │
//! │ Gemini/... │   └────────┬─────────┘   │   cache     │
//! └────────────┘            │             └─────────────┘
//!                  ┌────────┴─────────┐   ┌─────────────┐
//!                  │ SimilaritySearch │──▶│   SQLite    │
//!                  └────────┬─────────┘   │   corpus    │
//!                           │             └─────────────┘
//!                  ┌────────┴─────────┐
//!                  │PlagiarismDetector│
//!                  └──────────────────┘
//! ```
//!
//! The algorithms live in `integrity-harness-core`; this crate supplies the
//! concrete collaborators and the `integrity` CLI.
//!
//! ## Quick Start
//!
//! ```bash
//! integrity init                          # create database
//! integrity ingest sources.json           # seed the corpus
//! integrity embed pending                 # retry failed embeddings
//! integrity search "gradient descent"
//! integrity detect essay.txt --json
//! integrity health
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite corpus store |
//! | [`embedding`] | Embedding providers |
//! | [`cache`] | moka and Redis cache backends |
//! | [`engine`] | Collaborator wiring |
//! | [`ingest`] | Corpus seeding |
//! | [`embed_cmd`] | Embedding backfill |
//! | [`search`] | Search command |
//! | [`detect_cmd`] | Detection command |
//! | [`health`] | Component health check |
//! | [`logging`] | Tracing subscriber setup |

pub mod cache;
pub mod config;
pub mod db;
pub mod detect_cmd;
pub mod embed_cmd;
pub mod embedding;
pub mod engine;
pub mod health;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod search;
pub mod sqlite_store;

pub use integrity_harness_core as core;
