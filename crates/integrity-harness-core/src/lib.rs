//! # Integrity Harness Core
//!
//! Runtime-light engine logic for Integrity Harness: data models, chunking,
//! the embedding service with cache and retry, the corpus store abstraction,
//! similarity search, and document-level plagiarism scoring.
//!
//! This crate contains no sqlx, HTTP client, or cache-server dependencies.
//! Concrete providers, cache backends, and the SQLite corpus live in the
//! `integrity-harness` app crate and plug in through the traits defined here.
//!
//! ```text
//! PlagiarismDetector ──▶ SimilaritySearch ──▶ EmbeddingService ──▶ EmbeddingCache
//!                                   │                  └────────▶ EmbeddingProvider
//!                                   └──────▶ CorpusStore
//! ```

pub mod cache;
pub mod chunk;
pub mod detect;
pub mod embedding;
pub mod error;
pub mod fallback;
pub mod ingest;
pub mod models;
pub mod outcome;
pub mod search;
pub mod service;
pub mod stats;
pub mod store;

/// Dimensionality of every embedding in the corpus and every query vector.
pub const EMBEDDING_DIMS: usize = 768;
