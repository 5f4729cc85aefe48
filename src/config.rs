//! Configuration parsing and validation.
//!
//! Integrity Harness is configured via a TOML file (default:
//! `config/integrity.toml`). Every section and field has a default, so an
//! empty file is a valid configuration that runs fully degraded: no
//! provider, no cache, fallback sources only.
//!
//! # Example
//!
//! ```toml
//! [db]
//! path = "./data/integrity.sqlite"
//!
//! [embedding]
//! provider = "gemini"
//! model = "models/embedding-001"
//! dims = 768
//!
//! [cache]
//! backend = "redis"
//! url = "redis://127.0.0.1:6379"
//! ttl_secs = 3600
//!
//! [detection]
//! threshold = 0.85
//! ```
//!
//! API keys are read from the environment (`GEMINI_API_KEY`,
//! `OPENAI_API_KEY`), never from the file.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use integrity_harness_core::detect::DetectionParams;
use integrity_harness_core::service::RetryPolicy;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/integrity.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    /// Base URL override for the provider endpoint.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            dims: default_dims(),
            url: None,
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.backoff_base_ms),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_model() -> String {
    "models/embedding-001".to_string()
}
fn default_dims() -> usize {
    integrity_harness_core::EMBEDDING_DIMS
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_base_ms() -> u64 {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
    #[serde(default = "default_cache_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: default_redis_url(),
            ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
            timeout_ms: default_cache_timeout_ms(),
            key_prefix: default_key_prefix(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_backend() -> String {
    "disabled".to_string()
}
fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}
fn default_ttl_secs() -> u64 {
    3600
}
fn default_max_entries() -> u64 {
    10_000
}
fn default_cache_timeout_ms() -> u64 {
    500
}
fn default_key_prefix() -> String {
    "embedding".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_limit")]
    pub default_limit: i64,
    /// JSON file replacing the built-in fallback sources.
    #[serde(default)]
    pub fallback_path: Option<PathBuf>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            fallback_path: None,
        }
    }
}

fn default_limit() -> i64 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct DetectionConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_chunk_words")]
    pub chunk_words: usize,
    #[serde(default = "default_min_document_chars")]
    pub min_document_chars: usize,
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,
    #[serde(default = "default_matches_per_chunk")]
    pub matches_per_chunk: usize,
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        let params = DetectionParams::default();
        Self {
            threshold: params.threshold,
            chunk_words: params.chunk_words,
            min_document_chars: params.min_document_chars,
            min_chunk_chars: params.min_chunk_chars,
            matches_per_chunk: params.matches_per_chunk,
            preview_chars: params.preview_chars,
            concurrency: params.concurrency,
        }
    }
}

impl DetectionConfig {
    pub fn params(&self) -> DetectionParams {
        DetectionParams {
            threshold: self.threshold,
            chunk_words: self.chunk_words,
            min_document_chars: self.min_document_chars,
            min_chunk_chars: self.min_chunk_chars,
            matches_per_chunk: self.matches_per_chunk,
            preview_chars: self.preview_chars,
            concurrency: self.concurrency,
        }
    }
}

fn default_threshold() -> f64 {
    DetectionParams::default().threshold
}
fn default_chunk_words() -> usize {
    DetectionParams::default().chunk_words
}
fn default_min_document_chars() -> usize {
    DetectionParams::default().min_document_chars
}
fn default_min_chunk_chars() -> usize {
    DetectionParams::default().min_chunk_chars
}
fn default_matches_per_chunk() -> usize {
    DetectionParams::default().matches_per_chunk
}
fn default_preview_chars() -> usize {
    DetectionParams::default().preview_chars
}
fn default_concurrency() -> usize {
    DetectionParams::default().concurrency
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate embedding
    if config.embedding.dims == 0 {
        bail!("embedding.dims must be > 0");
    }
    if config.embedding.max_attempts == 0 {
        bail!("embedding.max_attempts must be >= 1");
    }
    match config.embedding.provider.as_str() {
        "disabled" | "gemini" | "openai" | "ollama" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, gemini, openai, or ollama.",
            other
        ),
    }

    // Validate cache
    match config.cache.backend.as_str() {
        "disabled" | "memory" | "redis" => {}
        other => bail!(
            "Unknown cache backend: '{}'. Must be disabled, memory, or redis.",
            other
        ),
    }

    // Validate retrieval
    if config.retrieval.default_limit < 1 {
        bail!("retrieval.default_limit must be >= 1");
    }

    // Validate detection
    if !(0.0..=1.0).contains(&config.detection.threshold) {
        bail!("detection.threshold must be in [0.0, 1.0]");
    }
    if config.detection.chunk_words == 0 {
        bail!("detection.chunk_words must be > 0");
    }
    if config.detection.concurrency == 0 {
        bail!("detection.concurrency must be >= 1");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.embedding.provider, "disabled");
        assert_eq!(config.embedding.dims, 768);
        assert_eq!(config.cache.backend, "disabled");
        assert_eq!(config.cache.ttl(), Duration::from_secs(3600));
        assert_eq!(config.retrieval.default_limit, 5);
        assert_eq!(config.detection.params(), DetectionParams::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config = parse_config(
            r#"
[embedding]
provider = "ollama"
url = "http://localhost:11434"
backoff_base_ms = 0

[detection]
threshold = 0.7
"#,
        )
        .unwrap();
        assert_eq!(config.embedding.url.as_deref(), Some("http://localhost:11434"));
        assert_eq!(config.embedding.retry_policy().base_delay, Duration::ZERO);
        assert_eq!(config.embedding.retry_policy().max_attempts, 3);
        assert_eq!(config.detection.threshold, 0.7);
        assert_eq!(config.detection.chunk_words, 500);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let cases = [
            "[embedding]\nprovider = \"magic\"",
            "[embedding]\ndims = 0",
            "[embedding]\nmax_attempts = 0",
            "[cache]\nbackend = \"memcached\"",
            "[retrieval]\ndefault_limit = 0",
            "[detection]\nthreshold = 1.5",
            "[detection]\nchunk_words = 0",
            "[detection]\nconcurrency = 0",
        ];
        for case in cases {
            assert!(parse_config(case).is_err(), "accepted: {case}");
        }
    }

    #[test]
    fn test_load_config_reports_missing_file() {
        let err = load_config(Path::new("/nonexistent/integrity.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
