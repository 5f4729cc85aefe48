//! Concrete embedding providers.
//!
//! Implements the core [`EmbeddingProvider`] trait for:
//! - **[`DisabledProvider`]**: always fails; the service then degrades to
//!   fallback vectors. The default when no provider is configured.
//! - **[`GeminiProvider`]**: Google Generative Language `embedContent`.
//! - **[`OpenAIProvider`]**: OpenAI `/v1/embeddings` with `dimensions` set.
//! - **[`OllamaProvider`]**: a local Ollama instance's `/api/embed`.
//!
//! Each provider makes exactly one HTTP request per `embed` call. Retry
//! and backoff belong to `EmbeddingService`, so failures are classified
//! here and returned as [`ProviderError`]s:
//! - HTTP 401/403 → [`ProviderError::Auth`]
//! - HTTP 429 → [`ProviderError::RateLimited`]
//! - other non-success status or network error → [`ProviderError::Http`]
//! - request timeout → [`ProviderError::Timeout`]
//! - unexpected JSON → [`ProviderError::MalformedResponse`]
//!
//! # Provider Selection
//!
//! ```rust,no_run
//! # use integrity_harness::config::EmbeddingConfig;
//! # use integrity_harness::embedding::create_provider;
//! let config = EmbeddingConfig::default(); // provider = "disabled"
//! let provider = create_provider(&config).unwrap();
//! assert_eq!(provider.model_name(), "disabled");
//! ```

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;

pub use integrity_harness_core::embedding::EmbeddingProvider;
use integrity_harness_core::error::ProviderError;

use crate::config::EmbeddingConfig;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";

// ============ Disabled Provider ============

/// Provider used when embeddings are not configured.
pub struct DisabledProvider {
    dims: usize,
}

impl DisabledProvider {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

#[async_trait]
impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
        Err(ProviderError::NotConfigured(
            "embedding.provider is 'disabled'".to_string(),
        ))
    }
}

// ============ Shared HTTP handling ============

fn http_client(config: &EmbeddingConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .context("Failed to build HTTP client")
}

fn request_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Http(err.without_url().to_string())
    }
}

fn status_error(provider: &str, status: StatusCode, body: &str) -> ProviderError {
    let detail = format!("{provider} API error {status}: {body}");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Auth(detail),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited(detail),
        _ => ProviderError::Http(detail),
    }
}

/// Send a prepared request and return the JSON body of a success response.
async fn send_json(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> Result<serde_json::Value, ProviderError> {
    let response = request.send().await.map_err(request_error)?;
    let status = response.status();

    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        return Err(status_error(provider, status, &body_text));
    }

    response
        .json()
        .await
        .map_err(|e| ProviderError::MalformedResponse(e.without_url().to_string()))
}

fn parse_values(values: &serde_json::Value, context: &str) -> Result<Vec<f32>, ProviderError> {
    let array = values
        .as_array()
        .ok_or_else(|| ProviderError::MalformedResponse(format!("{context} is not an array")))?;

    array
        .iter()
        .map(|v| {
            v.as_f64().map(|f| f as f32).ok_or_else(|| {
                ProviderError::MalformedResponse(format!("{context} contains a non-number"))
            })
        })
        .collect()
}

// ============ Gemini Provider ============

/// Embedding provider using the Google Generative Language API.
///
/// Calls `POST {base}/{model}:embedContent` with task type
/// `RETRIEVAL_DOCUMENT`. Requires `GEMINI_API_KEY` in the environment; the
/// key travels in the `x-goog-api-key` header so it never appears in a URL.
pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    /// Resource name, always prefixed with `models/`.
    model: String,
    dims: usize,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = match std::env::var("GEMINI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            _ => bail!("GEMINI_API_KEY environment variable not set"),
        };
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &EmbeddingConfig, api_key: String) -> Result<Self> {
        let model = if config.model.starts_with("models/") {
            config.model.clone()
        } else {
            format!("models/{}", config.model)
        };

        Ok(Self {
            client: http_client(config)?,
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
            model,
            dims: config.dims,
            api_key,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let body = serde_json::json!({
            "model": self.model,
            "content": { "parts": [{ "text": text }] },
            "taskType": "RETRIEVAL_DOCUMENT",
        });

        let request = self
            .client
            .post(format!("{}/{}:embedContent", self.base_url, self.model))
            .header("x-goog-api-key", self.api_key.as_str())
            .json(&body);

        let json = send_json("Gemini", request).await?;
        parse_gemini_response(&json)
    }
}

/// Extract `embedding.values` from an `embedContent` response.
fn parse_gemini_response(json: &serde_json::Value) -> Result<Vec<f32>, ProviderError> {
    let values = json
        .get("embedding")
        .and_then(|e| e.get("values"))
        .ok_or_else(|| {
            ProviderError::MalformedResponse("Gemini response missing embedding.values".to_string())
        })?;
    parse_values(values, "embedding.values")
}

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI API.
///
/// Requests `dimensions = embedding.dims` so models that support shortened
/// embeddings return vectors of the corpus dimensionality. Requires
/// `OPENAI_API_KEY` in the environment.
pub struct OpenAIProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dims: usize,
    api_key: String,
}

impl OpenAIProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            _ => bail!("OPENAI_API_KEY environment variable not set"),
        };

        Ok(Self {
            client: http_client(config)?,
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            model: config.model.clone(),
            dims: config.dims,
            api_key,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
            "dimensions": self.dims,
        });

        let request = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body);

        let json = send_json("OpenAI", request).await?;
        parse_openai_response(&json)
    }
}

/// Extract `data[0].embedding` from an embeddings response.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<f32>, ProviderError> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .ok_or_else(|| {
            ProviderError::MalformedResponse("OpenAI response missing data[0].embedding".to_string())
        })?;
    parse_values(embedding, "data[0].embedding")
}

// ============ Ollama Provider ============

/// Embedding provider using a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL (default:
/// `http://localhost:11434`). Requires an embedding model to be pulled.
pub struct OllamaProvider {
    client: reqwest::Client,
    url: String,
    model: String,
    dims: usize,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OLLAMA_BASE_URL.to_string()),
            model: config.model.clone(),
            dims: config.dims,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let request = self
            .client
            .post(format!("{}/api/embed", self.url))
            .json(&body);

        let json = send_json("Ollama", request).await.map_err(|e| match e {
            ProviderError::Http(msg) => ProviderError::Http(format!(
                "{msg} (is Ollama running at {}?)",
                self.url
            )),
            other => other,
        })?;
        parse_ollama_response(&json)
    }
}

/// Extract `embeddings[0]` from an `/api/embed` response.
fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<f32>, ProviderError> {
    let embedding = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .and_then(|e| e.first())
        .ok_or_else(|| {
            ProviderError::MalformedResponse("Ollama response missing embeddings[0]".to_string())
        })?;
    parse_values(embedding, "embeddings[0]")
}

/// Create the provider named by `config.provider`.
///
/// # Errors
///
/// Returns an error for unknown provider names or a missing API key.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledProvider::new(config.dims))),
        "gemini" => Ok(Arc::new(GeminiProvider::new(config)?)),
        "openai" => Ok(Arc::new(OpenAIProvider::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config)?)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}
