//! Embedding provider trait and vector utilities.
//!
//! Defines the [`EmbeddingProvider`] trait that all embedding backends
//! implement, plus pure helpers for fingerprinting text, encoding vectors
//! as BLOBs, computing cosine similarity, and building the defined
//! fallback vectors.
//!
//! Concrete providers (Gemini, OpenAI, Ollama) live in the
//! `integrity-harness` app crate.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::ProviderError;

/// A remote embedding model.
///
/// One call to [`embed`](EmbeddingProvider::embed) is one network request.
/// Providers hold no memory of prior calls and never retry; retry and
/// fallback belong to [`EmbeddingService`](crate::service::EmbeddingService).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"models/embedding-001"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `768`).
    fn dims(&self) -> usize;
    /// Produce a `dims()`-length embedding for `text`.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}

/// Collapse runs of whitespace and trim, so cosmetic spacing changes map to
/// the same fingerprint.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Stable SHA-256 hex fingerprint of the normalized text.
///
/// Used as cache key material instead of the raw text.
pub fn fingerprint(text: &str) -> String {
    hex::encode(Sha256::digest(normalize_text(text).as_bytes()))
}

/// The all-zero vector returned for empty input.
pub fn zero_vector(dims: usize) -> Vec<f32> {
    vec![0.0; dims]
}

/// Deterministic stand-in vector used when the provider cannot be reached.
///
/// Values are uniform in `[-0.1, 0.1)`, seeded from the fingerprint, so the
/// same text always degrades to the same vector.
pub fn fallback_vector(fingerprint: &str, dims: usize) -> Vec<f32> {
    let digest = Sha256::digest(fingerprint.as_bytes());
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest[..8]);
    let mut rng = fastrand::Rng::with_seed(u64::from_le_bytes(seed));
    (0..dims).map(|_| (rng.f32() - 0.5) * 0.2).collect()
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// ```rust
/// use integrity_harness_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12);
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity between two vectors of equal length.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` when either vector has zero
/// norm (the zero vector is similar to nothing). Callers check lengths;
/// mismatched or empty inputs also yield `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
