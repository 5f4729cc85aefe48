//! Cached, retrying embedding generation that never fails.
//!
//! # Algorithm
//!
//! 1. Empty or whitespace-only text → zero vector (no cache, no provider).
//! 2. Fingerprint the normalized text and consult the cache.
//! 3. On a miss, call the provider up to `max_attempts` times, sleeping
//!    `base_delay × 2^n` between attempts.
//! 4. On success, write through to the cache and return the vector.
//! 5. If every attempt fails, return a deterministic fallback vector tagged
//!    [`Degradation::ProviderExhausted`]. Fallback vectors are never cached.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::cache::{CacheLookup, EmbeddingCache};
use crate::embedding::{fallback_vector, fingerprint, zero_vector, EmbeddingProvider};
use crate::error::ProviderError;
use crate::outcome::{Degradation, Outcome};
use crate::stats::EngineStats;

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Number of provider calls made per embedding; always at least one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay slept after failed attempt `attempt` (0-based): base, 2×base, 4×base, ...
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

/// The only component callers use to turn text into a vector.
pub struct EmbeddingService {
    provider: Arc<dyn EmbeddingProvider>,
    cache: EmbeddingCache,
    retry: RetryPolicy,
    stats: Arc<EngineStats>,
}

impl EmbeddingService {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        cache: EmbeddingCache,
        retry: RetryPolicy,
        stats: Arc<EngineStats>,
    ) -> Self {
        Self {
            provider,
            cache,
            retry,
            stats,
        }
    }

    pub fn dims(&self) -> usize {
        self.provider.dims()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    pub fn stats(&self) -> &Arc<EngineStats> {
        &self.stats
    }

    /// Embed `text`, always returning a `dims()`-length vector.
    pub async fn get_embedding(&self, text: &str) -> Vec<f32> {
        self.embed(text).await.into_value()
    }

    /// Embed `text`, reporting whether the vector came from a fallback path.
    pub async fn embed(&self, text: &str) -> Outcome<Vec<f32>> {
        let dims = self.dims();

        if text.trim().is_empty() {
            debug!("empty text provided for embedding");
            return Outcome::degraded(zero_vector(dims), Degradation::EmptyInput);
        }

        let fp = fingerprint(text);
        let model = self.provider.model_name();

        match self.cache.get(model, &fp).await {
            CacheLookup::Hit(vector) => {
                self.stats.record_cache_hit();
                return Outcome::Success(vector);
            }
            CacheLookup::Miss => {
                if self.cache.is_enabled() {
                    self.stats.record_cache_miss();
                }
            }
            CacheLookup::Unavailable(_) => self.stats.record_cache_error(),
        }

        match self.call_with_retry(text).await {
            Ok(vector) => {
                if self.cache.is_enabled() && !self.cache.put(model, &fp, &vector).await {
                    self.stats.record_cache_error();
                }
                Outcome::Success(vector)
            }
            Err(last_error) => {
                self.stats.record_embedding_fallback();
                error!(
                    attempts = self.retry.attempts(),
                    error = %last_error,
                    "all embedding attempts failed, using fallback vector"
                );
                Outcome::degraded(
                    fallback_vector(&fp, dims),
                    Degradation::ProviderExhausted {
                        attempts: self.retry.attempts(),
                        last_error: last_error.to_string(),
                    },
                )
            }
        }
    }

    async fn call_with_retry(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let dims = self.dims();
        let attempts = self.retry.attempts();
        let mut last_err = ProviderError::NotConfigured("no attempts made".to_string());

        for attempt in 0..attempts {
            self.stats.record_provider_call();
            let result = match self.provider.embed(text).await {
                Ok(vector) if vector.len() != dims => Err(ProviderError::DimensionMismatch {
                    expected: dims,
                    actual: vector.len(),
                }),
                other => other,
            };

            match result {
                Ok(vector) => return Ok(vector),
                Err(e) => {
                    self.stats.record_provider_failure();
                    warn!(attempt = attempt + 1, error = %e, "embedding attempt failed");
                    last_err = e;
                }
            }

            if attempt + 1 < attempts {
                tokio::time::sleep(self.retry.delay_after(attempt)).await;
            }
        }

        Err(last_err)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    /// Provider double: fails the first `failures` calls, then returns a
    /// vector derived from the text length.
    pub struct ScriptedProvider {
        pub dims: usize,
        pub failures: usize,
        pub calls: AtomicUsize,
    }

    impl ScriptedProvider {
        pub fn healthy(dims: usize) -> Self {
            Self::failing(dims, 0)
        }

        pub fn failing(dims: usize, failures: usize) -> Self {
            Self {
                dims,
                failures,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EmbeddingProvider for ScriptedProvider {
        fn model_name(&self) -> &str {
            "scripted"
        }

        fn dims(&self) -> usize {
            self.dims
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(ProviderError::Timeout);
            }
            let mut v = vec![0.0; self.dims];
            v[0] = 1.0;
            v[1] = text.len() as f32;
            Ok(v)
        }
    }

    pub fn no_delay() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::ZERO,
        }
    }
}
