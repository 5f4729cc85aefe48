//! Best-effort embedding cache.
//!
//! [`CacheBackend`] is the raw key/value contract implemented by the app
//! crate (moka in-memory, Redis). [`EmbeddingCache`] wraps an optional
//! backend, derives keys from text fingerprints, and turns every backend
//! failure into a miss.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::CacheError;

/// Default time-to-live for cached embeddings.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Key/value storage for embedding vectors.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Backend name for logs and health output (e.g. `"redis"`).
    fn name(&self) -> &str;
    async fn get(&self, key: &str) -> Result<Option<Vec<f32>>, CacheError>;
    async fn put(&self, key: &str, vector: &[f32], ttl: Duration) -> Result<(), CacheError>;
    /// Check that the backend responds.
    async fn ping(&self) -> Result<(), CacheError>;
}

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(Vec<f32>),
    Miss,
    /// The backend failed; treated as a miss by the service.
    Unavailable(String),
}

/// Fingerprint-keyed view over an optional [`CacheBackend`].
///
/// Without a backend every lookup is a miss and every write is a no-op.
#[derive(Clone)]
pub struct EmbeddingCache {
    backend: Option<Arc<dyn CacheBackend>>,
    prefix: String,
    ttl: Duration,
}

impl EmbeddingCache {
    pub fn new(backend: Arc<dyn CacheBackend>, prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            backend: Some(backend),
            prefix: prefix.into(),
            ttl,
        }
    }

    /// A cache that always misses.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            prefix: String::new(),
            ttl: DEFAULT_TTL,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend_name(&self) -> Option<&str> {
        self.backend.as_deref().map(|b| b.name())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Build the storage key for a fingerprint within a model namespace.
    pub fn key(&self, model: &str, fingerprint: &str) -> String {
        format!("{}:{}:{}", self.prefix, model, fingerprint)
    }

    pub async fn get(&self, model: &str, fingerprint: &str) -> CacheLookup {
        let Some(backend) = &self.backend else {
            return CacheLookup::Miss;
        };
        let key = self.key(model, fingerprint);
        match backend.get(&key).await {
            Ok(Some(vector)) => {
                debug!(key = %key, "embedding cache hit");
                CacheLookup::Hit(vector)
            }
            Ok(None) => CacheLookup::Miss,
            Err(e) => {
                warn!(backend = backend.name(), error = %e, "embedding cache read failed");
                CacheLookup::Unavailable(e.to_string())
            }
        }
    }

    /// Write-through with the configured TTL. Returns whether the write
    /// succeeded; failures are logged and otherwise ignored.
    pub async fn put(&self, model: &str, fingerprint: &str, vector: &[f32]) -> bool {
        self.put_with_ttl(model, fingerprint, vector, self.ttl).await
    }

    pub async fn put_with_ttl(
        &self,
        model: &str,
        fingerprint: &str,
        vector: &[f32],
        ttl: Duration,
    ) -> bool {
        let Some(backend) = &self.backend else {
            return false;
        };
        let key = self.key(model, fingerprint);
        match backend.put(&key, vector, ttl).await {
            Ok(()) => true,
            Err(e) => {
                warn!(backend = backend.name(), error = %e, "embedding cache write failed");
                false
            }
        }
    }

    /// `None` when no backend is configured.
    pub async fn ping(&self) -> Option<Result<(), CacheError>> {
        match &self.backend {
            Some(backend) => Some(backend.ping().await),
            None => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// HashMap-backed cache that records the TTLs it was given.
    #[derive(Default)]
    pub struct MapCache {
        pub entries: Mutex<HashMap<String, (Vec<f32>, Duration)>>,
    }

    #[async_trait]
    impl CacheBackend for MapCache {
        fn name(&self) -> &str {
            "map"
        }

        async fn get(&self, key: &str) -> Result<Option<Vec<f32>>, CacheError> {
            Ok(self.entries.lock().unwrap().get(key).map(|(v, _)| v.clone()))
        }

        async fn put(&self, key: &str, vector: &[f32], ttl: Duration) -> Result<(), CacheError> {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), (vector.to_vec(), ttl));
            Ok(())
        }

        async fn ping(&self) -> Result<(), CacheError> {
            Ok(())
        }
    }

    /// A cache whose every call fails, like an unreachable server.
    pub struct BrokenCache;

    #[async_trait]
    impl CacheBackend for BrokenCache {
        fn name(&self) -> &str {
            "broken"
        }

        async fn get(&self, _key: &str) -> Result<Option<Vec<f32>>, CacheError> {
            Err(CacheError::backend("connection refused"))
        }

        async fn put(&self, _key: &str, _vector: &[f32], _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Timeout)
        }

        async fn ping(&self) -> Result<(), CacheError> {
            Err(CacheError::backend("connection refused"))
        }
    }
}
