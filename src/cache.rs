//! Embedding cache backends.
//!
//! Two [`CacheBackend`] implementations plug into the core
//! [`EmbeddingCache`]:
//!
//! - **[`MemoryCache`]**: process-local moka cache, bounded by entry count,
//!   with a per-entry TTL.
//! - **[`RedisCache`]**: `GET` / `SETEX` against a Redis server, vectors
//!   stored as JSON arrays. The connection is opened on first use and
//!   dropped after any error, so a Redis outage costs one bounded timeout
//!   per operation and recovers on its own.
//!
//! Every failure surfaces as a [`CacheError`]; the service treats it as a
//! miss.

use anyhow::{Context, Result};
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use redis::aio::MultiplexedConnection;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info};

use integrity_harness_core::cache::{CacheBackend, EmbeddingCache};
use integrity_harness_core::error::CacheError;

use crate::config::CacheConfig;

// ============ Memory Cache ============

#[derive(Clone)]
struct CachedVector {
    vector: Arc<Vec<f32>>,
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, CachedVector> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedVector,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

pub struct MemoryCache {
    cache: Cache<String, CachedVector>,
}

impl MemoryCache {
    pub fn new(max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<f32>>, CacheError> {
        Ok(self.cache.get(key).await.map(|v| v.vector.as_ref().clone()))
    }

    async fn put(&self, key: &str, vector: &[f32], ttl: Duration) -> Result<(), CacheError> {
        let value = CachedVector {
            vector: Arc::new(vector.to_vec()),
            ttl,
        };
        self.cache.insert(key.to_string(), value).await;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

// ============ Redis Cache ============

pub struct RedisCache {
    client: redis::Client,
    conn: Mutex<Option<MultiplexedConnection>>,
    timeout: Duration,
}

impl RedisCache {
    /// Parse `url`; no connection is made until the first operation.
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = redis::Client::open(url)
            .with_context(|| format!("Invalid Redis URL: {}", url))?;
        Ok(Self {
            client,
            conn: Mutex::new(None),
            timeout,
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let conn = timeout(self.timeout, self.client.get_multiplexed_async_connection())
            .await
            .map_err(|_| CacheError::Timeout)?
            .map_err(CacheError::backend)?;
        debug!("redis connection established");
        *guard = Some(conn.clone());
        Ok(conn)
    }

    async fn reset(&self) {
        *self.conn.lock().await = None;
    }

    /// Run one command under the timeout, dropping the connection on error.
    async fn run<T: redis::FromRedisValue>(&self, cmd: redis::Cmd) -> Result<T, CacheError> {
        let mut conn = self.connection().await?;
        match timeout(self.timeout, cmd.query_async(&mut conn)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                self.reset().await;
                Err(CacheError::backend(e))
            }
            Err(_) => {
                self.reset().await;
                Err(CacheError::Timeout)
            }
        }
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    fn name(&self) -> &str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<f32>>, CacheError> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        let raw: Option<String> = self.run(cmd).await?;
        raw.map(|json| serde_json::from_str(&json).map_err(|e| CacheError::Codec(e.to_string())))
            .transpose()
    }

    async fn put(&self, key: &str, vector: &[f32], ttl: Duration) -> Result<(), CacheError> {
        let json = serde_json::to_string(vector).map_err(|e| CacheError::Codec(e.to_string()))?;
        let mut cmd = redis::cmd("SETEX");
        cmd.arg(key).arg(ttl.as_secs().max(1)).arg(json);
        let _: () = self.run(cmd).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let _: String = self.run(redis::cmd("PING")).await?;
        Ok(())
    }
}

/// Build the embedding cache named by `config.backend`.
pub fn create_cache(config: &CacheConfig) -> Result<EmbeddingCache> {
    let backend: Arc<dyn CacheBackend> = match config.backend.as_str() {
        "disabled" => {
            info!("embedding cache disabled");
            return Ok(EmbeddingCache::disabled());
        }
        "memory" => Arc::new(MemoryCache::new(config.max_entries)),
        "redis" => Arc::new(RedisCache::new(&config.url, config.timeout())?),
        other => anyhow::bail!("Unknown cache backend: {}", other),
    };
    info!(backend = backend.name(), ttl_secs = config.ttl_secs, "embedding cache enabled");
    Ok(EmbeddingCache::new(backend, config.key_prefix.clone(), config.ttl()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use integrity_harness_core::cache::CacheLookup;

    #[tokio::test]
    async fn test_memory_cache_roundtrip() {
        let cache = MemoryCache::new(100);
        cache
            .put("k", &[1.0, 2.0], Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(vec![1.0, 2.0]));
        assert_eq!(cache.get("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_cache_entries_expire() {
        let cache = MemoryCache::new(100);
        cache
            .put("short", &[1.0], Duration::from_millis(50))
            .await
            .unwrap();
        cache
            .put("long", &[2.0], Duration::from_secs(60))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(cache.get("short").await.unwrap(), None);
        assert_eq!(cache.get("long").await.unwrap(), Some(vec![2.0]));
    }

    #[tokio::test]
    async fn test_unreachable_redis_is_a_cache_error() {
        // Port 1 refuses connections on loopback
        let cache = RedisCache::new("redis://127.0.0.1:1", Duration::from_millis(200)).unwrap();
        assert!(cache.ping().await.is_err());
        assert!(cache.get("k").await.is_err());
        assert!(cache.put("k", &[1.0], Duration::from_secs(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_redis_reads_as_unavailable() {
        let config = CacheConfig {
            backend: "redis".to_string(),
            url: "redis://127.0.0.1:1".to_string(),
            timeout_ms: 200,
            ..CacheConfig::default()
        };
        let cache = create_cache(&config).unwrap();
        assert!(cache.is_enabled());
        assert!(matches!(
            cache.get("model", "abc").await,
            CacheLookup::Unavailable(_)
        ));
        assert!(!cache.put("model", "abc", &[1.0]).await);
    }

    #[test]
    fn test_create_cache_variants() {
        assert!(!create_cache(&CacheConfig::default()).unwrap().is_enabled());

        let memory = CacheConfig {
            backend: "memory".to_string(),
            ..CacheConfig::default()
        };
        let cache = create_cache(&memory).unwrap();
        assert_eq!(cache.backend_name(), Some("memory"));
        assert_eq!(cache.key("m", "fp"), "embedding:m:fp");

        let bad = CacheConfig {
            backend: "redis".to_string(),
            url: "not a url".to_string(),
            ..CacheConfig::default()
        };
        assert!(create_cache(&bad).is_err());
    }
}
