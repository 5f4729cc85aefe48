//! Error taxonomy for the integrity engine.
//!
//! Each collaborator has its own error type so the engine can decide how to
//! degrade: provider errors are retried and then replaced by a fallback
//! vector, cache errors are always swallowed, and store errors switch search
//! over to the fallback result set.

use thiserror::Error;

/// Result alias for engine operations that can surface an [`IntegrityError`].
pub type Result<T> = std::result::Result<T, IntegrityError>;

/// Failure of a single embedding provider call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Provider disabled or missing credentials.
    #[error("embedding provider not configured: {0}")]
    NotConfigured(String),

    /// Credentials rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Quota or rate limit exceeded.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// Transport failure or non-success HTTP status.
    #[error("http error: {0}")]
    Http(String),

    /// The response body could not be interpreted.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The provider returned a vector of the wrong length.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Failure of the cache backend. Never reaches callers of the service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    #[error("cache operation timed out")]
    Timeout,

    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cached value could not be decoded: {0}")]
    Codec(String),
}

impl CacheError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Failure of the corpus store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The store does not exist or does not respond.
    #[error("corpus store unavailable: {0}")]
    Unavailable(String),

    /// A stored or supplied vector does not have the corpus dimensionality.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Any other backend failure.
    #[error("corpus query failed: {0}")]
    Query(String),
}

impl StoreError {
    pub fn query(err: impl std::fmt::Display) -> Self {
        Self::Query(err.to_string())
    }
}

/// Umbrella error for engine operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntegrityError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}
