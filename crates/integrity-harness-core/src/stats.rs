//! Degradation counters.
//!
//! The engine answers every request, so the only way for operators to notice
//! a provider or corpus outage is to watch these counters alongside the
//! `warn!` logs emitted at each fallback.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Shared counters, updated with relaxed atomics.
#[derive(Debug, Default)]
pub struct EngineStats {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_errors: AtomicU64,
    provider_calls: AtomicU64,
    provider_failures: AtomicU64,
    embedding_fallbacks: AtomicU64,
    search_fallbacks: AtomicU64,
    detection_failures: AtomicU64,
}

/// Point-in-time copy of [`EngineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_errors: u64,
    pub provider_calls: u64,
    pub provider_failures: u64,
    pub embedding_fallbacks: u64,
    pub search_fallbacks: u64,
    pub detection_failures: u64,
}

impl EngineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_error(&self) {
        self.cache_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_provider_call(&self) {
        self.provider_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_provider_failure(&self) {
        self.provider_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_embedding_fallback(&self) {
        self.embedding_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_search_fallback(&self) {
        self.search_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_detection_failure(&self) {
        self.detection_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_errors: self.cache_errors.load(Ordering::Relaxed),
            provider_calls: self.provider_calls.load(Ordering::Relaxed),
            provider_failures: self.provider_failures.load(Ordering::Relaxed),
            embedding_fallbacks: self.embedding_fallbacks.load(Ordering::Relaxed),
            search_fallbacks: self.search_fallbacks.load(Ordering::Relaxed),
            detection_failures: self.detection_failures.load(Ordering::Relaxed),
        }
    }
}
