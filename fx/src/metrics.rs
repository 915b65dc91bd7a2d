//! Counters for monitoring the conversion service.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Service metrics.
#[derive(Debug, Default)]
pub struct ServiceMetrics {
    /// Rate lookups served from cache.
    pub cache_hits: AtomicU64,
    /// Rate lookups that had to go to the provider.
    pub cache_misses: AtomicU64,
    /// Successful provider fetches.
    pub provider_fetches: AtomicU64,
    /// Failed provider fetches.
    pub provider_failures: AtomicU64,
    /// Completed conversions.
    pub conversions: AtomicU64,
    /// Conversions rejected for caller-fixable reasons.
    pub validation_failures: AtomicU64,
}

impl ServiceMetrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rate lookup served from cache.
    pub fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rate lookup that missed the cache.
    pub fn cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful provider fetch.
    pub fn provider_fetched(&self) {
        self.provider_fetches.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a provider failure.
    pub fn provider_failed(&self) {
        self.provider_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed conversion.
    pub fn conversion_completed(&self) {
        self.conversions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a conversion rejected by validation.
    pub fn validation_failed(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            provider_fetches: self.provider_fetches.load(Ordering::Relaxed),
            provider_failures: self.provider_failures.load(Ordering::Relaxed),
            conversions: self.conversions.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ServiceMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub provider_fetches: u64,
    pub provider_failures: u64,
    pub conversions: u64,
    pub validation_failures: u64,
}

impl MetricsSnapshot {
    /// Fraction of rate lookups served from cache.
    pub fn cache_hit_ratio(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            return 0.0;
        }
        self.cache_hits as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = ServiceMetrics::new();
        metrics.cache_hit();
        metrics.cache_hit();
        metrics.cache_hit();
        metrics.cache_miss();
        metrics.provider_failed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cache_hits, 3);
        assert_eq!(snapshot.cache_misses, 1);
        assert_eq!(snapshot.provider_failures, 1);
        assert_eq!(snapshot.cache_hit_ratio(), 0.75);
    }

    #[test]
    fn test_each_counter_records_once() {
        let metrics = ServiceMetrics::new();
        metrics.cache_hit();
        metrics.cache_miss();
        metrics.provider_fetched();
        metrics.provider_failed();
        metrics.conversion_completed();
        metrics.validation_failed();

        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                cache_hits: 1,
                cache_misses: 1,
                provider_fetches: 1,
                provider_failures: 1,
                conversions: 1,
                validation_failures: 1,
            }
        );
    }

    #[test]
    fn test_empty_hit_ratio() {
        assert_eq!(MetricsSnapshot::default().cache_hit_ratio(), 0.0);
    }
}
