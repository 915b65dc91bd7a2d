//! Rate table caching with TTL support.

use chrono::Duration;
use dashmap::DashMap;
use fxgate_common::{constants, Clock, SharedClock, SystemClock, Timestamp};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::snapshot::RateSnapshot;

/// Cached snapshot entry.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Arc<RateSnapshot>,
    stored_at: Timestamp,
}

impl CacheEntry {
    fn is_valid(&self, now: Timestamp, ttl: Duration) -> bool {
        // An entry exactly `ttl` old is still served.
        now.signed_duration_since(self.stored_at) <= ttl
    }
}

/// Configuration for rate cache.
#[derive(Debug, Clone)]
pub struct RateCacheConfig {
    /// How long a stored snapshot stays valid.
    pub ttl: Duration,
}

impl Default for RateCacheConfig {
    fn default() -> Self {
        Self {
            ttl: constants::rate_cache_ttl(),
        }
    }
}

/// Thread-safe snapshot cache keyed by base currency code.
///
/// Expiry is checked lazily: `get` evicts an expired entry instead of
/// returning it, so an expired snapshot is never observable.
pub struct RateCache {
    cache: DashMap<String, CacheEntry>,
    config: RateCacheConfig,
    clock: SharedClock,
}

impl RateCache {
    /// Create a new rate cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(RateCacheConfig::default(), Arc::new(SystemClock))
    }

    /// Create a new rate cache with custom configuration and clock.
    pub fn with_config(config: RateCacheConfig, clock: SharedClock) -> Self {
        Self {
            cache: DashMap::new(),
            config,
            clock,
        }
    }

    /// Get a snapshot from cache if still valid.
    pub fn get(&self, key: &str) -> Option<Arc<RateSnapshot>> {
        let now = self.clock.now();

        if let Some(entry) = self.cache.get(key) {
            if entry.is_valid(now, self.config.ttl) {
                debug!(key, "Cache hit");
                return Some(entry.value.clone());
            }

            debug!(key, stored_at = %entry.stored_at, "Cache entry expired");
            // Release the read guard before taking the shard write lock.
            drop(entry);
            // Another task may have stored a fresh entry in between.
            self.cache
                .remove_if(key, |_, entry| !entry.is_valid(now, self.config.ttl));
        }

        debug!(key, "Cache miss");
        None
    }

    /// Store a snapshot, replacing any existing entry for `key`.
    pub fn set(&self, key: impl Into<String>, value: Arc<RateSnapshot>) {
        let entry = CacheEntry {
            value,
            stored_at: self.clock.now(),
        };
        self.cache.insert(key.into(), entry);
    }

    /// Clear all cached snapshots.
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Get the number of entries in cache, expired ones included.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Check whether an entry (valid or not) is stored under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.cache.contains_key(key)
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let total = self.cache.len();
        let valid = self
            .cache
            .iter()
            .filter(|e| e.is_valid(now, self.config.ttl))
            .count();

        CacheStats {
            total_entries: total,
            valid_entries: valid,
            expired_entries: total.saturating_sub(valid),
        }
    }
}

impl Default for RateCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
}

/// Shared rate cache.
pub type SharedRateCache = Arc<RateCache>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use fxgate_common::{Currency, ManualClock};

    fn make_snapshot(base: &str) -> Arc<RateSnapshot> {
        Arc::new(RateSnapshot::new(
            Currency::new(base),
            vec![(Currency::eur(), 0.9)],
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        ))
    }

    fn manual_cache() -> (Arc<ManualClock>, RateCache) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        ));
        let cache = RateCache::with_config(RateCacheConfig::default(), clock.clone());
        (clock, cache)
    }

    #[test]
    fn test_cache_set_and_get() {
        let (_, cache) = manual_cache();
        let snapshot = make_snapshot("USD");

        cache.set("USD", snapshot.clone());

        let cached = cache.get("USD").unwrap();
        assert!(Arc::ptr_eq(&cached, &snapshot));
    }

    #[test]
    fn test_cache_miss() {
        let cache = RateCache::new();
        assert!(cache.get("USD").is_none());
    }

    #[test]
    fn test_cache_valid_at_ttl_boundary() {
        let (clock, cache) = manual_cache();
        cache.set("USD", make_snapshot("USD"));

        clock.advance(Duration::hours(1));

        assert!(cache.get("USD").is_some());
    }

    #[test]
    fn test_cache_expiry_evicts() {
        let (clock, cache) = manual_cache();
        cache.set("USD", make_snapshot("USD"));

        clock.advance(Duration::hours(1) + Duration::milliseconds(1));

        // Expired but still stored until someone reads it.
        assert!(cache.contains_key("USD"));
        assert_eq!(cache.stats().expired_entries, 1);

        assert!(cache.get("USD").is_none());
        assert!(!cache.contains_key("USD"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_overwrite_resets_age() {
        let (clock, cache) = manual_cache();
        cache.set("USD", make_snapshot("USD"));

        clock.advance(Duration::minutes(50));
        let fresh = make_snapshot("USD");
        cache.set("USD", fresh.clone());

        clock.advance(Duration::minutes(50));
        let cached = cache.get("USD").unwrap();
        assert!(Arc::ptr_eq(&cached, &fresh));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_clear() {
        let (_, cache) = manual_cache();
        cache.set("USD", make_snapshot("USD"));
        cache.set("GBP", make_snapshot("GBP"));

        assert_eq!(cache.len(), 2);

        cache.clear();

        assert_eq!(cache.len(), 0);
        assert!(cache.get("USD").is_none());
    }

    #[test]
    fn test_cache_stats() {
        let (clock, cache) = manual_cache();
        cache.set("USD", make_snapshot("USD"));
        clock.advance(Duration::minutes(90));
        cache.set("GBP", make_snapshot("GBP"));

        let stats = cache.stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.valid_entries, 1);
        assert_eq!(stats.expired_entries, 1);
    }
}
