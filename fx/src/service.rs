//! Conversion service: validation, cached rate retrieval and arithmetic.

use std::sync::Arc;

use fxgate_common::{Clock, Currency, SharedClock, SystemClock};
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheStats, RateCache, RateCacheConfig, SharedRateCache};
use crate::conversion::ConversionResult;
use crate::error::{FxError, FxResult};
use crate::metrics::{MetricsSnapshot, ServiceMetrics};
use crate::provider::SharedRateProvider;
use crate::snapshot::RateSnapshot;

/// Configuration for the conversion service.
#[derive(Debug, Clone)]
pub struct ConversionServiceConfig {
    /// Cache configuration.
    pub cache: RateCacheConfig,
    /// Currencies accepted as conversion input.
    pub supported_currencies: Vec<Currency>,
}

impl Default for ConversionServiceConfig {
    fn default() -> Self {
        Self {
            cache: RateCacheConfig::default(),
            supported_currencies: Currency::supported(),
        }
    }
}

/// Owns the conversion rules and the shared rate cache.
///
/// Concurrent misses for the same base currency each call the provider and
/// the last one to finish wins the cache slot.
pub struct ConversionService {
    provider: SharedRateProvider,
    cache: SharedRateCache,
    clock: SharedClock,
    supported: Vec<Currency>,
    metrics: ServiceMetrics,
}

impl ConversionService {
    /// Create a new service with the given provider.
    pub fn new(provider: SharedRateProvider, config: ConversionServiceConfig) -> Self {
        Self::with_clock(provider, config, Arc::new(SystemClock))
    }

    /// Create a new service reading time from `clock`.
    pub fn with_clock(
        provider: SharedRateProvider,
        config: ConversionServiceConfig,
        clock: SharedClock,
    ) -> Self {
        Self {
            provider,
            cache: Arc::new(RateCache::with_config(config.cache, clock.clone())),
            clock,
            supported: config.supported_currencies,
            metrics: ServiceMetrics::new(),
        }
    }

    /// Case-insensitive allow-list check.
    pub fn is_valid_currency(&self, code: &str) -> bool {
        self.is_supported(&Currency::new(code))
    }

    /// Currencies accepted as conversion input.
    pub fn supported_currencies(&self) -> &[Currency] {
        &self.supported
    }

    /// Get the rate table for `base`, from cache or from the provider.
    #[instrument(skip(self), fields(provider = self.provider.name()))]
    pub async fn get_rates(&self, base: &str) -> FxResult<Arc<RateSnapshot>> {
        let base = Currency::new(base);
        let key = Self::cache_key(&base);

        if let Some(cached) = self.cache.get(&key) {
            debug!("Using cached rates");
            self.metrics.cache_hit();
            return Ok(cached);
        }
        self.metrics.cache_miss();

        info!(base = %base, "Fetching rates from provider");
        let snapshot = match self.provider.fetch_rates(&base).await {
            Ok(snapshot) => Arc::new(snapshot),
            Err(e) => {
                self.metrics.provider_failed();
                if let FxError::Provider { reason } = &e {
                    warn!(base = %base, reason = %reason, "Failed to fetch rates");
                }
                return Err(e);
            }
        };
        self.metrics.provider_fetched();

        self.cache.set(key, snapshot.clone());

        Ok(snapshot)
    }

    /// Convert `amount` of `from` into `to`.
    ///
    /// Missing or non-numeric amounts should be passed as `f64::NAN`; they are
    /// rejected the same way as zero or negative ones.
    #[instrument(skip(self))]
    pub async fn convert(&self, amount: f64, from: &str, to: &str) -> FxResult<ConversionResult> {
        let result = self.convert_inner(amount, Currency::new(from), Currency::new(to)).await;

        match &result {
            Ok(conversion) => {
                self.metrics.conversion_completed();
                info!(
                    from = %conversion.from,
                    to = %conversion.to,
                    rate = conversion.rate,
                    converted_amount = conversion.converted_amount,
                    "Conversion completed"
                );
            }
            Err(e) if e.is_client_error() => {
                self.metrics.validation_failed();
                debug!(error = %e, "Conversion rejected");
            }
            Err(_) => {}
        }

        result
    }

    async fn convert_inner(
        &self,
        amount: f64,
        from: Currency,
        to: Currency,
    ) -> FxResult<ConversionResult> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(FxError::InvalidAmount);
        }

        if !self.is_supported(&from) {
            return Err(FxError::UnsupportedSourceCurrency(from));
        }

        if !self.is_supported(&to) {
            return Err(FxError::UnsupportedTargetCurrency(to));
        }

        if from == to {
            return Ok(ConversionResult::identity(amount, from, self.clock.today()));
        }

        let snapshot = self.get_rates(from.code()).await?;

        let rate = snapshot
            .rate_to(&to)
            .ok_or_else(|| FxError::RateNotFound {
                from: from.clone(),
                to: to.clone(),
            })?;

        Ok(ConversionResult {
            amount,
            from,
            to,
            rate,
            converted_amount: amount * rate,
            last_update: snapshot.fetched_at(),
        })
    }

    /// Drop every cached rate table.
    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("Rate cache cleared");
    }

    /// Get the underlying cache.
    pub fn cache(&self) -> &RateCache {
        &self.cache
    }

    /// Get cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Get service counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn is_supported(&self, currency: &Currency) -> bool {
        self.supported.contains(currency)
    }

    fn cache_key(base: &Currency) -> String {
        base.code().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockRateProvider;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use fxgate_common::ManualClock;
    use proptest::prelude::*;

    fn jan_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn usd_rates() -> RateSnapshot {
        RateSnapshot::new(Currency::usd(), vec![(Currency::eur(), 0.9)], jan_first())
    }

    fn setup_service() -> (Arc<MockRateProvider>, Arc<ManualClock>, ConversionService) {
        let provider = Arc::new(MockRateProvider::new("test"));
        provider.set_rates(usd_rates());

        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 20, 9, 0, 0).unwrap(),
        ));

        let service = ConversionService::with_clock(
            provider.clone(),
            ConversionServiceConfig::default(),
            clock.clone(),
        );
        (provider, clock, service)
    }

    #[tokio::test]
    async fn test_convert_end_to_end() {
        let (provider, _, service) = setup_service();

        let result = service.convert(100.0, "USD", "EUR").await.unwrap();

        assert_eq!(
            result,
            ConversionResult {
                amount: 100.0,
                from: Currency::usd(),
                to: Currency::eur(),
                rate: 0.9,
                converted_amount: 100.0 * 0.9,
                last_update: jan_first(),
            }
        );
        assert!((result.converted_amount - 90.0).abs() < 1e-9);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_convert_case_insensitive() {
        let (_, _, service) = setup_service();

        let lower = service.convert(10.0, "usd", "eur").await.unwrap();
        let upper = service.convert(10.0, "USD", "EUR").await.unwrap();

        assert_eq!(lower, upper);
        assert_eq!(lower.from, Currency::usd());
    }

    #[tokio::test]
    async fn test_same_currency_skips_provider() {
        let (provider, _, service) = setup_service();

        for currency in Currency::supported() {
            let result = service.convert(12.5, currency.code(), currency.code()).await.unwrap();
            assert_eq!(result.rate, 1.0);
            assert_eq!(result.converted_amount, 12.5);
            assert_eq!(result.last_update, NaiveDate::from_ymd_opt(2024, 5, 20).unwrap());
        }

        let mixed_case = service.convert(3.0, "gbp", "GBP").await.unwrap();
        assert_eq!(mixed_case.rate, 1.0);

        assert_eq!(provider.call_count(), 0);
        assert!(service.cache().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_amounts() {
        let (provider, _, service) = setup_service();

        for amount in [0.0, -0.0, -5.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let result = service.convert(amount, "USD", "EUR").await;
            assert!(matches!(result, Err(FxError::InvalidAmount)), "amount {amount}");
        }

        assert_eq!(provider.call_count(), 0);
        assert!(service.cache().is_empty());
    }

    #[tokio::test]
    async fn test_amount_checked_before_currency() {
        let (_, _, service) = setup_service();

        let result = service.convert(0.0, "ZZZ", "EUR").await;

        assert!(matches!(result, Err(FxError::InvalidAmount)));
    }

    #[tokio::test]
    async fn test_unsupported_currencies() {
        let (provider, _, service) = setup_service();

        let err = service.convert(10.0, "USD", "ZZZ").await.unwrap_err();
        assert!(matches!(err, FxError::UnsupportedTargetCurrency(_)));
        assert!(err.to_string().contains("ZZZ"));
        assert!(err.is_client_error());

        let err = service.convert(10.0, "zzz", "USD").await.unwrap_err();
        assert!(matches!(err, FxError::UnsupportedSourceCurrency(_)));
        assert!(err.to_string().contains("ZZZ"));

        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_rate_not_found() {
        let (_, _, service) = setup_service();

        let err = service.convert(10.0, "USD", "JPY").await.unwrap_err();

        assert!(matches!(err, FxError::RateNotFound { .. }));
        assert_eq!(err.to_string(), "no rate found from USD to JPY");
        // The table itself was fine, so it stays cached.
        assert!(service.cache().contains_key("USD"));
    }

    #[tokio::test]
    async fn test_cache_hit() {
        let (provider, _, service) = setup_service();

        // First call fetches from provider
        let first = service.get_rates("USD").await.unwrap();

        // Second call should hit cache
        let second = service.get_rates("usd").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(provider.call_count(), 1);
        assert_eq!(service.cache().len(), 1);

        let metrics = service.metrics();
        assert_eq!(metrics.cache_hits, 1);
        assert_eq!(metrics.cache_misses, 1);
        assert_eq!(metrics.provider_fetches, 1);
    }

    #[tokio::test]
    async fn test_cache_expiry_refetches() {
        let (provider, clock, service) = setup_service();

        service.convert(1.0, "USD", "EUR").await.unwrap();
        clock.advance(Duration::minutes(59));
        service.convert(1.0, "USD", "EUR").await.unwrap();
        assert_eq!(provider.call_count(), 1);

        clock.advance(Duration::minutes(2));
        service.convert(1.0, "USD", "EUR").await.unwrap();
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_provider_failure_not_cached() {
        let (provider, _, service) = setup_service();
        provider.fail_with("connection reset by peer");

        let err = service.convert(100.0, "USD", "EUR").await.unwrap_err();

        assert!(matches!(err, FxError::Provider { .. }));
        assert_eq!(err.to_string(), "unable to fetch latest exchange rate data");
        assert!(!service.cache().contains_key("USD"));
        assert_eq!(service.metrics().provider_failures, 1);
        assert_eq!(service.metrics().validation_failures, 0);

        // Next request tries again
        provider.recover();
        let result = service.convert(100.0, "USD", "EUR").await.unwrap();
        assert_eq!(result.rate, 0.9);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_clear_cache_forces_refetch() {
        let (provider, _, service) = setup_service();

        service.get_rates("USD").await.unwrap();
        service.clear_cache();
        assert_eq!(service.cache_stats().total_entries, 0);

        service.get_rates("USD").await.unwrap();
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_may_fetch_twice() {
        let (provider, _, service) = setup_service();
        provider.set_delay(std::time::Duration::from_millis(20));

        let (a, b) = tokio::join!(
            service.convert(1.0, "USD", "EUR"),
            service.convert(2.0, "USD", "EUR")
        );

        assert_eq!(a.unwrap().rate, 0.9);
        assert_eq!(b.unwrap().converted_amount, 2.0 * 0.9);
        assert_eq!(provider.call_count(), 2);
        assert_eq!(service.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_is_valid_currency() {
        let (_, _, service) = setup_service();

        assert!(service.is_valid_currency("twd"));
        assert!(service.is_valid_currency("KRW"));
        assert!(!service.is_valid_currency("BTC"));
        assert_eq!(service.supported_currencies().len(), 12);
    }

    #[tokio::test]
    async fn test_padded_codes_rejected() {
        let (provider, _, service) = setup_service();

        assert!(!service.is_valid_currency(" usd "));
        assert!(!service.is_valid_currency("   "));

        let err = service.convert(10.0, " usd ", "EUR").await.unwrap_err();
        assert!(matches!(err, FxError::UnsupportedSourceCurrency(_)));

        let err = service.convert(10.0, "USD", "eur\n").await.unwrap_err();
        assert!(matches!(err, FxError::UnsupportedTargetCurrency(_)));

        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_metrics_track_conversions() {
        let (_, _, service) = setup_service();

        service.convert(1.0, "USD", "EUR").await.unwrap();
        service.convert(-1.0, "USD", "EUR").await.unwrap_err();

        let metrics = service.metrics();
        assert_eq!(metrics.conversions, 1);
        assert_eq!(metrics.validation_failures, 1);
    }

    proptest! {
        #[test]
        fn prop_non_positive_amounts_rejected(
            amount in prop_oneof![
                -1.0e12f64..=0.0,
                Just(f64::NAN),
                Just(f64::INFINITY),
                Just(f64::NEG_INFINITY),
            ]
        ) {
            let (provider, _, service) = setup_service();
            let result = tokio_test::block_on(service.convert(amount, "USD", "EUR"));

            prop_assert!(matches!(result, Err(FxError::InvalidAmount)));
            prop_assert_eq!(provider.call_count(), 0);
            prop_assert!(service.cache().is_empty());
        }

        #[test]
        fn prop_same_currency_is_identity(amount in 1.0e-6f64..1.0e12, idx in 0usize..12) {
            let (provider, _, service) = setup_service();
            let code = fxgate_common::SUPPORTED_CURRENCIES[idx];

            let result = tokio_test::block_on(service.convert(amount, code, code)).unwrap();

            prop_assert_eq!(result.rate, 1.0);
            prop_assert_eq!(result.converted_amount, amount);
            prop_assert_eq!(provider.call_count(), 0);
        }
    }
}
