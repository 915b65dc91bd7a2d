//! Rate provider trait and test double.

use async_trait::async_trait;
use fxgate_common::Currency;
use std::sync::Arc;

use crate::error::FxResult;
use crate::snapshot::RateSnapshot;

/// Source of full rate tables for a base currency.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Fetch every rate quoted against `base`.
    async fn fetch_rates(&self, base: &Currency) -> FxResult<RateSnapshot>;
}

/// Shared provider handle.
pub type SharedRateProvider = Arc<dyn RateProvider>;

/// Mock rate provider for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateProvider {
    name: String,
    snapshots: dashmap::DashMap<Currency, RateSnapshot>,
    failure: parking_lot::Mutex<Option<String>>,
    delay: parking_lot::Mutex<Option<std::time::Duration>>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateProvider {
    /// Create a new mock provider.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            snapshots: dashmap::DashMap::new(),
            failure: parking_lot::Mutex::new(None),
            delay: parking_lot::Mutex::new(None),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Set the table returned for the snapshot's base currency.
    pub fn set_rates(&self, snapshot: RateSnapshot) {
        self.snapshots.insert(snapshot.base().clone(), snapshot);
    }

    /// Make every following call fail with `reason`.
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.failure.lock() = Some(reason.into());
    }

    /// Stop failing.
    pub fn recover(&self) {
        *self.failure.lock() = None;
    }

    /// Sleep this long inside every call.
    pub fn set_delay(&self, delay: std::time::Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Number of `fetch_rates` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateProvider for MockRateProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_rates(&self, base: &Currency) -> FxResult<RateSnapshot> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self.failure.lock().clone();
        if let Some(reason) = failure {
            return Err(crate::error::FxError::provider(reason));
        }

        self.snapshots
            .get(base)
            .map(|s| s.clone())
            .ok_or_else(|| crate::error::FxError::provider(format!("no rates for {}", base)))
    }
}
