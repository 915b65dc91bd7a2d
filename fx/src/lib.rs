//! FxGate FX Service
//!
//! Rate caching and currency conversion on top of an external rate provider.
//!
//! # Features
//!
//! - Pluggable rate providers, with an HTTP implementation
//! - Per-base-currency rate table caching with a fixed TTL
//! - Allow-list validation and typed, caller-safe errors
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fxgate_fx::{ConversionService, ConversionServiceConfig, HttpProviderConfig, HttpRateProvider};
//!
//! let provider = Arc::new(HttpRateProvider::new(HttpProviderConfig::default())?);
//! let service = ConversionService::new(provider, ConversionServiceConfig::default());
//!
//! let result = service.convert(100.0, "usd", "eur").await?;
//! println!("{} {} = {} {}", result.amount, result.from, result.converted_amount, result.to);
//! ```

pub mod cache;
pub mod conversion;
pub mod error;
pub mod http_provider;
pub mod metrics;
pub mod provider;
pub mod service;
pub mod snapshot;

pub use cache::{CacheStats, RateCache, RateCacheConfig};
pub use conversion::ConversionResult;
pub use error::{ErrorKind, FxError, FxResult};
pub use http_provider::{HttpProviderConfig, HttpRateProvider};
pub use metrics::{MetricsSnapshot, ServiceMetrics};
pub use provider::RateProvider;
#[cfg(any(test, feature = "test-utils"))]
pub use provider::MockRateProvider;
pub use service::{ConversionService, ConversionServiceConfig};
pub use snapshot::RateSnapshot;
