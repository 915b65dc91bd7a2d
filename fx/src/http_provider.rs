//! HTTP rate provider for `GET <base_url>/<BASE>` style APIs.

use async_trait::async_trait;
use chrono::NaiveDate;
use fxgate_common::{constants, Clock, Currency, DurationExt, SharedClock, SystemClock};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{FxError, FxResult};
use crate::provider::RateProvider;
use crate::snapshot::RateSnapshot;

/// Default upstream endpoint.
pub const DEFAULT_PROVIDER_URL: &str = "https://api.exchangerate-api.com/v4/latest";

/// Configuration for the HTTP provider.
#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    /// Endpoint the base currency code is appended to.
    pub base_url: String,
    /// Bound on one request, connect through body.
    pub timeout: Duration,
}

impl Default for HttpProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PROVIDER_URL.to_string(),
            timeout: constants::provider_timeout().as_std(),
        }
    }
}

impl HttpProviderConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("Provider URL cannot be empty".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("Provider URL must be http or https".to_string());
        }

        if self.timeout.is_zero() {
            return Err("Provider timeout cannot be zero".to_string());
        }

        Ok(())
    }
}

/// Provider response body.
#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    #[serde(default)]
    base: Option<String>,
    rates: HashMap<String, f64>,
    #[serde(default)]
    date: Option<String>,
}

impl LatestRatesResponse {
    /// Publication date, if the provider sent a well-formed one.
    fn published_on(&self) -> Option<NaiveDate> {
        self.date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
    }
}

/// Fetches rate tables over HTTP.
pub struct HttpRateProvider {
    client: reqwest::Client,
    config: HttpProviderConfig,
    clock: SharedClock,
}

impl HttpRateProvider {
    /// Create a provider using the system clock.
    pub fn new(config: HttpProviderConfig) -> FxResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a provider whose fallback date comes from `clock`.
    pub fn with_clock(config: HttpProviderConfig, clock: SharedClock) -> FxResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("fxgate/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| FxError::ClientSetup(e.to_string()))?;

        Ok(Self {
            client,
            config,
            clock,
        })
    }

    fn url_for(&self, base: &Currency) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), base.code())
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    fn name(&self) -> &str {
        "HTTP"
    }

    async fn fetch_rates(&self, base: &Currency) -> FxResult<RateSnapshot> {
        let url = self.url_for(base);
        debug!(url = %url, "Requesting rates from provider");

        let resp = self.client.get(&url).send().await.map_err(|e| {
            let reason = if e.is_timeout() {
                format!("request to {} timed out", url)
            } else {
                format!("request to {} failed: {}", url, e)
            };
            warn!(base = %base, reason = %reason, "Provider request failed");
            FxError::provider(reason)
        })?;

        let status = resp.status();
        if !status.is_success() {
            warn!(base = %base, status = status.as_u16(), "Provider returned error status");
            return Err(FxError::provider(format!(
                "provider returned {} for {}",
                status, base
            )));
        }

        let body: LatestRatesResponse = resp.json().await.map_err(|e| {
            warn!(base = %base, error = %e, "Provider response could not be decoded");
            FxError::provider(format!("invalid provider response for {}: {}", base, e))
        })?;

        let fetched_at = body.published_on().unwrap_or_else(|| {
            if body.date.is_some() {
                debug!(base = %base, date = ?body.date, "Ignoring unusable provider date");
            }
            self.clock.today()
        });
        let snapshot_base = body.base.map(Currency::new).unwrap_or_else(|| base.clone());
        let rates = body
            .rates
            .into_iter()
            .map(|(code, rate)| (Currency::new(code), rate));

        let snapshot = RateSnapshot::new(snapshot_base, rates, fetched_at);

        debug!(
            base = %snapshot.base(),
            quotes = snapshot.rates().len(),
            fetched_at = %snapshot.fetched_at(),
            "Provider returned rates"
        );

        Ok(snapshot)
    }
}
