//! Point-in-time rate tables.

use chrono::NaiveDate;
use fxgate_common::Currency;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Rates from one base currency to every currency the provider quoted.
///
/// Only finite, strictly positive rates are kept, so a successful lookup
/// always yields a usable multiplier. Snapshots are immutable once built and
/// are shared as `Arc<RateSnapshot>` between the cache and callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateSnapshot {
    base: Currency,
    rates: HashMap<Currency, f64>,
    #[serde(rename = "lastUpdate")]
    fetched_at: NaiveDate,
}

impl RateSnapshot {
    /// Build a snapshot, discarding unusable rates.
    pub fn new<I>(base: Currency, rates: I, fetched_at: NaiveDate) -> Self
    where
        I: IntoIterator<Item = (Currency, f64)>,
    {
        let rates = rates
            .into_iter()
            .filter(|(code, rate)| {
                let usable = rate.is_finite() && *rate > 0.0;
                if !usable {
                    debug!(base = %base, quote = %code, rate, "Dropping unusable rate");
                }
                usable
            })
            .collect();

        Self {
            base,
            rates,
            fetched_at,
        }
    }

    pub fn base(&self) -> &Currency {
        &self.base
    }

    pub fn rates(&self) -> &HashMap<Currency, f64> {
        &self.rates
    }

    /// Date the provider published these rates.
    pub fn fetched_at(&self) -> NaiveDate {
        self.fetched_at
    }

    /// Rate for converting one unit of the base into `quote`.
    pub fn rate_to(&self, quote: &Currency) -> Option<f64> {
        self.rates.get(quote).copied()
    }
}
