//! Currency codes and the supported allow-list.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency codes accepted by the conversion service.
pub const SUPPORTED_CURRENCIES: [&str; 12] = [
    "USD", "EUR", "GBP", "JPY", "TWD", "CNY", "KRW", "HKD", "SGD", "AUD", "CAD", "CHF",
];

/// ISO 4217 currency code, always stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Create a new currency from code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().to_uppercase())
    }

    /// Get the currency code.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Check if the code is on the supported allow-list.
    pub fn is_supported(&self) -> bool {
        SUPPORTED_CURRENCIES.contains(&self.0.as_str())
    }

    /// All supported currencies, in allow-list order.
    pub fn supported() -> Vec<Currency> {
        SUPPORTED_CURRENCIES.iter().map(|c| Currency::new(*c)).collect()
    }

    /// Common currencies
    pub fn usd() -> Self {
        Self::new("USD")
    }

    pub fn eur() -> Self {
        Self::new("EUR")
    }

    pub fn gbp() -> Self {
        Self::new("GBP")
    }

    pub fn jpy() -> Self {
        Self::new("JPY")
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Currency {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Currency {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<Currency> for String {
    fn from(c: Currency) -> Self {
        c.0
    }
}
