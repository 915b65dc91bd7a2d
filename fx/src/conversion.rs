//! Conversion result type.

use chrono::NaiveDate;
use fxgate_common::Currency;
use serde::Serialize;

/// Outcome of one conversion request. Not retained by the service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    /// Input amount.
    pub amount: f64,
    /// Source currency.
    pub from: Currency,
    /// Target currency.
    pub to: Currency,
    /// Units of `to` per unit of `from`.
    pub rate: f64,
    /// `amount * rate`, unrounded.
    pub converted_amount: f64,
    /// Date of the rate table used.
    pub last_update: NaiveDate,
}

impl ConversionResult {
    /// Result for converting a currency into itself.
    pub fn identity(amount: f64, currency: Currency, today: NaiveDate) -> Self {
        Self {
            amount,
            from: currency.clone(),
            to: currency,
            rate: 1.0,
            converted_amount: amount,
            last_update: today,
        }
    }
}
