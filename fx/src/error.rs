//! Conversion service error types.

use fxgate_common::Currency;
use thiserror::Error;

/// Message shown to callers whenever the upstream provider fails.
pub const PROVIDER_FAILURE_MESSAGE: &str = "unable to fetch latest exchange rate data";

/// Broad error category, used by the HTTP layer to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-fixable input problem.
    Validation,
    /// Upstream rate provider could not deliver data.
    Provider,
}

/// Errors that can occur in the conversion service.
#[derive(Debug, Error)]
pub enum FxError {
    /// Amount missing, non-numeric, non-finite, zero or negative.
    #[error("amount must be greater than 0")]
    InvalidAmount,

    /// Source currency is not on the allow-list.
    #[error("unsupported source currency: {0}")]
    UnsupportedSourceCurrency(Currency),

    /// Target currency is not on the allow-list.
    #[error("unsupported target currency: {0}")]
    UnsupportedTargetCurrency(Currency),

    /// The rate table for `from` has no entry for `to`.
    #[error("no rate found from {from} to {to}")]
    RateNotFound { from: Currency, to: Currency },

    /// Provider request failed. `reason` is for logs only and never displayed.
    #[error("unable to fetch latest exchange rate data")]
    Provider { reason: String },

    /// The HTTP client for the provider could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientSetup(String),
}

impl FxError {
    /// Create a provider error carrying an internal reason.
    pub fn provider(reason: impl Into<String>) -> Self {
        FxError::Provider {
            reason: reason.into(),
        }
    }

    /// Get the error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FxError::Provider { .. } | FxError::ClientSetup(_) => ErrorKind::Provider,
            _ => ErrorKind::Validation,
        }
    }

    /// Check if the caller can fix this error by changing the request.
    pub fn is_client_error(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            FxError::InvalidAmount => "INVALID_AMOUNT",
            FxError::UnsupportedSourceCurrency(_) => "UNSUPPORTED_SOURCE_CURRENCY",
            FxError::UnsupportedTargetCurrency(_) => "UNSUPPORTED_TARGET_CURRENCY",
            FxError::RateNotFound { .. } => "RATE_NOT_FOUND",
            FxError::Provider { .. } => "PROVIDER_UNAVAILABLE",
            FxError::ClientSetup(_) => "CLIENT_SETUP_FAILED",
        }
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;
