//! FxGate Server
//!
//! HTTP front end for the conversion service: JSON endpoints for currencies,
//! rate tables, conversions and cache administration.

pub mod api;
pub mod config;
pub mod error;

use std::sync::Arc;

use fxgate_fx::{ConversionService, FxResult, HttpRateProvider};

pub use api::{router, AppState};
pub use config::ServerConfig;

/// Build the conversion service described by `config`.
pub fn build_service(config: &ServerConfig) -> FxResult<Arc<ConversionService>> {
    let provider = Arc::new(HttpRateProvider::new(config.provider.clone())?);
    Ok(Arc::new(ConversionService::new(
        provider,
        config.service_config(),
    )))
}
