//! HTTP routes for the conversion service.

use std::path::Path as FsPath;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::handler::HandlerWithoutStateExt;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::debug;

use fxgate_common::Currency;
use fxgate_fx::{CacheStats, ConversionResult, ConversionService, MetricsSnapshot, RateSnapshot};

use crate::error::{ApiError, ApiResult};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ConversionService>,
    /// Server start time for uptime calculation
    pub start_time: Instant,
}

impl AppState {
    pub fn new(service: Arc<ConversionService>) -> Self {
        Self {
            service,
            start_time: Instant::now(),
        }
    }
}

/// Success envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub message: String,
}

impl<T> ApiResponse<T> {
    fn ok(data: T, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            message: message.into(),
        })
    }
}

impl ApiResponse<()> {
    fn message(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            data: None,
            message: message.into(),
        })
    }
}

/// Body of `POST /api/convert`.
#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

/// Payload of `GET /api/health`.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub uptime_secs: u64,
    pub cache: CacheStats,
    /// Fraction of rate lookups answered from cache.
    pub cache_hit_ratio: f64,
    pub metrics: MetricsSnapshot,
}

/// Build the application router.
pub fn router(state: AppState, static_dir: Option<&FsPath>) -> Router {
    let api = Router::new()
        .route("/api/currencies", get(list_currencies))
        .route("/api/rates/{currency}", get(get_rates))
        .route("/api/convert", post(convert))
        .route("/api/cache", delete(clear_cache))
        .route("/api/health", get(health_check))
        .with_state(state);

    let app = match static_dir {
        Some(dir) => {
            debug!(dir = %dir.display(), "Serving static files");
            api.fallback_service(ServeDir::new(dir).not_found_service(not_found.into_service()))
        }
        None => api.fallback(not_found),
    };

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Interpret a JSON amount the way a lenient browser client sends it.
///
/// Numbers are used as-is and numeric strings are parsed; anything else
/// becomes NaN, which the service rejects as an invalid amount.
pub fn parse_amount(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

async fn list_currencies(State(state): State<AppState>) -> Json<ApiResponse<Vec<Currency>>> {
    ApiResponse::ok(
        state.service.supported_currencies().to_vec(),
        "supported currencies",
    )
}

async fn get_rates(
    State(state): State<AppState>,
    Path(currency): Path<String>,
) -> ApiResult<Json<ApiResponse<RateSnapshot>>> {
    if !state.service.is_valid_currency(&currency) {
        return Err(ApiError::bad_request(format!(
            "unsupported currency: {}",
            currency
        )));
    }

    let snapshot = state.service.get_rates(&currency).await?;

    Ok(ApiResponse::ok(
        RateSnapshot::clone(&snapshot),
        "exchange rates fetched",
    ))
}

async fn convert(
    State(state): State<AppState>,
    body: Result<Json<ConvertRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<ConversionResult>>> {
    let Json(request) = body.map_err(|e| {
        debug!(error = %e, "Rejected conversion body");
        ApiError::bad_request("invalid request body")
    })?;

    let (amount, from, to) = match (request.amount, request.from, request.to) {
        (Some(amount), Some(from), Some(to)) if !from.is_empty() && !to.is_empty() => {
            (amount, from, to)
        }
        _ => {
            return Err(ApiError::bad_request(
                "missing required parameters: amount, from, to",
            ))
        }
    };

    let result = state
        .service
        .convert(parse_amount(&amount), &from, &to)
        .await?;

    Ok(ApiResponse::ok(result, "conversion successful"))
}

async fn clear_cache(State(state): State<AppState>) -> Json<ApiResponse<()>> {
    state.service.clear_cache();
    ApiResponse::message("cache cleared")
}

async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthStatus>> {
    let metrics = state.service.metrics();
    let health = HealthStatus {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        cache: state.service.cache_stats(),
        cache_hit_ratio: metrics.cache_hit_ratio(),
        metrics,
    };
    ApiResponse::ok(health, "service is running")
}

async fn not_found() -> ApiError {
    ApiError::not_found("resource not found")
}
