//! REST API endpoint handlers
//!
//! Screening and database work is blocking; it runs on the blocking pool so
//! the async workers stay free.

use crate::api::types::{ApiError, ApiResponse, ServiceInfo};
use crate::db::DataStatistics;
use crate::error::{Result, ScreenerError};
use crate::services::{
    AvailableFieldsResponse, AvailableTemplatesResponse, CatalogService, DataService,
    HealthResponse, ScreenerRequest, ScreenerResponse, ScreenerService,
};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::info;

/// Run `f` against the shared state on the blocking pool
async fn run_blocking<T, F>(state: Arc<AppState>, f: F) -> std::result::Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&AppState) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| ApiError(ScreenerError::Internal(format!("blocking task failed: {}", e))))?
        .map_err(ApiError)
}

// ============================================================================
// Service info
// ============================================================================

/// Service info - GET /
pub async fn service_info() -> impl IntoResponse {
    Json(ServiceInfo {
        service: "stock-screener",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: vec![
            "POST /api/v1/screen",
            "GET /api/v1/fields",
            "GET /api/v1/templates",
            "GET /api/v1/stats/:timeframe",
            "GET /api/v1/symbols/:timeframe",
            "GET /api/v1/health",
        ],
    })
}

// ============================================================================
// Screening
// ============================================================================

/// Run a screen - POST /api/v1/screen
pub async fn screen(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<serde_json::Value>, JsonRejection>,
) -> std::result::Result<Json<ScreenerResponse>, ApiError> {
    let Json(body) =
        payload.map_err(|e| ApiError(ScreenerError::InvalidRequest(e.body_text())))?;
    let request = ScreenerRequest::from_json(body)?;

    let response = run_blocking(state, move |state| ScreenerService::screen(state, &request)).await?;
    info!(
        "API screen - {} results in {:.2}ms",
        response.metadata.total_results, response.metadata.execution_time_ms
    );
    Ok(Json(response))
}

// ============================================================================
// Catalog
// ============================================================================

/// Fields, timeframes and operators - GET /api/v1/fields
pub async fn available_fields(State(state): State<Arc<AppState>>) -> Json<AvailableFieldsResponse> {
    Json(CatalogService::available_fields(&state))
}

/// Templates and categories - GET /api/v1/templates
pub async fn available_templates(
    State(state): State<Arc<AppState>>,
) -> Json<AvailableTemplatesResponse> {
    Json(CatalogService::available_templates(&state))
}

// ============================================================================
// Data
// ============================================================================

/// Table statistics - GET /api/v1/stats/:timeframe
pub async fn data_statistics(
    State(state): State<Arc<AppState>>,
    Path(timeframe): Path<String>,
) -> std::result::Result<Json<ApiResponse<DataStatistics>>, ApiError> {
    let stats = run_blocking(state, move |state| DataService::data_statistics(state, &timeframe)).await?;
    Ok(Json(ApiResponse::success_with_data(stats)))
}

/// Distinct symbols - GET /api/v1/symbols/:timeframe
pub async fn available_symbols(
    State(state): State<Arc<AppState>>,
    Path(timeframe): Path<String>,
) -> std::result::Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let symbols =
        run_blocking(state, move |state| DataService::available_symbols(state, &timeframe)).await?;
    Ok(Json(ApiResponse::success_with_data(symbols)))
}

/// Health check - GET /api/v1/health
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> std::result::Result<(StatusCode, Json<HealthResponse>), ApiError> {
    let health = run_blocking(state, |state| Ok(DataService::health(state))).await?;
    let status = if health.database == "connected" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    Ok((status, Json(health)))
}
