//! REST API envelope and error types

use crate::error::{ErrorResponse, ScreenerError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

/// Envelope for endpoints that return a bare payload
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: &'static str,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success_with_data(data: T) -> Self {
        Self {
            status: "success",
            data,
        }
    }
}

/// Service info returned by `GET /`
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub endpoints: Vec<&'static str>,
}

/// Handler error: maps a [`ScreenerError`] onto a status code and an
/// [`ErrorResponse`] body
#[derive(Debug)]
pub struct ApiError(pub ScreenerError);

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        if self.0.is_compile_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<ScreenerError> for ApiError {
    fn from(err: ScreenerError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("API request failed: {}", self.0);
        } else {
            warn!("API request rejected: {}", self.0);
        }
        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}
