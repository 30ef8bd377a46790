//! HTTP server for the REST API
//!
//! Provides:
//! - Screening endpoint (/api/v1/screen)
//! - Catalog, statistics and health endpoints (/api/v1/*)
//! - Rate limiting per route class

use crate::api::handlers;
use crate::api::rate_limiter::{rate_limit_middleware, RateLimiterState};
use crate::error::Result;
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Build the router with all routes and middleware
pub fn build_router(state: Arc<AppState>) -> Router {
    info!(
        "Rate limits: Screen={}/s, Metadata={}/s",
        state.config.screen_rate_limit, state.config.api_rate_limit
    );
    let rate_limiter = Arc::new(RateLimiterState::new(
        state.config.screen_rate_limit,
        state.config.api_rate_limit,
    ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::service_info))
        .route("/api/v1/health", get(handlers::health_check))
        // Screening
        .route("/api/v1/screen", post(handlers::screen))
        // Catalog
        .route("/api/v1/fields", get(handlers::available_fields))
        .route("/api/v1/templates", get(handlers::available_templates))
        // Data
        .route("/api/v1/stats/:timeframe", get(handlers::data_statistics))
        .route("/api/v1/symbols/:timeframe", get(handlers::available_symbols))
        .with_state(state)
        .layer(middleware::from_fn_with_state(rate_limiter, rate_limit_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// API server manager
pub struct ApiServer {
    state: Arc<AppState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ApiServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            shutdown_tx: None,
        }
    }

    /// Bind the configured address and serve in a background task
    pub async fn start(&mut self) -> Result<JoinHandle<()>> {
        let addr = self.state.config.socket_addr()?;
        let app = build_router(self.state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        self.shutdown_tx = Some(shutdown_tx);

        info!("Starting stock screener API server on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;

        let handle = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("API server shutting down");
            });

            if let Err(e) = server.await {
                error!("API server error: {}", e);
            }
        });

        info!("Stock screener API server started");
        info!("  POST http://{}/api/v1/screen", addr);
        info!("  GET  http://{}/api/v1/fields", addr);
        info!("  GET  http://{}/api/v1/templates", addr);
        info!("  GET  http://{}/api/v1/stats/{{timeframe}}", addr);
        info!("  GET  http://{}/api/v1/health", addr);

        Ok(handle)
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            info!("API server stop signal sent");
        }
    }

    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some()
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::seeded_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_screen_endpoint() {
        let (_dir, state) = seeded_state();
        let app = build_router(Arc::new(state));

        let body = json!({
            "timeframe": "5min",
            "filters": {"simple": [{"field": "rsi_14", "operator": "gt", "value": 60}]}
        });
        let (status, response) = send(&app, post_json("/api/v1/screen", &body.to_string())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["status"], "success");
        assert_eq!(response["metadata"]["total_results"], 2);
        assert_eq!(response["results"][0]["symbol"], "SBIN");
        assert_eq!(response["metadata"]["query_complexity"], "low");
    }

    #[tokio::test]
    async fn test_screen_errors_map_to_400() {
        let (_dir, state) = seeded_state();
        let app = build_router(Arc::new(state));

        let over_limit = json!({
            "timeframe": "5min",
            "filters": {"expression": "close > open"},
            "pagination": {"limit": 50000}
        });
        let (status, body) = send(&app, post_json("/api/v1/screen", &over_limit.to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert_eq!(body["code"], "LIMIT_EXCEEDED");

        let unsafe_expr = json!({
            "timeframe": "5min",
            "filters": {"expression": "close > 0 UNION SELECT 1"}
        });
        let (status, body) = send(&app, post_json("/api/v1/screen", &unsafe_expr.to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "UNSAFE_EXPRESSION");

        let (status, body) = send(&app, post_json("/api/v1/screen", "{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_screen_catalog_errors_keep_their_codes() {
        let (_dir, state) = seeded_state();
        let app = build_router(Arc::new(state));

        let unknown_timeframe = json!({
            "timeframe": "7min",
            "filters": {"expression": "close > open"}
        });
        let (status, body) = send(&app, post_json("/api/v1/screen", &unknown_timeframe.to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "UNKNOWN_TIMEFRAME");

        let bad_operator = json!({
            "timeframe": "5min",
            "filters": {"simple": [{"field": "rsi_14", "operator": "bogus", "value": 60}]}
        });
        let (status, body) = send(&app, post_json("/api/v1/screen", &bad_operator.to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "UNSUPPORTED_OPERATOR");

        let placeholder = json!({
            "timeframe": "5min",
            "filters": {"expression": "close > ?"}
        });
        let (status, body) = send(&app, post_json("/api/v1/screen", &placeholder.to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "UNSAFE_EXPRESSION");
    }

    #[tokio::test]
    async fn test_catalog_endpoints() {
        let (_dir, state) = seeded_state();
        let app = build_router(Arc::new(state));

        let (status, fields) = send(&app, get("/api/v1/fields")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(fields["fields"].as_array().unwrap().iter().any(|f| f["name"] == "rsi_14"));
        assert!(fields["timeframes"].as_array().unwrap().contains(&json!("1hr")));

        let (status, templates) = send(&app, get("/api/v1/templates")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!templates["templates"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_data_endpoints() {
        let (_dir, state) = seeded_state();
        let app = build_router(Arc::new(state));

        let (status, stats) = send(&app, get("/api/v1/stats/5min")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["data"]["symbol_count"], 3);

        let (status, body) = send(&app, get("/api/v1/stats/7min")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "UNKNOWN_TIMEFRAME");

        let (status, health) = send(&app, get("/api/v1/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["database"], "connected");

        let (status, info) = send(&app, get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(info["service"], "stock-screener");
    }

    #[tokio::test]
    async fn test_screen_rate_limit() {
        let (_dir, mut state) = seeded_state();
        state.config.screen_rate_limit = 1;
        let app = build_router(Arc::new(state));

        let body = json!({"timeframe": "5min", "filters": {"expression": "close > open"}}).to_string();
        let (status, _) = send(&app, post_json("/api/v1/screen", &body)).await;
        assert_eq!(status, StatusCode::OK);

        let response = app.clone().oneshot(post_json("/api/v1/screen", &body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("retry-after"));

        // metadata routes have their own bucket
        let (status, _) = send(&app, get("/api/v1/fields")).await;
        assert_eq!(status, StatusCode::OK);
    }
}
