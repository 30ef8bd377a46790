//! Request rate caps so screens cannot monopolize the database pool
//!
//! Screens are the expensive route and get their own bucket
//! (`screen_rate_limit`); catalog, statistics and health requests share
//! `api_rate_limit`. Rejected requests get a 429 with `Retry-After`.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Rate limit class for different endpoint categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitType {
    /// Screen execution
    Screen,
    /// Fields, templates, statistics, health
    Metadata,
}

impl RateLimitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitType::Screen => "screen",
            RateLimitType::Metadata => "metadata",
        }
    }
}

/// Token bucket rate limiter
#[derive(Debug)]
pub struct TokenBucket {
    /// Maximum tokens (requests) allowed per period
    capacity: u32,
    tokens: f64,
    /// Tokens added per second
    refill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(rate_per_second: u32) -> Self {
        Self {
            capacity: rate_per_second,
            tokens: f64::from(rate_per_second),
            refill_rate: f64::from(rate_per_second),
            last_refill: Instant::now(),
        }
    }

    /// Try to consume a token, returns true if allowed
    pub fn try_acquire(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);
        let refill_amount = elapsed.as_secs_f64() * self.refill_rate;

        self.tokens = (self.tokens + refill_amount).min(f64::from(self.capacity));
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Time until a token will be available
    pub fn time_until_available(&self) -> Duration {
        if self.tokens >= 1.0 || self.refill_rate <= 0.0 {
            Duration::ZERO
        } else {
            let tokens_needed = 1.0 - self.tokens;
            Duration::from_secs_f64(tokens_needed / self.refill_rate)
        }
    }
}

/// Shared rate limiter state
#[derive(Debug)]
pub struct RateLimiterState {
    limiters: Mutex<HashMap<RateLimitType, TokenBucket>>,
}

impl RateLimiterState {
    pub fn new(screen_rate: u32, api_rate: u32) -> Self {
        let mut limiters = HashMap::new();
        limiters.insert(RateLimitType::Screen, TokenBucket::new(screen_rate));
        limiters.insert(RateLimitType::Metadata, TokenBucket::new(api_rate));

        Self {
            limiters: Mutex::new(limiters),
        }
    }

    /// Try to acquire a token for the given rate limit type
    pub fn try_acquire(&self, rate_type: RateLimitType) -> bool {
        let mut limiters = self.limiters.lock();
        match limiters.get_mut(&rate_type) {
            Some(limiter) => limiter.try_acquire(),
            None => true,
        }
    }

    pub fn time_until_available(&self, rate_type: RateLimitType) -> Duration {
        let limiters = self.limiters.lock();
        limiters
            .get(&rate_type)
            .map(TokenBucket::time_until_available)
            .unwrap_or(Duration::ZERO)
    }
}

/// Route class of a request path
pub fn get_rate_limit_type(path: &str) -> RateLimitType {
    if path.starts_with("/api/v1/screen") {
        RateLimitType::Screen
    } else {
        RateLimitType::Metadata
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(state): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let rate_type = get_rate_limit_type(request.uri().path());

    if !state.try_acquire(rate_type) {
        let wait_time = state.time_until_available(rate_type);
        tracing::warn!(
            "Rate limit exceeded for {}, path: {}, retry after {}ms",
            rate_type.as_str(),
            request.uri().path(),
            wait_time.as_millis()
        );
        return rate_limit_response(wait_time, rate_type);
    }

    next.run(request).await
}

/// 429 with `Retry-After` in whole seconds
fn rate_limit_response(retry_after: Duration, rate_type: RateLimitType) -> Response {
    let retry_seconds = retry_after.as_secs_f64().ceil().max(1.0) as u64;

    let body = Json(json!({
        "status": "error",
        "code": "RATE_LIMIT_EXCEEDED",
        "message": format!(
            "Rate limit exceeded for {}. Please retry after {} seconds.",
            rate_type.as_str(),
            retry_seconds
        ),
    }));

    let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
    let headers = response.headers_mut();
    headers.insert("Retry-After", HeaderValue::from(retry_seconds));
    headers.insert("X-RateLimit-Type", HeaderValue::from_static(rate_type.as_str()));
    response
}
