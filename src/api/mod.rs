//! REST API server module
//!
//! Provides:
//! - Screening (`POST /api/v1/screen`)
//! - Catalog listings (`GET /api/v1/fields`, `GET /api/v1/templates`)
//! - Data statistics and health (`GET /api/v1/stats/:timeframe`, `GET /api/v1/health`)
//!
//! Errors are returned as `{status: "error", code, message}`: request and
//! compile errors map to 400, execution faults to 500, rate limiting to 429.

mod server;
pub mod handlers;
mod rate_limiter;
mod types;

pub use rate_limiter::{RateLimitType, RateLimiterState};
pub use server::{build_router, ApiServer};
pub use types::{ApiError, ApiResponse, ServiceInfo};
