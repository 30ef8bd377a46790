//! Services Layer
//!
//! Business logic called by the REST API handlers. Services are blocking;
//! handlers run them on the blocking pool.
//!
//! # Architecture
//!
//! ```text
//! REST API --> Services --> QueryEngine (compile)
//!                       └-> ScreenerDb  (execute)
//! ```
//!
//! # Services
//!
//! - `ScreenerService` - Validate, compile and run a screen
//! - `CatalogService` - Fields, timeframes, operators, templates
//! - `DataService` - Table statistics, symbols, health

pub mod models;
pub mod results;

pub mod screener_service;
pub mod catalog_service;
pub mod data_service;

// Re-export commonly used types and services
pub use models::{
    AvailableFieldsResponse, AvailableTemplatesResponse, FiltersConfig, HealthResponse,
    OutputConfig, ScreenerRequest, ScreenerResponse, StockResult, TimeframeSpec,
};
pub use screener_service::ScreenerService;
pub use catalog_service::CatalogService;
pub use data_service::DataService;
