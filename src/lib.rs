//! Stock Screener - parameterized screening queries
//!
//! Compiles declarative screens (simple conditions, free-form expressions,
//! templates, fundamentals and multi-timeframe filters) into a single
//! parameterized SQL statement over candle, indicator and fundamentals
//! tables, runs it on a pooled SQLite connection and shapes the rows.

pub mod api;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod query;
pub mod services;
pub mod state;

pub use config::ScreenerConfig;
pub use error::{Result, ScreenerError};
pub use state::AppState;
