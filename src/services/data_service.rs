//! Data Service
//!
//! Coverage statistics for the candle tables and the health probe.

use super::models::HealthResponse;
use crate::catalog::Timeframe;
use crate::db::DataStatistics;
use crate::error::Result;
use crate::state::AppState;
use tracing::{info, warn};

pub struct DataService;

impl DataService {
    /// Record and symbol counts with the date range of one timeframe
    pub fn data_statistics(state: &AppState, timeframe: &str) -> Result<DataStatistics> {
        let timeframe: Timeframe = timeframe.parse()?;
        let stats = state.db.data_statistics(timeframe)?;
        info!(
            "DataService::data_statistics - {}: {} records, {} symbols",
            timeframe, stats.total_records, stats.symbol_count
        );
        Ok(stats)
    }

    pub fn available_symbols(state: &AppState, timeframe: &str) -> Result<Vec<String>> {
        let timeframe: Timeframe = timeframe.parse()?;
        state.db.available_symbols(timeframe)
    }

    pub fn health(state: &AppState) -> HealthResponse {
        let (status, database) = match state.db.health_check() {
            Ok(()) => ("healthy", "connected"),
            Err(e) => {
                warn!("DataService::health - database check failed: {}", e);
                ("unhealthy", "disconnected")
            }
        };

        HealthResponse {
            status,
            database,
            timestamp: chrono::Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
