//! Screener Service
//!
//! Validates a screen request, compiles it into one statement, runs it and
//! shapes the rows. Called by the REST API handlers.

use super::models::{ScreenerMetadata, ScreenerRequest, ScreenerResponse, TimeframeData};
use super::results::{pagination_info, ResultShaper};
use crate::catalog::Timeframe;
use crate::db::QueryExecutor;
use crate::error::{Result, ScreenerError};
use crate::query::{CompiledQuery, ScreenQuery};
use crate::state::AppState;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Screening service for business logic
pub struct ScreenerService;

impl ScreenerService {
    /// Run a screen end to end
    pub fn screen(state: &AppState, request: &ScreenerRequest) -> Result<ScreenerResponse> {
        let started = Instant::now();
        let request_id = Uuid::new_v4().to_string();

        let response = Self::run(state, request, &request_id, started);
        if let Err(e) = &response {
            error!(
                "ScreenerService::screen - request {} failed after {:.2}ms: {}",
                request_id,
                elapsed_ms(started),
                e
            );
        }
        response
    }

    /// Compile a request without executing it
    pub fn compile(state: &AppState, request: &ScreenerRequest) -> Result<CompiledQuery> {
        let timeframes = request.timeframe.to_vec();
        Self::validate(state, request, &timeframes)?;

        let units = request.filters.units();
        let query = ScreenQuery {
            timeframes: &timeframes,
            units: &units,
            logic: request.logic,
            grouping: request.grouping.unwrap_or_default(),
            sort: request.sort.as_deref().unwrap_or_default(),
            pagination: request.pagination,
            include_fundamentals: request.include_fundamentals(),
        };
        state.engine.compile_query(&query)
    }

    fn run(
        state: &AppState,
        request: &ScreenerRequest,
        request_id: &str,
        started: Instant,
    ) -> Result<ScreenerResponse> {
        let timeframes = request.timeframe.to_vec();
        info!(
            "ScreenerService::screen - request {} on {}",
            request_id,
            timeframes.iter().map(Timeframe::as_str).collect::<Vec<_>>().join(",")
        );

        let compiled = Self::compile(state, request)?;
        debug!(
            "ScreenerService::screen - {} parameters bound",
            compiled.params.len()
        );

        let units = request.filters.units();
        let rows = state.db.execute(&compiled.sql, &compiled.params)?;

        let primary = timeframes[0];
        let shaper = ResultShaper::new(state.engine.catalog(), primary, request.output.as_ref());
        let mut results = rows
            .iter()
            .map(|row| shaper.shape(row, &units))
            .collect::<Result<Vec<_>>>()?;

        let all_timeframes = request.output.as_ref().is_some_and(|o| o.include_all_timeframes);
        if all_timeframes && timeframes.len() > 1 {
            for result in &mut results {
                result.timeframe_data = Some(Self::additional_timeframes(
                    state,
                    &shaper,
                    &result.symbol,
                    &timeframes[1..],
                ));
            }
        }

        let execution_time_ms = elapsed_ms(started);
        info!(
            "ScreenerService::screen - request {} returned {} results in {:.2}ms",
            request_id,
            results.len(),
            execution_time_ms
        );

        Ok(ScreenerResponse {
            status: "success",
            metadata: ScreenerMetadata {
                request_id: request_id.to_string(),
                total_results: results.len(),
                execution_time_ms,
                filters_applied: request.filters.counts(),
                query_complexity: state.engine.estimate_complexity(&units),
                cache_hit: false,
            },
            pagination: pagination_info(request.pagination.as_ref(), results.len()),
            results,
        })
    }

    fn validate(state: &AppState, request: &ScreenerRequest, timeframes: &[Timeframe]) -> Result<()> {
        if timeframes.is_empty() {
            return Err(ScreenerError::InvalidRequest(
                "At least one timeframe must be provided".to_string(),
            ));
        }
        let max = state.config.max_timeframes;
        if timeframes.len() > max {
            return Err(ScreenerError::InvalidRequest(format!(
                "Maximum {} timeframes allowed",
                max
            )));
        }
        if request.filters.is_empty() {
            return Err(ScreenerError::InvalidRequest(
                "At least one filter must be provided".to_string(),
            ));
        }
        Ok(())
    }

    /// Latest bar of each additional timeframe; failures are logged and skipped
    fn additional_timeframes(
        state: &AppState,
        shaper: &ResultShaper<'_>,
        symbol: &str,
        timeframes: &[Timeframe],
    ) -> Vec<TimeframeData> {
        timeframes
            .iter()
            .filter_map(|&timeframe| {
                let snapshot = state.engine.symbol_snapshot(timeframe, symbol);
                match state.db.execute(&snapshot.sql, &snapshot.params) {
                    Ok(rows) => rows.first().map(|row| shaper.timeframe_data(timeframe, row)),
                    Err(e) => {
                        warn!(
                            "ScreenerService::screen - failed to fetch {} data for {}: {}",
                            timeframe, symbol, e
                        );
                        None
                    }
                }
            })
            .collect()
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::seeded_state;
    use crate::query::{Complexity, Pagination};
    use serde_json::{json, Value};

    fn request(body: Value) -> ScreenerRequest {
        serde_json::from_value(body).unwrap()
    }

    fn symbols(response: &ScreenerResponse) -> Vec<&str> {
        response.results.iter().map(|r| r.symbol.as_str()).collect()
    }

    #[test]
    fn test_simple_filter_on_latest_bar() {
        let (_dir, state) = seeded_state();
        let response = ScreenerService::screen(
            &state,
            &request(json!({
                "timeframe": "5min",
                "filters": {"simple": [{"field": "rsi_14", "operator": "gt", "value": 60}]}
            })),
        )
        .unwrap();

        // default order is volume descending
        assert_eq!(symbols(&response), vec!["SBIN", "TCS"]);
        assert_eq!(response.status, "success");
        assert_eq!(response.metadata.total_results, 2);
        assert_eq!(response.metadata.query_complexity, Complexity::Low);
        assert_eq!(response.metadata.filters_applied["simple"], 1);
        assert!(response.pagination.is_none());

        let sbin = &response.results[0];
        assert_eq!(sbin.primary_datetime, crate::db::fixtures::LATEST_5MIN);
        assert_eq!(sbin.indicators["rsi_14"], 65.0);
        assert!(sbin.match_reasons.is_none());
    }

    #[test]
    fn test_fundamentals_with_simple() {
        let (_dir, state) = seeded_state();
        let response = ScreenerService::screen(
            &state,
            &request(json!({
                "timeframe": "5min",
                "filters": {
                    "simple": [{"field": "market_cap", "operator": "gt", "value": 1000000000}],
                    "fundamentals": [{"field": "trailing_pe", "operator": "between", "value": [5, 25]}]
                },
                "output": {"include_fundamentals": true}
            })),
        )
        .unwrap();

        assert_eq!(symbols(&response), vec!["SBIN"]);
        let fundamentals = response.results[0].fundamentals.as_ref().unwrap();
        assert_eq!(fundamentals["trailing_pe"], json!(10.0));

        let reasons = response.results[0].match_reasons.as_ref().unwrap();
        assert_eq!(reasons.len(), 2);
        assert_eq!(reasons[1].filter_type, "fundamentals");
    }

    #[test]
    fn test_expression_and_sort() {
        let (_dir, state) = seeded_state();
        let response = ScreenerService::screen(
            &state,
            &request(json!({
                "timeframe": "5min",
                "filters": {"expression": "close > sma_50"},
                "sort": [{"field": "close", "direction": "asc"}]
            })),
        )
        .unwrap();
        assert_eq!(symbols(&response), vec!["SBIN", "TCS"]);
    }

    #[test]
    fn test_template_filter() {
        let (_dir, state) = seeded_state();
        let response = ScreenerService::screen(
            &state,
            &request(json!({
                "timeframe": "5min",
                "filters": {"templates": [{"name": "high_volume", "params": {"multiplier": 1.5}}]}
            })),
        )
        .unwrap();
        assert_eq!(symbols(&response), vec!["SBIN"]);
    }

    #[test]
    fn test_multi_timeframe_filter() {
        let (_dir, state) = seeded_state();
        let response = ScreenerService::screen(
            &state,
            &request(json!({
                "timeframe": "5min",
                "filters": {
                    "multi_timeframe": [{
                        "conditions": [{"field": "rsi_14", "operator": "lt", "value": 50, "timeframe": "1hr"}]
                    }]
                }
            })),
        )
        .unwrap();
        assert_eq!(symbols(&response), vec!["INFY"]);
        assert_eq!(response.metadata.query_complexity, Complexity::Medium);
    }

    #[test]
    fn test_additional_timeframe_data() {
        let (_dir, state) = seeded_state();
        let response = ScreenerService::screen(
            &state,
            &request(json!({
                "timeframe": ["5min", "1hr"],
                "filters": {"simple": [{"field": "close", "operator": "lt", "value": 1000}]},
                "output": {"include_all_timeframes": true, "include_metadata": false}
            })),
        )
        .unwrap();

        assert_eq!(symbols(&response), vec!["SBIN"]);
        let data = response.results[0].timeframe_data.as_ref().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].timeframe, Timeframe::OneHour);
        assert_eq!(data[0].close, Some(605.0));
        assert_eq!(data[0].indicators["rsi_14"], 60.0);
    }

    #[test]
    fn test_pagination() {
        let (_dir, state) = seeded_state();
        let mut req = request(json!({
            "timeframe": "5min",
            "filters": {"simple": [{"field": "close", "operator": "gt", "value": 0}]}
        }));
        req.pagination = Some(Pagination { limit: 2, offset: 0 });

        let first = ScreenerService::screen(&state, &req).unwrap();
        assert_eq!(symbols(&first), vec!["SBIN", "INFY"]);
        assert!(first.pagination.unwrap().has_next);

        req.pagination = Some(Pagination { limit: 2, offset: 2 });
        let second = ScreenerService::screen(&state, &req).unwrap();
        assert_eq!(symbols(&second), vec!["TCS"]);
        let info = second.pagination.unwrap();
        assert_eq!(info.current_page, 2);
        assert!(!info.has_next);
        assert!(info.has_previous);
    }

    #[test]
    fn test_request_validation() {
        let (_dir, state) = seeded_state();

        let empty = request(json!({"timeframe": "5min", "filters": {}}));
        assert!(matches!(
            ScreenerService::screen(&state, &empty),
            Err(ScreenerError::InvalidRequest(_))
        ));

        let too_many = request(json!({
            "timeframe": ["1min", "3min", "5min", "15min", "30min", "1hr"],
            "filters": {"expression": "close > open"}
        }));
        assert!(matches!(
            ScreenerService::screen(&state, &too_many),
            Err(ScreenerError::InvalidRequest(msg)) if msg.contains('5')
        ));

        let over_limit = request(json!({
            "timeframe": "5min",
            "filters": {"expression": "close > open"},
            "pagination": {"limit": 50000}
        }));
        assert!(matches!(
            ScreenerService::screen(&state, &over_limit),
            Err(ScreenerError::LimitExceeded { requested: 50000, max: 10000 })
        ));
    }

    #[test]
    fn test_compile_errors_surface_unchanged() {
        let (_dir, state) = seeded_state();
        let unsafe_expr = request(json!({
            "timeframe": "5min",
            "filters": {"expression": "DROP TABLE users; --"}
        }));
        assert!(matches!(
            ScreenerService::screen(&state, &unsafe_expr),
            Err(ScreenerError::UnsafeExpression(_))
        ));

        let unknown = request(json!({
            "timeframe": "5min",
            "filters": {"templates": [{"name": "moon_shot"}]}
        }));
        assert!(matches!(
            ScreenerService::screen(&state, &unknown),
            Err(ScreenerError::UnknownTemplate(_))
        ));
    }
}
