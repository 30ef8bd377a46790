//! Result shaping
//!
//! Turns flat result rows into [`StockResult`] entities, grouping columns by
//! the catalog table they come from.

use super::models::{MatchReason, OutputConfig, PaginationInfo, StockResult, TimeframeData};
use crate::catalog::{Catalog, SourceTable, Timeframe};
use crate::db::ResultRow;
use crate::error::{Result, ScreenerError};
use crate::query::{FieldCondition, FilterUnit, Pagination};
use serde_json::Value;
use std::collections::BTreeMap;

const OHLCV: [&str; 5] = ["open", "high", "low", "close", "volume"];

pub struct ResultShaper<'a> {
    catalog: &'a Catalog,
    primary: Timeframe,
    output: Option<&'a OutputConfig>,
}

impl<'a> ResultShaper<'a> {
    pub fn new(catalog: &'a Catalog, primary: Timeframe, output: Option<&'a OutputConfig>) -> Self {
        Self {
            catalog,
            primary,
            output,
        }
    }

    pub fn shape(&self, row: &ResultRow, units: &[FilterUnit]) -> Result<StockResult> {
        let symbol = row
            .get_str("symbol")
            .ok_or_else(|| ScreenerError::Internal("result row has no symbol".to_string()))?;

        let mut result = StockResult {
            symbol: symbol.to_string(),
            primary_timeframe: self.primary,
            primary_datetime: row.get_str("datetime").unwrap_or_default().to_string(),
            open: row.get_f64("open"),
            high: row.get_f64("high"),
            low: row.get_f64("low"),
            close: row.get_f64("close"),
            volume: row.get_f64("volume"),
            indicators: self.indicators(row),
            fundamentals: None,
            timeframe_data: None,
            match_reasons: None,
        };

        if let Some(output) = self.output {
            if output.include_fundamentals {
                result.fundamentals = self.fundamentals(row);
            }
            if output.include_metadata {
                result.match_reasons = Some(self.match_reasons(row, units));
            }
            if let Some(fields) = &output.fields {
                select_fields(&mut result, fields);
            }
        }

        Ok(result)
    }

    /// Latest bar of an additional timeframe
    pub fn timeframe_data(&self, timeframe: Timeframe, row: &ResultRow) -> TimeframeData {
        TimeframeData {
            timeframe,
            datetime: row.get_str("datetime").unwrap_or_default().to_string(),
            close: row.get_f64("close"),
            volume: row.get_f64("volume"),
            indicators: self.indicators(row),
        }
    }

    /// Non-null indicator-table columns
    fn indicators(&self, row: &ResultRow) -> BTreeMap<String, f64> {
        row.iter()
            .filter(|(name, _)| {
                self.catalog
                    .get(name)
                    .is_some_and(|f| f.source_table == SourceTable::Indicators)
            })
            .filter_map(|(name, value)| value.as_f64().map(|v| (name.to_string(), v)))
            .collect()
    }

    /// Non-null fundamentals columns plus `updated_at`; `None` when the
    /// symbol has no fundamentals row
    fn fundamentals(&self, row: &ResultRow) -> Option<BTreeMap<String, Value>> {
        let values: BTreeMap<String, Value> = row
            .iter()
            .filter(|(name, _)| {
                *name == "updated_at"
                    || self
                        .catalog
                        .get(name)
                        .is_some_and(|f| f.source_table == SourceTable::Fundamentals)
            })
            .filter(|(_, value)| !value.is_null())
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();

        (!values.is_empty()).then_some(values)
    }

    fn match_reasons(&self, row: &ResultRow, units: &[FilterUnit]) -> Vec<MatchReason> {
        units
            .iter()
            .map(|unit| match unit {
                FilterUnit::Simple(cond) => {
                    let timeframe = cond.timeframe.unwrap_or(self.primary);
                    // Row values are from the primary timeframe only
                    let value = if timeframe == self.primary || self.is_fundamental(cond) {
                        row.get_f64(&cond.field)
                    } else {
                        None
                    };
                    MatchReason {
                        filter_type: "simple",
                        description: cond.describe(),
                        value,
                        timeframe: Some(timeframe),
                    }
                }
                FilterUnit::Fundamentals(cond) => MatchReason {
                    filter_type: "fundamentals",
                    description: cond.describe(),
                    value: row.get_f64(&cond.field),
                    timeframe: None,
                },
                FilterUnit::Expression(expr) => MatchReason {
                    filter_type: "expression",
                    description: format!("Expression: {}", expr),
                    value: None,
                    timeframe: Some(self.primary),
                },
                FilterUnit::Template(template) => MatchReason {
                    filter_type: "template",
                    description: format!("Template: {}", template.name),
                    value: None,
                    timeframe: Some(template.timeframe.unwrap_or(self.primary)),
                },
                FilterUnit::MultiTimeframe(filter) => {
                    let description = filter.description.clone().unwrap_or_else(|| {
                        filter
                            .conditions
                            .iter()
                            .map(|c| {
                                format!("{} ({})", c.describe(), c.timeframe.unwrap_or(self.primary))
                            })
                            .collect::<Vec<_>>()
                            .join(filter.logic.separator())
                    });
                    MatchReason {
                        filter_type: "multi_timeframe",
                        description,
                        value: None,
                        timeframe: None,
                    }
                }
            })
            .collect()
    }

    fn is_fundamental(&self, cond: &FieldCondition) -> bool {
        self.catalog
            .get(&cond.field)
            .is_some_and(|f| f.source_table == SourceTable::Fundamentals)
    }
}

/// Keep only the listed indicators; OHLCV values not listed are cleared
fn select_fields(result: &mut StockResult, fields: &[String]) {
    let listed = |name: &str| fields.iter().any(|f| f == name);

    result.indicators.retain(|name, _| listed(name));
    for (name, slot) in OHLCV.iter().zip([
        &mut result.open,
        &mut result.high,
        &mut result.low,
        &mut result.close,
        &mut result.volume,
    ]) {
        if !listed(name) {
            *slot = None;
        }
    }
}

/// Page info from what the query returned; the total row count is not
/// queried, so `has_next` assumes more rows when the page came back full
pub fn pagination_info(pagination: Option<&Pagination>, returned: usize) -> Option<PaginationInfo> {
    let pagination = pagination?;
    let limit = pagination.limit.max(1);
    let current_page = (pagination.offset / limit).saturating_add(1);
    let has_next = returned >= limit as usize;

    Some(PaginationInfo {
        current_page,
        total_pages: current_page.saturating_add(u32::from(has_next)),
        has_next,
        has_previous: pagination.offset > 0,
    })
}
