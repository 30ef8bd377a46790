//! Screen request and response models

use crate::catalog::{FieldDescriptor, Operator, SemanticType, SourceTable, Timeframe};
use crate::error::{Result as ScreenerResult, ScreenerError};
use crate::query::{
    Complexity, FieldCondition, FilterCategory, FilterUnit, Grouping, Logic, MultiTimeframeFilter,
    Pagination, SortSpec, TemplateFilter, TemplateInfo,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Treat an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Request
// ============================================================================

/// One timeframe or an ordered list; the first entry is primary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TimeframeSpec {
    One(Timeframe),
    Many(Vec<Timeframe>),
}

// Names are parsed after the shape is known so an unknown timeframe keeps
// its own error instead of an untagged-enum mismatch
impl<'de> Deserialize<'de> for TimeframeSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Names {
            One(String),
            Many(Vec<String>),
        }

        let parse = |name: String| -> Result<Timeframe, D::Error> {
            name.parse().map_err(serde::de::Error::custom)
        };
        match Names::deserialize(deserializer)? {
            Names::One(name) => parse(name).map(TimeframeSpec::One),
            Names::Many(names) => names
                .into_iter()
                .map(parse)
                .collect::<Result<Vec<_>, _>>()
                .map(TimeframeSpec::Many),
        }
    }
}

impl TimeframeSpec {
    pub fn to_vec(&self) -> Vec<Timeframe> {
        match self {
            TimeframeSpec::One(tf) => vec![*tf],
            TimeframeSpec::Many(tfs) => tfs.clone(),
        }
    }
}

/// Filters by category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FiltersConfig {
    #[serde(default, deserialize_with = "null_as_default")]
    pub simple: Vec<FieldCondition>,
    #[serde(default)]
    pub expression: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub templates: Vec<TemplateFilter>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fundamentals: Vec<FieldCondition>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub multi_timeframe: Vec<MultiTimeframeFilter>,
}

impl FiltersConfig {
    fn expression(&self) -> Option<&str> {
        self.expression.as_deref().filter(|e| !e.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.simple.is_empty()
            && self.expression().is_none()
            && self.templates.is_empty()
            && self.fundamentals.is_empty()
            && self.multi_timeframe.is_empty()
    }

    /// Filter units in category order: simple, expression, templates,
    /// fundamentals, multi_timeframe
    pub fn units(&self) -> Vec<FilterUnit> {
        let mut units = Vec::new();
        units.extend(self.simple.iter().cloned().map(FilterUnit::Simple));
        units.extend(self.expression().map(|e| FilterUnit::Expression(e.to_string())));
        units.extend(self.templates.iter().cloned().map(FilterUnit::Template));
        units.extend(self.fundamentals.iter().cloned().map(FilterUnit::Fundamentals));
        units.extend(self.multi_timeframe.iter().cloned().map(FilterUnit::MultiTimeframe));
        units
    }

    /// Number of filters per category, every category present
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        FilterCategory::ALL
            .iter()
            .map(|category| {
                let count = match category {
                    FilterCategory::Simple => self.simple.len(),
                    FilterCategory::Expression => usize::from(self.expression().is_some()),
                    FilterCategory::Templates => self.templates.len(),
                    FilterCategory::Fundamentals => self.fundamentals.len(),
                    FilterCategory::MultiTimeframe => self.multi_timeframe.len(),
                };
                (category.as_str(), count)
            })
            .collect()
    }
}

fn default_true() -> bool {
    true
}

/// Output shaping options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Keep only these indicator/OHLCV fields
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    #[serde(default)]
    pub include_fundamentals: bool,
    #[serde(default)]
    pub include_all_timeframes: bool,
    #[serde(default = "default_true")]
    pub include_metadata: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            fields: None,
            include_fundamentals: false,
            include_all_timeframes: false,
            include_metadata: true,
        }
    }
}

/// Screen request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenerRequest {
    pub timeframe: TimeframeSpec,
    pub filters: FiltersConfig,
    #[serde(default)]
    pub logic: Logic,
    #[serde(default)]
    pub grouping: Option<Grouping>,
    #[serde(default)]
    pub sort: Option<Vec<SortSpec>>,
    #[serde(default)]
    pub output: Option<OutputConfig>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
    #[serde(default)]
    pub require_fundamentals: bool,
}

impl ScreenerRequest {
    pub fn new(timeframe: Timeframe, filters: FiltersConfig) -> Self {
        Self {
            timeframe: TimeframeSpec::One(timeframe),
            filters,
            logic: Logic::And,
            grouping: None,
            sort: None,
            output: None,
            pagination: None,
            require_fundamentals: false,
        }
    }

    pub fn include_fundamentals(&self) -> bool {
        self.require_fundamentals || self.output.as_ref().is_some_and(|o| o.include_fundamentals)
    }

    /// Decode a request body, keeping catalog lookup failures distinct from
    /// malformed JSON
    pub fn from_json(body: Value) -> ScreenerResult<Self> {
        serde_json::from_value(body).map_err(|e| {
            let message = e.to_string();
            if let Some(name) = message.strip_prefix("Unknown timeframe: ") {
                ScreenerError::UnknownTimeframe(name.to_string())
            } else if let Some(name) = message.strip_prefix("Unsupported operator: ") {
                ScreenerError::UnsupportedOperator(name.to_string())
            } else {
                ScreenerError::InvalidRequest(message)
            }
        })
    }
}

// ============================================================================
// Response
// ============================================================================

/// Why a row matched one filter unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchReason {
    pub filter_type: &'static str,
    pub description: String,
    pub value: Option<f64>,
    pub timeframe: Option<Timeframe>,
}

/// Latest bar of one additional timeframe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeframeData {
    pub timeframe: Timeframe,
    pub datetime: String,
    pub close: Option<f64>,
    pub volume: Option<f64>,
    pub indicators: BTreeMap<String, f64>,
}

/// One screened instrument
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockResult {
    pub symbol: String,
    pub primary_timeframe: Timeframe,
    pub primary_datetime: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
    pub indicators: BTreeMap<String, f64>,
    pub fundamentals: Option<BTreeMap<String, Value>>,
    pub timeframe_data: Option<Vec<TimeframeData>>,
    pub match_reasons: Option<Vec<MatchReason>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenerMetadata {
    pub request_id: String,
    pub total_results: usize,
    pub execution_time_ms: f64,
    pub filters_applied: BTreeMap<&'static str, usize>,
    pub query_complexity: Complexity,
    pub cache_hit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationInfo {
    pub current_page: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenerResponse {
    pub status: &'static str,
    pub metadata: ScreenerMetadata,
    pub results: Vec<StockResult>,
    pub pagination: Option<PaginationInfo>,
}

// ============================================================================
// Metadata endpoints
// ============================================================================

/// Catalog field as listed to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub semantic_type: SemanticType,
    pub table: SourceTable,
    pub description: String,
}

impl From<&FieldDescriptor> for FieldInfo {
    fn from(field: &FieldDescriptor) -> Self {
        Self {
            name: field.name.clone(),
            semantic_type: field.semantic_type,
            table: field.source_table,
            description: title_case(&field.name),
        }
    }
}

/// `"volume_sma_20"` -> `"Volume Sma 20"`
fn title_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailableFieldsResponse {
    pub status: &'static str,
    pub fields: Vec<FieldInfo>,
    pub timeframes: Vec<Timeframe>,
    pub operators: Vec<Operator>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailableTemplatesResponse {
    pub status: &'static str,
    pub templates: Vec<TemplateInfo>,
    pub categories: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub timestamp: String,
    pub version: &'static str,
}
