//! Filter units and the request pieces the assembler consumes

use super::fragment::SqlValue;
use crate::catalog::{Operator, Timeframe};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Boolean connective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Logic {
    #[default]
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl Logic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Logic::And => "AND",
            Logic::Or => "OR",
        }
    }

    /// Separator used when joining fragments, e.g. `" AND "`
    pub fn separator(&self) -> &'static str {
        match self {
            Logic::And => " AND ",
            Logic::Or => " OR ",
        }
    }
}

/// Right-hand side of a value comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    List(Vec<SqlValue>),
    Scalar(SqlValue),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Scalar(v) => write!(f, "{}", v),
            FilterValue::List(values) => {
                let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

/// Single field comparison, used by simple, fundamentals and
/// multi-timeframe filters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCondition {
    pub field: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Option<FilterValue>,
    /// Compare against another field instead of a value
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub multiplier: Option<f64>,
    #[serde(default)]
    pub timeframe: Option<Timeframe>,
    #[serde(default)]
    pub description: Option<String>,
}

impl FieldCondition {
    pub fn new(field: &str, operator: Operator, value: Option<FilterValue>) -> Self {
        Self {
            field: field.to_string(),
            operator,
            value,
            reference: None,
            multiplier: None,
            timeframe: None,
            description: None,
        }
    }

    pub fn with_reference(mut self, reference: &str, multiplier: Option<f64>) -> Self {
        self.reference = Some(reference.to_string());
        self.multiplier = multiplier;
        self
    }

    pub fn on_timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = Some(timeframe);
        self
    }

    /// Human-readable rendering, e.g. `rsi_14 gt 60`
    pub fn describe(&self) -> String {
        if let Some(description) = &self.description {
            return description.clone();
        }
        match (&self.value, &self.reference) {
            (_, Some(reference)) => match self.multiplier {
                Some(m) if m != 1.0 => format!("{} {} {} * {}", self.field, self.operator, reference, m),
                _ => format!("{} {} {}", self.field, self.operator, reference),
            },
            (Some(value), None) => format!("{} {} {}", self.field, self.operator, value),
            (None, None) => format!("{} {}", self.field, self.operator),
        }
    }
}

/// Conditions evaluated on their own timeframes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiTimeframeFilter {
    pub conditions: Vec<FieldCondition>,
    #[serde(default)]
    pub logic: Logic,
    #[serde(default)]
    pub description: Option<String>,
}

/// Reference to a named template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateFilter {
    pub name: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub timeframe: Option<Timeframe>,
}

impl TemplateFilter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: Map::new(),
            timeframe: None,
        }
    }
}

/// One screening constraint
#[derive(Debug, Clone, PartialEq)]
pub enum FilterUnit {
    Simple(FieldCondition),
    Fundamentals(FieldCondition),
    MultiTimeframe(MultiTimeframeFilter),
    Expression(String),
    Template(TemplateFilter),
}

impl FilterUnit {
    pub fn category(&self) -> FilterCategory {
        match self {
            FilterUnit::Simple(_) => FilterCategory::Simple,
            FilterUnit::Fundamentals(_) => FilterCategory::Fundamentals,
            FilterUnit::MultiTimeframe(_) => FilterCategory::MultiTimeframe,
            FilterUnit::Expression(_) => FilterCategory::Expression,
            FilterUnit::Template(_) => FilterCategory::Templates,
        }
    }
}

/// Grouping bucket of a filter unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterCategory {
    Simple,
    Expression,
    Templates,
    Fundamentals,
    MultiTimeframe,
}

impl FilterCategory {
    pub const ALL: [FilterCategory; 5] = [
        FilterCategory::Simple,
        FilterCategory::Expression,
        FilterCategory::Templates,
        FilterCategory::Fundamentals,
        FilterCategory::MultiTimeframe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterCategory::Simple => "simple",
            FilterCategory::Expression => "expression",
            FilterCategory::Templates => "templates",
            FilterCategory::Fundamentals => "fundamentals",
            FilterCategory::MultiTimeframe => "multi_timeframe",
        }
    }
}

/// Per-category combination logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grouping {
    #[serde(default)]
    pub simple_logic: Logic,
    #[serde(default)]
    pub expression_logic: Logic,
    #[serde(default = "default_template_logic")]
    pub template_logic: Logic,
    #[serde(default)]
    pub fundamentals_logic: Logic,
    #[serde(default)]
    pub multi_timeframe_logic: Logic,
}

fn default_template_logic() -> Logic {
    Logic::Or
}

impl Default for Grouping {
    fn default() -> Self {
        Self {
            simple_logic: Logic::And,
            expression_logic: Logic::And,
            template_logic: Logic::Or,
            fundamentals_logic: Logic::And,
            multi_timeframe_logic: Logic::And,
        }
    }
}

impl Grouping {
    pub fn logic_for(&self, category: FilterCategory) -> Logic {
        match category {
            FilterCategory::Simple => self.simple_logic,
            FilterCategory::Expression => self.expression_logic,
            FilterCategory::Templates => self.template_logic,
            FilterCategory::Fundamentals => self.fundamentals_logic,
            FilterCategory::MultiTimeframe => self.multi_timeframe_logic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
    #[serde(default)]
    pub timeframe: Option<Timeframe>,
}

impl SortSpec {
    pub fn new(field: &str, direction: SortDirection) -> Self {
        Self {
            field: field.to_string(),
            direction,
            timeframe: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    100
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}
