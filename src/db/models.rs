//! Database row models

use crate::catalog::Timeframe;
use serde::Serialize;
use serde_json::Value;

/// One result row: column name to value, in select-list order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultRow {
    values: Vec<(String, Value)>,
}

impl ResultRow {
    pub fn new(values: Vec<(String, Value)>) -> Self {
        Self { values }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.iter().find(|(name, _)| name == column).map(|(_, v)| v)
    }

    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }

    pub fn get_f64(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(Value::as_f64)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, v)| (name.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Record counts and date range of one candle table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataStatistics {
    pub timeframe: Timeframe,
    pub total_records: i64,
    pub symbol_count: i64,
    pub earliest_date: Option<String>,
    pub latest_date: Option<String>,
}
