//! Field catalog
//!
//! The catalog is the single source of truth for which columns a screen may
//! reference and which table each column lives in. It is built once at
//! startup and shared read-only (`Arc<Catalog>`) by every component.

mod fields;
pub mod operator;
pub mod timeframe;

pub use operator::{Operator, OperatorArity};
pub use timeframe::Timeframe;

use crate::error::{Result, ScreenerError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column value type as declared in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Float,
    Int,
    String,
}

/// Table a catalog field is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTable {
    Candles,
    Indicators,
    Fundamentals,
}

impl SourceTable {
    /// Alias the base query gives this table
    pub fn alias(&self) -> &'static str {
        match self {
            SourceTable::Candles => "c",
            SourceTable::Indicators => "i",
            SourceTable::Fundamentals => "f",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTable::Candles => "candles",
            SourceTable::Indicators => "indicators",
            SourceTable::Fundamentals => "fundamentals",
        }
    }
}

/// A single screenable column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub semantic_type: SemanticType,
    #[serde(rename = "table")]
    pub source_table: SourceTable,
}

impl FieldDescriptor {
    pub fn new(name: &str, semantic_type: SemanticType, source_table: SourceTable) -> Self {
        Self {
            name: name.to_string(),
            semantic_type,
            source_table,
        }
    }

    /// Field reference qualified with its base-query table alias, e.g. `i.rsi_14`
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.source_table.alias(), self.name)
    }
}

/// Immutable field catalog, in declaration order
#[derive(Debug, Clone)]
pub struct Catalog {
    fields: Vec<FieldDescriptor>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// The standard OHLCV + indicators + fundamentals catalog
    pub fn standard() -> Self {
        Self::from_fields(fields::standard_fields())
    }

    /// Build a catalog from descriptors; the first occurrence of a name wins
    pub fn from_fields(descriptors: Vec<FieldDescriptor>) -> Self {
        let mut fields = Vec::with_capacity(descriptors.len());
        let mut index = HashMap::with_capacity(descriptors.len());

        for descriptor in descriptors {
            if index.contains_key(&descriptor.name) {
                tracing::warn!("Duplicate catalog field ignored: {}", descriptor.name);
                continue;
            }
            index.insert(descriptor.name.clone(), fields.len());
            fields.push(descriptor);
        }

        Self { fields, index }
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    /// Look up a field, failing with `UnknownField`
    pub fn lookup(&self, name: &str) -> Result<&FieldDescriptor> {
        self.get(name)
            .ok_or_else(|| ScreenerError::UnknownField(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Fields of one source table, in declaration order
    pub fn fields_in(&self, table: SourceTable) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(move |f| f.source_table == table)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}
