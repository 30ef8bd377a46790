//! Query construction engine
//!
//! Turns a declarative screen into one parameterized SQL statement:
//! validator and templates feed the condition compiler, whose fragments the
//! assembler stitches into the base query.

pub mod assembler;
pub mod compiler;
pub mod complexity;
pub mod filters;
pub mod fragment;
pub mod templates;
pub mod tokenizer;
pub mod validator;

pub use assembler::{BaseContext, CompiledQuery, QueryAssembler, QueryLimits};
pub use compiler::{CompileContext, ConditionCompiler};
pub use complexity::Complexity;
pub use filters::{
    FieldCondition, FilterCategory, FilterUnit, FilterValue, Grouping, Logic, MultiTimeframeFilter,
    Pagination, SortDirection, SortSpec, TemplateFilter,
};
pub use fragment::{Fragment, SqlValue};
pub use templates::{TemplateEngine, TemplateInfo};
pub use validator::{ExpressionValidator, SafeExpression};

use crate::catalog::{Catalog, FieldDescriptor, Timeframe};
use crate::error::{Result, ScreenerError};
use std::sync::Arc;

/// Everything needed to compile one screen
#[derive(Debug, Clone)]
pub struct ScreenQuery<'a> {
    /// First entry is the primary timeframe
    pub timeframes: &'a [Timeframe],
    pub units: &'a [FilterUnit],
    pub logic: Logic,
    pub grouping: Grouping,
    pub sort: &'a [SortSpec],
    pub pagination: Option<Pagination>,
    pub include_fundamentals: bool,
}

impl<'a> ScreenQuery<'a> {
    pub fn new(timeframes: &'a [Timeframe], units: &'a [FilterUnit]) -> Self {
        Self {
            timeframes,
            units,
            logic: Logic::And,
            grouping: Grouping::default(),
            sort: &[],
            pagination: None,
            include_fundamentals: false,
        }
    }

    pub fn primary_timeframe(&self) -> Result<Timeframe> {
        self.timeframes
            .first()
            .copied()
            .ok_or_else(|| ScreenerError::InvalidRequest("at least one timeframe is required".to_string()))
    }
}

/// Entry point over the catalog, template registry and assembler
#[derive(Debug, Clone)]
pub struct QueryEngine {
    catalog: Arc<Catalog>,
    templates: Arc<TemplateEngine>,
    assembler: QueryAssembler,
}

impl QueryEngine {
    pub fn new(catalog: Arc<Catalog>, templates: Arc<TemplateEngine>, limits: QueryLimits) -> Self {
        let compiler = ConditionCompiler::new(catalog.clone(), templates.clone());
        Self {
            catalog,
            templates,
            assembler: QueryAssembler::new(compiler, limits),
        }
    }

    pub fn compile_query(&self, query: &ScreenQuery<'_>) -> Result<CompiledQuery> {
        let base = BaseContext::new(query.primary_timeframe()?).with_fundamentals(query.include_fundamentals);
        self.assembler.build(
            &base,
            query.units,
            query.logic,
            &query.grouping,
            query.sort,
            query.pagination.as_ref(),
        )
    }

    /// Latest row of one symbol on `timeframe`
    pub fn symbol_snapshot(&self, timeframe: Timeframe, symbol: &str) -> CompiledQuery {
        self.assembler.symbol_snapshot(timeframe, symbol)
    }

    pub fn estimate_complexity(&self, units: &[FilterUnit]) -> Complexity {
        complexity::estimate(units, &self.templates)
    }

    pub fn list_catalog_fields(&self) -> &[FieldDescriptor] {
        self.catalog.fields()
    }

    pub fn list_templates(&self) -> Vec<TemplateInfo> {
        self.templates.list_templates()
    }

    pub fn template_categories(&self) -> Vec<&'static str> {
        self.templates.categories()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn templates(&self) -> &TemplateEngine {
        &self.templates
    }

    pub fn limits(&self) -> QueryLimits {
        self.assembler.limits()
    }
}
