//! Query assembler
//!
//! Builds the base skeleton, appends grouped filter fragments, then sort and
//! pagination. The primary indicator label is always parameter #1.

use super::compiler::{CompileContext, ConditionCompiler, CANDLE_ALIAS};
use super::filters::{FilterCategory, FilterUnit, Grouping, Logic, Pagination, SortSpec};
use super::fragment::{Fragment, SqlValue};
use crate::catalog::{SourceTable, Timeframe};
use crate::error::{Result, ScreenerError};
use serde::Serialize;
use tracing::debug;

/// Shape of the base query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseContext {
    pub timeframe: Timeframe,
    pub include_fundamentals: bool,
    /// Restrict to the candle table's latest datetime
    pub latest_only: bool,
}

impl BaseContext {
    pub fn new(timeframe: Timeframe) -> Self {
        Self {
            timeframe,
            include_fundamentals: false,
            latest_only: true,
        }
    }

    pub fn with_fundamentals(mut self, include: bool) -> Self {
        self.include_fundamentals = include;
        self
    }
}

/// Final statement and its positional parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Result-size limits enforced while assembling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    pub max_results: u32,
    pub default_limit: u32,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_results: 10_000,
            default_limit: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryAssembler {
    compiler: ConditionCompiler,
    limits: QueryLimits,
}

impl QueryAssembler {
    pub fn new(compiler: ConditionCompiler, limits: QueryLimits) -> Self {
        Self { compiler, limits }
    }

    pub fn compiler(&self) -> &ConditionCompiler {
        &self.compiler
    }

    pub fn limits(&self) -> QueryLimits {
        self.limits
    }

    pub fn build(
        &self,
        base: &BaseContext,
        units: &[FilterUnit],
        logic: Logic,
        grouping: &Grouping,
        sort: &[SortSpec],
        pagination: Option<&Pagination>,
    ) -> Result<CompiledQuery> {
        let limit_clause = self.pagination_clause(pagination)?;
        let ctx = CompileContext::new(base.timeframe);

        let filters = self.filter_fragment(units, logic, grouping, &ctx)?;
        let (order_by, sort_uses_fundamentals) = self.order_by_clause(sort, &ctx)?;

        let include_fundamentals = base.include_fundamentals
            || sort_uses_fundamentals
            || units.iter().any(|u| self.compiler.uses_fundamentals(u));

        let mut query = self.base_fragment(base.timeframe, include_fundamentals, base.latest_only);
        if let Some(filters) = filters {
            query.push_sql(if base.latest_only { " AND " } else { " WHERE " });
            query.append(filters.parenthesized());
        }
        query.push_sql(&order_by);
        query.push_sql(&limit_clause);

        let (sql, params) = query.into_parts();
        debug!(
            "QueryAssembler::build - {} units, {} parameters",
            units.len(),
            params.len()
        );
        debug!("QueryAssembler::build - {}", sql);
        Ok(CompiledQuery { sql, params })
    }

    /// Latest row of `timeframe` for one symbol
    pub fn symbol_snapshot(&self, timeframe: Timeframe, symbol: &str) -> CompiledQuery {
        let mut query = self.base_fragment(timeframe, false, true);
        query.push_sql(&format!(" AND {}.symbol = ?", CANDLE_ALIAS));
        query.push_param(SqlValue::Text(symbol.to_string()));
        query.push_sql(" LIMIT 1");

        let (sql, params) = query.into_parts();
        CompiledQuery { sql, params }
    }

    fn base_fragment(&self, timeframe: Timeframe, include_fundamentals: bool, latest_only: bool) -> Fragment {
        let catalog = self.compiler.catalog();
        let table = timeframe.table_name();

        let mut columns = vec![
            format!("{}.symbol", CANDLE_ALIAS),
            format!("{}.datetime", CANDLE_ALIAS),
        ];
        columns.extend(catalog.fields_in(SourceTable::Candles).map(|f| f.qualified()));
        columns.push(format!("'{}' AS primary_timeframe", timeframe.as_str()));
        columns.extend(catalog.fields_in(SourceTable::Indicators).map(|f| f.qualified()));
        if include_fundamentals {
            columns.extend(catalog.fields_in(SourceTable::Fundamentals).map(|f| f.qualified()));
            columns.push("f.updated_at".to_string());
        }

        let mut sql = format!(
            "SELECT {cols} FROM {table} {c} JOIN indicators i ON {c}.datetime = i.datetime \
             AND {c}.symbol = i.symbol AND i.timeframe = ?",
            cols = columns.join(", "),
            table = table,
            c = CANDLE_ALIAS,
        );
        if include_fundamentals {
            sql.push_str(&format!(" LEFT JOIN fundamentals f ON {}.symbol = f.symbol", CANDLE_ALIAS));
        }
        if latest_only {
            sql.push_str(&format!(
                " WHERE {}.datetime = (SELECT MAX(datetime) FROM {})",
                CANDLE_ALIAS, table
            ));
        }

        Fragment::new(sql, vec![timeframe.indicator_label().into()])
    }

    /// Compile units, group them by category (first appearance order), and
    /// join the groups with the overall logic
    fn filter_fragment(
        &self,
        units: &[FilterUnit],
        logic: Logic,
        grouping: &Grouping,
        ctx: &CompileContext,
    ) -> Result<Option<Fragment>> {
        let mut groups: Vec<(FilterCategory, Vec<Fragment>)> = Vec::new();

        for unit in units {
            let fragment = self.compiler.compile(unit, ctx)?;
            let category = unit.category();
            match groups.iter_mut().find(|(c, _)| *c == category) {
                Some((_, fragments)) => fragments.push(fragment),
                None => groups.push((category, vec![fragment])),
            }
        }

        if groups.is_empty() {
            return Ok(None);
        }

        let grouped = groups.into_iter().map(|(category, fragments)| {
            Fragment::join(fragments, grouping.logic_for(category).separator()).parenthesized()
        });
        Ok(Some(Fragment::join(grouped, logic.separator())))
    }

    fn order_by_clause(&self, sort: &[SortSpec], ctx: &CompileContext) -> Result<(String, bool)> {
        if sort.is_empty() {
            return Ok((format!(" ORDER BY {}.volume DESC", CANDLE_ALIAS), false));
        }

        let mut uses_fundamentals = false;
        let mut keys = Vec::with_capacity(sort.len());
        for spec in sort {
            if let Some(tf) = spec.timeframe {
                if tf != ctx.primary_timeframe {
                    return Err(ScreenerError::TimeframeOverride(format!(
                        "sort on '{}' requests {} but the query runs on {}",
                        spec.field, tf, ctx.primary_timeframe
                    )));
                }
            }
            let field = self.compiler.catalog().lookup(&spec.field)?;
            uses_fundamentals |= field.source_table == SourceTable::Fundamentals;
            keys.push(format!("{} {}", field.qualified(), spec.direction.as_sql()));
        }

        Ok((format!(" ORDER BY {}", keys.join(", ")), uses_fundamentals))
    }

    fn pagination_clause(&self, pagination: Option<&Pagination>) -> Result<String> {
        let Some(pagination) = pagination else {
            return Ok(format!(" LIMIT {}", self.limits.default_limit));
        };

        if pagination.limit > self.limits.max_results {
            return Err(ScreenerError::LimitExceeded {
                requested: pagination.limit,
                max: self.limits.max_results,
            });
        }
        if pagination.limit == 0 {
            return Err(ScreenerError::InvalidRequest("limit must be at least 1".to_string()));
        }

        let mut clause = format!(" LIMIT {}", pagination.limit);
        if pagination.offset > 0 {
            clause.push_str(&format!(" OFFSET {}", pagination.offset));
        }
        Ok(clause)
    }
}
