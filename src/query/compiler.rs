//! Condition compiler
//!
//! Turns one [`FilterUnit`] into a [`Fragment`]. Field references are
//! qualified with the base-query alias of their source table (`c.`, `i.`,
//! `f.`); cross-timeframe conditions become correlated `EXISTS` subqueries.

use super::filters::{FieldCondition, FilterUnit, FilterValue, MultiTimeframeFilter, TemplateFilter};
use super::fragment::{Fragment, SqlValue};
use super::templates::{TemplateContext, TemplateEngine};
use super::tokenizer;
use super::validator::{is_allowed_function, is_allowed_keyword, ExpressionValidator};
use crate::catalog::{Catalog, FieldDescriptor, Operator, OperatorArity, SourceTable, Timeframe};
use crate::error::{Result, ScreenerError};
use std::sync::Arc;

/// Alias of the primary candle table in the base query
pub const CANDLE_ALIAS: &str = "c";

/// Identifiers template bodies may use besides catalog fields, functions and keywords
const TEMPLATE_VOCABULARY: &[&str] = &[
    "OVER", "PARTITION", "BY", "ORDER", "SELECT", "FROM", "WHERE", "MAX", "symbol", "datetime",
];

/// Request-level facts a unit compiles against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileContext {
    pub primary_timeframe: Timeframe,
}

impl CompileContext {
    pub fn new(primary_timeframe: Timeframe) -> Self {
        Self { primary_timeframe }
    }
}

#[derive(Debug, Clone)]
pub struct ConditionCompiler {
    catalog: Arc<Catalog>,
    templates: Arc<TemplateEngine>,
    validator: ExpressionValidator,
}

impl ConditionCompiler {
    pub fn new(catalog: Arc<Catalog>, templates: Arc<TemplateEngine>) -> Self {
        let validator = ExpressionValidator::new(catalog.clone());
        Self {
            catalog,
            templates,
            validator,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn templates(&self) -> &TemplateEngine {
        &self.templates
    }

    pub fn compile(&self, unit: &FilterUnit, ctx: &CompileContext) -> Result<Fragment> {
        match unit {
            FilterUnit::Simple(cond) => self.compile_simple(cond, ctx),
            FilterUnit::Fundamentals(cond) => self.compile_fundamentals(cond),
            FilterUnit::MultiTimeframe(filter) => self.compile_multi_timeframe(filter, ctx),
            FilterUnit::Expression(expr) => self.compile_expression(expr),
            FilterUnit::Template(template) => self.compile_template(template, ctx),
        }
    }

    /// Whether the unit reads any fundamentals column
    pub fn uses_fundamentals(&self, unit: &FilterUnit) -> bool {
        let is_fundamental = |name: &str| {
            self.catalog
                .get(name)
                .is_some_and(|f| f.source_table == SourceTable::Fundamentals)
        };
        match unit {
            FilterUnit::Fundamentals(_) => true,
            FilterUnit::Simple(cond) => {
                is_fundamental(&cond.field) || cond.reference.as_deref().is_some_and(is_fundamental)
            }
            FilterUnit::MultiTimeframe(_) => false,
            FilterUnit::Expression(expr) => tokenizer::identifiers(expr)
                .iter()
                .any(|t| !t.qualified && is_fundamental(t.text)),
            FilterUnit::Template(template) => self
                .templates
                .get(&template.name)
                .map(|def| {
                    tokenizer::identifiers(def.body)
                        .iter()
                        .any(|t| !t.qualified && is_fundamental(t.text))
                })
                .unwrap_or(false),
        }
    }

    /// Qualify every unqualified catalog identifier in `expr` with its table alias.
    /// Functions, keywords and unknown tokens pass through untouched.
    pub fn alias_identifiers(&self, expr: &str) -> String {
        tokenizer::rewrite(expr, |token| {
            if token.qualified {
                return None;
            }
            self.catalog.get(token.text).map(FieldDescriptor::qualified)
        })
    }

    fn compile_simple(&self, cond: &FieldCondition, ctx: &CompileContext) -> Result<Fragment> {
        let field = self.catalog.lookup(&cond.field)?;

        match cond.timeframe {
            Some(tf)
                if tf != ctx.primary_timeframe
                    && field.source_table != SourceTable::Fundamentals =>
            {
                self.exists_condition(cond, tf)
            }
            _ => self.compile_condition(field, cond),
        }
    }

    fn compile_fundamentals(&self, cond: &FieldCondition) -> Result<Fragment> {
        let field = self.catalog.lookup(&cond.field)?;
        if field.source_table != SourceTable::Fundamentals {
            return Err(ScreenerError::FieldNotAllowed {
                field: cond.field.clone(),
                reason: "not a fundamentals field".to_string(),
            });
        }
        self.compile_condition(field, cond)
    }

    /// Comparison against the base-query aliases
    fn compile_condition(&self, field: &FieldDescriptor, cond: &FieldCondition) -> Result<Fragment> {
        let field_ref = field.qualified();
        match &cond.reference {
            Some(reference) => {
                let reference = self.catalog.lookup(reference)?;
                reference_predicate(&field_ref, cond, &reference.qualified())
            }
            None => value_predicate(&field_ref, cond.operator, cond.value.as_ref()),
        }
    }

    fn compile_multi_timeframe(
        &self,
        filter: &MultiTimeframeFilter,
        ctx: &CompileContext,
    ) -> Result<Fragment> {
        if filter.conditions.is_empty() {
            return Err(ScreenerError::InvalidRequest(
                "multi-timeframe filter needs at least one condition".to_string(),
            ));
        }

        let parts = filter
            .conditions
            .iter()
            .map(|cond| {
                let tf = cond.timeframe.unwrap_or(ctx.primary_timeframe);
                self.exists_condition(cond, tf)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Fragment::join(parts, filter.logic.separator()).parenthesized())
    }

    /// `EXISTS` subquery evaluating `cond` on the latest row of `tf`.
    ///
    /// Candle tables hold one global snapshot per datetime, so the latest
    /// datetime of the table is used. Indicator rows are correlated on the
    /// latest datetime for that symbol and timeframe label.
    fn exists_condition(&self, cond: &FieldCondition, tf: Timeframe) -> Result<Fragment> {
        let field = self.catalog.lookup(&cond.field)?;

        let (alias, mut exists) = match field.source_table {
            SourceTable::Candles => {
                let alias = format!("mt_{}", tf.as_str());
                let table = tf.table_name();
                let head = format!(
                    "EXISTS (SELECT 1 FROM {table} {alias} WHERE {alias}.symbol = {c}.symbol \
                     AND {alias}.datetime = (SELECT MAX(datetime) FROM {table})",
                    table = table,
                    alias = alias,
                    c = CANDLE_ALIAS,
                );
                (alias, Fragment::raw(head))
            }
            SourceTable::Indicators => {
                let alias = format!("mti_{}", tf.as_str());
                let label = tf.indicator_label();
                let head = format!(
                    "EXISTS (SELECT 1 FROM indicators {alias} WHERE {alias}.symbol = {c}.symbol \
                     AND {alias}.timeframe = ? AND {alias}.datetime = (SELECT MAX(datetime) \
                     FROM indicators WHERE symbol = {c}.symbol AND timeframe = ?)",
                    alias = alias,
                    c = CANDLE_ALIAS,
                );
                (alias, Fragment::new(head, vec![label.into(), label.into()]))
            }
            SourceTable::Fundamentals => {
                return Err(ScreenerError::FieldNotAllowed {
                    field: cond.field.clone(),
                    reason: "fundamentals have no timeframe".to_string(),
                });
            }
        };

        let field_ref = format!("{}.{}", alias, field.name);
        let predicate = match &cond.reference {
            Some(reference) => {
                let reference = self.catalog.lookup(reference)?;
                if reference.source_table != field.source_table {
                    return Err(ScreenerError::FieldNotAllowed {
                        field: reference.name.clone(),
                        reason: format!(
                            "cross-timeframe reference must come from the {} table",
                            field.source_table.as_str()
                        ),
                    });
                }
                reference_predicate(&field_ref, cond, &format!("{}.{}", alias, reference.name))?
            }
            None => value_predicate(&field_ref, cond.operator, cond.value.as_ref())?,
        };

        exists.push_sql(" AND ");
        exists.append(predicate);
        exists.push_sql(")");
        Ok(exists)
    }

    fn compile_expression(&self, expr: &str) -> Result<Fragment> {
        let safe = self.validator.validate(expr)?;
        Ok(Fragment::raw(self.alias_identifiers(safe.as_str())).parenthesized())
    }

    fn compile_template(&self, template: &TemplateFilter, ctx: &CompileContext) -> Result<Fragment> {
        if let Some(tf) = template.timeframe {
            if tf != ctx.primary_timeframe {
                return Err(ScreenerError::TimeframeOverride(format!(
                    "template '{}' requests {} but the query runs on {}",
                    template.name, tf, ctx.primary_timeframe
                )));
            }
        }

        let table_ctx = TemplateContext {
            table_name: ctx.primary_timeframe.table_name(),
            table_alias: CANDLE_ALIAS,
        };
        let body = self
            .templates
            .resolve_for(&template.name, &template.params, table_ctx)?;
        self.check_template_references(body.as_str(), table_ctx.table_name)?;
        Ok(Fragment::raw(self.alias_identifiers(body.as_str())).parenthesized())
    }

    /// Parameters can name columns (`rsi_{period}`), so a resolved body must
    /// still only reference catalog fields. String literals, table names and
    /// table aliases (anything used as a `x.` qualifier) are skipped.
    fn check_template_references(&self, body: &str, table_name: &str) -> Result<()> {
        let code = blank_literals(body);
        let tokens = tokenizer::identifiers(&code);
        let qualifiers: Vec<&str> = tokens
            .iter()
            .filter(|t| code[t.end..].starts_with('.'))
            .map(|t| t.text)
            .collect();

        for token in &tokens {
            if token.qualified || token.text == table_name || qualifiers.contains(&token.text) {
                continue;
            }
            let known = self.catalog.contains(token.text)
                || is_allowed_function(token.text)
                || is_allowed_keyword(token.text)
                || TEMPLATE_VOCABULARY
                    .iter()
                    .any(|w| w.eq_ignore_ascii_case(token.text));
            if !known {
                return Err(ScreenerError::UnknownField(token.text.to_string()));
            }
        }
        Ok(())
    }
}

/// Replace the contents of single-quoted literals with spaces, keeping offsets
fn blank_literals(sql: &str) -> String {
    let mut in_quote = false;
    sql.chars()
        .map(|ch| {
            if ch == '\'' {
                in_quote = !in_quote;
                ch
            } else if in_quote {
                ' '
            } else {
                ch
            }
        })
        .collect()
}

/// `F <op> R` or `F <op> (R * ?)` for a field-to-field comparison
fn reference_predicate(field_ref: &str, cond: &FieldCondition, reference_ref: &str) -> Result<Fragment> {
    if !cond.operator.is_comparison() {
        return Err(malformed(
            cond.operator,
            "field-to-field comparison needs a plain comparison operator",
        ));
    }
    if cond.value.is_some() {
        return Err(malformed(cond.operator, "value and reference are mutually exclusive"));
    }

    let op = cond.operator.sql_symbol();
    match cond.multiplier {
        Some(m) if m != 1.0 => Ok(Fragment::new(
            format!("{} {} ({} * ?)", field_ref, op, reference_ref),
            vec![SqlValue::Real(m)],
        )),
        _ => Ok(Fragment::raw(format!("{} {} {}", field_ref, op, reference_ref))),
    }
}

/// Value-side predicate for `operator`, checking the value shape against its arity
fn value_predicate(field_ref: &str, operator: Operator, value: Option<&FilterValue>) -> Result<Fragment> {
    let op = operator.sql_symbol();
    match (operator.arity(), value) {
        (OperatorArity::One, Some(FilterValue::Scalar(v))) => {
            Ok(Fragment::new(format!("{} {} ?", field_ref, op), vec![v.clone()]))
        }
        (OperatorArity::One, Some(FilterValue::List(_))) => {
            Err(malformed(operator, "expects a single value"))
        }
        (OperatorArity::Two, Some(FilterValue::List(values))) if values.len() == 2 => Ok(Fragment::new(
            format!("{} BETWEEN ? AND ?", field_ref),
            values.clone(),
        )),
        (OperatorArity::Two, _) => Err(malformed(operator, "requires exactly 2 values")),
        (OperatorArity::List, Some(FilterValue::List(values))) if !values.is_empty() => {
            let placeholders = vec!["?"; values.len()].join(",");
            Ok(Fragment::new(
                format!("{} {} ({})", field_ref, op, placeholders),
                values.clone(),
            ))
        }
        (OperatorArity::List, _) => Err(malformed(operator, "requires a non-empty list of values")),
        (OperatorArity::None, None) => Ok(Fragment::raw(format!("{} {}", field_ref, op))),
        (OperatorArity::None, Some(_)) => Err(malformed(operator, "takes no value")),
        (OperatorArity::One, None) => Err(malformed(operator, "requires a value")),
    }
}

fn malformed(operator: Operator, reason: &str) -> ScreenerError {
    ScreenerError::MalformedOperatorValue {
        operator: operator.as_str().to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filters::Logic;
    use crate::query::fragment::count_placeholders;
    use serde_json::json;

    fn compiler() -> ConditionCompiler {
        ConditionCompiler::new(
            Arc::new(Catalog::standard()),
            Arc::new(TemplateEngine::standard()),
        )
    }

    fn ctx() -> CompileContext {
        CompileContext::new(Timeframe::FiveMin)
    }

    fn scalar(v: impl Into<SqlValue>) -> Option<FilterValue> {
        Some(FilterValue::Scalar(v.into()))
    }

    fn list(values: Vec<SqlValue>) -> Option<FilterValue> {
        Some(FilterValue::List(values))
    }

    #[test]
    fn test_simple_comparison() {
        let unit = FilterUnit::Simple(FieldCondition::new("rsi_14", Operator::Gt, scalar(60i64)));
        let fragment = compiler().compile(&unit, &ctx()).unwrap();
        assert_eq!(fragment.sql(), "i.rsi_14 > ?");
        assert_eq!(fragment.params(), &[SqlValue::Integer(60)]);
    }

    #[test]
    fn test_between_is_never_reordered() {
        let unit = FilterUnit::Simple(FieldCondition::new(
            "close",
            Operator::Between,
            list(vec![SqlValue::Integer(500), SqlValue::Integer(100)]),
        ));
        let fragment = compiler().compile(&unit, &ctx()).unwrap();
        assert_eq!(fragment.sql(), "c.close BETWEEN ? AND ?");
        assert_eq!(fragment.params(), &[SqlValue::Integer(500), SqlValue::Integer(100)]);
    }

    #[test]
    fn test_between_needs_two_values() {
        let unit = FilterUnit::Simple(FieldCondition::new(
            "close",
            Operator::Between,
            list(vec![SqlValue::Integer(1)]),
        ));
        assert!(matches!(
            compiler().compile(&unit, &ctx()),
            Err(ScreenerError::MalformedOperatorValue { .. })
        ));
    }

    #[test]
    fn test_in_list_placeholders() {
        let unit = FilterUnit::Fundamentals(FieldCondition::new(
            "beta",
            Operator::NotIn,
            list(vec![SqlValue::Real(1.5), SqlValue::Real(0.5), SqlValue::Real(1.0)]),
        ));
        let fragment = compiler().compile(&unit, &ctx()).unwrap();
        assert_eq!(fragment.sql(), "f.beta NOT IN (?,?,?)");
        assert_eq!(fragment.params()[0], SqlValue::Real(1.5));
        assert_eq!(count_placeholders(fragment.sql()), 3);

        let empty = FilterUnit::Simple(FieldCondition::new("close", Operator::In, list(vec![])));
        assert!(compiler().compile(&empty, &ctx()).is_err());
    }

    #[test]
    fn test_null_checks_bind_nothing() {
        let unit = FilterUnit::Fundamentals(FieldCondition::new("roe", Operator::IsNotNull, None));
        let fragment = compiler().compile(&unit, &ctx()).unwrap();
        assert_eq!(fragment.sql(), "f.roe IS NOT NULL");
        assert!(fragment.params().is_empty());

        let with_value =
            FilterUnit::Fundamentals(FieldCondition::new("roe", Operator::IsNull, scalar(1i64)));
        assert!(compiler().compile(&with_value, &ctx()).is_err());
    }

    #[test]
    fn test_reference_with_multiplier() {
        let cond = FieldCondition::new("volume", Operator::Gt, None)
            .with_reference("volume_sma_20", Some(1.5));
        let fragment = compiler().compile(&FilterUnit::Simple(cond), &ctx()).unwrap();
        assert_eq!(fragment.sql(), "c.volume > (i.volume_sma_20 * ?)");
        assert_eq!(fragment.params(), &[SqlValue::Real(1.5)]);

        let plain = FieldCondition::new("close", Operator::Gt, None).with_reference("sma_50", Some(1.0));
        let fragment = compiler().compile(&FilterUnit::Simple(plain), &ctx()).unwrap();
        assert_eq!(fragment.sql(), "c.close > i.sma_50");
        assert!(fragment.params().is_empty());
    }

    #[test]
    fn test_reference_rejects_range_operators() {
        let cond = FieldCondition::new("close", Operator::Between, None).with_reference("sma_50", None);
        assert!(matches!(
            compiler().compile(&FilterUnit::Simple(cond), &ctx()),
            Err(ScreenerError::MalformedOperatorValue { .. })
        ));
    }

    #[test]
    fn test_unknown_field_in_every_category() {
        let c = compiler();
        let mut mt_cond = FieldCondition::new("sma_20", Operator::Gt, scalar(1i64));
        mt_cond.timeframe = Some(Timeframe::OneHour);
        let units = vec![
            FilterUnit::Simple(FieldCondition::new("sma_20", Operator::Gt, scalar(1i64))),
            FilterUnit::Fundamentals(FieldCondition::new("sma_20", Operator::Gt, scalar(1i64))),
            FilterUnit::MultiTimeframe(MultiTimeframeFilter {
                conditions: vec![mt_cond],
                logic: Logic::And,
                description: None,
            }),
            FilterUnit::Expression("close > sma_20".to_string()),
            FilterUnit::Simple(
                FieldCondition::new("close", Operator::Gt, None).with_reference("sma_20", None),
            ),
        ];
        for unit in units {
            match c.compile(&unit, &ctx()) {
                Err(ScreenerError::UnknownField(name)) => assert_eq!(name, "sma_20"),
                other => panic!("expected UnknownField for {:?}, got {:?}", unit, other),
            }
        }
    }

    #[test]
    fn test_template_param_naming_missing_column() {
        let mut template = TemplateFilter::new("oversold_rsi");
        template.params.insert("period".into(), json!(9));
        match compiler().compile(&FilterUnit::Template(template), &ctx()) {
            Err(ScreenerError::UnknownField(name)) => assert_eq!(name, "rsi_9"),
            other => panic!("expected UnknownField, got {:?}", other),
        }
    }

    #[test]
    fn test_every_template_compiles_with_defaults() {
        let c = compiler();
        for info in c.templates().list_templates() {
            let unit = FilterUnit::Template(TemplateFilter::new(info.name));
            assert!(c.compile(&unit, &ctx()).is_ok(), "template {}", info.name);
        }
    }

    #[test]
    fn test_fundamentals_filter_rejects_indicators() {
        let unit = FilterUnit::Fundamentals(FieldCondition::new("rsi_14", Operator::Gt, scalar(1i64)));
        assert!(matches!(
            compiler().compile(&unit, &ctx()),
            Err(ScreenerError::FieldNotAllowed { .. })
        ));
    }

    #[test]
    fn test_expression_is_aliased() {
        let unit = FilterUnit::Expression("rsi_14 > 50 AND volume > volume_sma_20 * 2".into());
        let fragment = compiler().compile(&unit, &ctx()).unwrap();
        assert_eq!(fragment.sql(), "(i.rsi_14 > 50 AND c.volume > i.volume_sma_20 * 2)");
        assert!(fragment.params().is_empty());
    }

    #[test]
    fn test_expression_rejects_unsafe_text() {
        let unit = FilterUnit::Expression("DROP TABLE users; --".into());
        assert!(matches!(
            compiler().compile(&unit, &ctx()),
            Err(ScreenerError::UnsafeExpression(_))
        ));
    }

    #[test]
    fn test_template_is_resolved_and_aliased() {
        let unit = FilterUnit::Template(TemplateFilter::new("volume_breakout"));
        let fragment = compiler().compile(&unit, &ctx()).unwrap();
        assert_eq!(
            fragment.sql(),
            "(c.volume > i.volume_sma_20 * 2 AND ABS((c.close - c.open) / c.open) > 0.02)"
        );
    }

    #[test]
    fn test_new_highs_uses_primary_table() {
        let unit = FilterUnit::Template(TemplateFilter::new("new_highs"));
        let fragment = compiler().compile(&unit, &ctx()).unwrap();
        assert!(fragment.sql().starts_with("(c.high = ( SELECT MAX(c2.high) FROM candles_5min c2"));
        assert!(fragment.sql().contains("c2.symbol = c.symbol"));
    }

    #[test]
    fn test_template_timeframe_override_is_rejected() {
        let mut template = TemplateFilter::new("high_volume");
        template.timeframe = Some(Timeframe::OneHour);
        assert!(matches!(
            compiler().compile(&FilterUnit::Template(template.clone()), &ctx()),
            Err(ScreenerError::TimeframeOverride(_))
        ));

        template.timeframe = Some(Timeframe::FiveMin);
        assert!(compiler().compile(&FilterUnit::Template(template), &ctx()).is_ok());
    }

    #[test]
    fn test_multi_timeframe_exists_subqueries() {
        let filter = MultiTimeframeFilter {
            conditions: vec![
                FieldCondition::new("close", Operator::Gt, scalar(100i64)).on_timeframe(Timeframe::OneHour),
                FieldCondition::new("rsi_14", Operator::Lt, scalar(30i64)).on_timeframe(Timeframe::FourHour),
            ],
            logic: Logic::Or,
            description: None,
        };
        let fragment = compiler()
            .compile(&FilterUnit::MultiTimeframe(filter), &ctx())
            .unwrap();

        assert_eq!(
            fragment.sql(),
            "(EXISTS (SELECT 1 FROM candles_1hr mt_1hr WHERE mt_1hr.symbol = c.symbol \
             AND mt_1hr.datetime = (SELECT MAX(datetime) FROM candles_1hr) AND mt_1hr.close > ?) \
             OR EXISTS (SELECT 1 FROM indicators mti_4hr WHERE mti_4hr.symbol = c.symbol \
             AND mti_4hr.timeframe = ? AND mti_4hr.datetime = (SELECT MAX(datetime) FROM indicators \
             WHERE symbol = c.symbol AND timeframe = ?) AND mti_4hr.rsi_14 < ?))"
        );
        assert_eq!(
            fragment.params(),
            &[
                SqlValue::Integer(100),
                SqlValue::Text("4h".into()),
                SqlValue::Text("4h".into()),
                SqlValue::Integer(30)
            ]
        );
        assert_eq!(count_placeholders(fragment.sql()), fragment.params().len());
    }

    #[test]
    fn test_multi_timeframe_rejects_fundamentals_and_mixed_references() {
        let fundamentals = MultiTimeframeFilter {
            conditions: vec![FieldCondition::new("roe", Operator::Gt, scalar(0.1))],
            logic: Logic::And,
            description: None,
        };
        assert!(matches!(
            compiler().compile(&FilterUnit::MultiTimeframe(fundamentals), &ctx()),
            Err(ScreenerError::FieldNotAllowed { .. })
        ));

        let mixed = MultiTimeframeFilter {
            conditions: vec![FieldCondition::new("close", Operator::Gt, None)
                .with_reference("sma_50", None)
                .on_timeframe(Timeframe::OneHour)],
            logic: Logic::And,
            description: None,
        };
        assert!(matches!(
            compiler().compile(&FilterUnit::MultiTimeframe(mixed), &ctx()),
            Err(ScreenerError::FieldNotAllowed { .. })
        ));
    }

    #[test]
    fn test_simple_timeframe_override_uses_exists() {
        let cond = FieldCondition::new("rsi_14", Operator::Gt, scalar(60i64)).on_timeframe(Timeframe::OneHour);
        let fragment = compiler().compile(&FilterUnit::Simple(cond), &ctx()).unwrap();
        assert!(fragment.sql().starts_with("EXISTS (SELECT 1 FROM indicators mti_1hr"));
        assert_eq!(fragment.params()[0], SqlValue::Text("1h".into()));

        let same = FieldCondition::new("rsi_14", Operator::Gt, scalar(60i64)).on_timeframe(Timeframe::FiveMin);
        let fragment = compiler().compile(&FilterUnit::Simple(same), &ctx()).unwrap();
        assert_eq!(fragment.sql(), "i.rsi_14 > ?");
    }

    #[test]
    fn test_qualified_identifiers_are_not_realiased() {
        let out = compiler().alias_identifiers("c2.high = high AND ABS(close) > 1");
        assert_eq!(out, "c2.high = c.high AND ABS(c.close) > 1");
    }

    #[test]
    fn test_uses_fundamentals() {
        let c = compiler();
        assert!(c.uses_fundamentals(&FilterUnit::Expression("roe > 0.2".into())));
        assert!(c.uses_fundamentals(&FilterUnit::Simple(FieldCondition::new(
            "market_cap",
            Operator::Gt,
            scalar(1i64)
        ))));
        assert!(!c.uses_fundamentals(&FilterUnit::Template(TemplateFilter::new("high_volume"))));
    }
}
