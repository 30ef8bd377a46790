//! SQL fragments paired with their bound parameters

use rusqlite::types::{ToSql, ToSqlOutput, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A value bound to a `?` placeholder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Integer(i) => Some(*i as f64),
            SqlValue::Real(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("null"),
            SqlValue::Integer(i) => write!(f, "{}", i),
            SqlValue::Real(r) => write!(f, "{}", r),
            SqlValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(i) => ToSqlOutput::from(*i),
            SqlValue::Real(f) => ToSqlOutput::from(*f),
            SqlValue::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

/// A boolean SQL sub-expression and the parameters its placeholders consume,
/// in left-to-right order.
///
/// Fragments are only ever combined through [`Fragment::join`] and
/// [`Fragment::append`], which keep text and parameters in lockstep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    sql: String,
    params: Vec<SqlValue>,
}

impl Fragment {
    pub fn new(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Fragment without placeholders
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    pub fn into_parts(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.params)
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Append another fragment's text and parameters
    pub fn append(&mut self, other: Fragment) {
        self.sql.push_str(&other.sql);
        self.params.extend(other.params);
    }

    /// Append literal text with no parameters
    pub fn push_sql(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    pub fn push_param(&mut self, value: SqlValue) {
        self.params.push(value);
    }

    /// `(self)`
    pub fn parenthesized(self) -> Self {
        Self {
            sql: format!("({})", self.sql),
            params: self.params,
        }
    }

    /// Join fragments with `separator`; params concatenate in the same order.
    pub fn join<I>(parts: I, separator: &str) -> Self
    where
        I: IntoIterator<Item = Fragment>,
    {
        let mut joined = Fragment::default();
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                joined.sql.push_str(separator);
            }
            joined.append(part);
        }
        joined
    }
}

/// Number of `?` placeholders in `sql`, ignoring quoted literals
pub fn count_placeholders(sql: &str) -> usize {
    let mut in_quote = false;
    let mut count = 0;
    for ch in sql.chars() {
        match ch {
            '\'' => in_quote = !in_quote,
            '?' if !in_quote => count += 1,
            _ => {}
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_keeps_param_order() {
        let a = Fragment::new("a > ?", vec![SqlValue::Integer(1)]);
        let b = Fragment::new("b BETWEEN ? AND ?", vec![SqlValue::Integer(5), SqlValue::Integer(2)]);
        let c = Fragment::raw("c IS NULL");

        let joined = Fragment::join([a, b, c], " AND ");
        assert_eq!(joined.sql(), "a > ? AND b BETWEEN ? AND ? AND c IS NULL");
        assert_eq!(joined.params(), &[SqlValue::Integer(1), SqlValue::Integer(5), SqlValue::Integer(2)]);
        assert_eq!(count_placeholders(joined.sql()), joined.params().len());
    }

    #[test]
    fn test_join_is_associative() {
        let parts = || {
            vec![
                Fragment::new("x = ?", vec!["a".into()]),
                Fragment::new("y = ?", vec!["b".into()]),
                Fragment::new("z = ?", vec!["c".into()]),
            ]
        };
        let flat = Fragment::join(parts(), " OR ");

        let mut p = parts();
        let last = p.pop().unwrap_or_default();
        let nested = Fragment::join([Fragment::join(p, " OR "), last], " OR ");
        assert_eq!(flat, nested);
    }

    #[test]
    fn test_untagged_values() {
        let values: Vec<SqlValue> = serde_json::from_str(r#"[60, 1.5, "NSE", null]"#).unwrap();
        assert_eq!(
            values,
            vec![
                SqlValue::Integer(60),
                SqlValue::Real(1.5),
                SqlValue::Text("NSE".into()),
                SqlValue::Null
            ]
        );
    }

    #[test]
    fn test_placeholders_inside_quotes_are_ignored() {
        assert_eq!(count_placeholders("a = ? AND b = '?'"), 1);
    }
}
