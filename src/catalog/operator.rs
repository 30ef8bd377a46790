//! Comparison operators

use crate::error::ScreenerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Filter comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Operator {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Ne,
    Between,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

/// How many values an operator consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorArity {
    /// Exactly one scalar
    One,
    /// Exactly two scalars, low then high
    Two,
    /// A non-empty list
    List,
    /// No value at all
    None,
}

impl Operator {
    pub const ALL: [Operator; 11] = [
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::Eq,
        Operator::Ne,
        Operator::Between,
        Operator::In,
        Operator::NotIn,
        Operator::IsNull,
        Operator::IsNotNull,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Between => "between",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::IsNull => "is_null",
            Operator::IsNotNull => "is_not_null",
        }
    }

    pub fn sql_symbol(&self) -> &'static str {
        match self {
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Between => "BETWEEN",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }

    pub fn arity(&self) -> OperatorArity {
        match self {
            Operator::Between => OperatorArity::Two,
            Operator::In | Operator::NotIn => OperatorArity::List,
            Operator::IsNull | Operator::IsNotNull => OperatorArity::None,
            _ => OperatorArity::One,
        }
    }

    /// Plain binary comparisons, the only operators usable field-to-field
    pub fn is_comparison(&self) -> bool {
        self.arity() == OperatorArity::One
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = ScreenerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| ScreenerError::UnsupportedOperator(s.to_string()))
    }
}

impl TryFrom<String> for Operator {
    type Error = ScreenerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_symbols() {
        assert_eq!(Operator::Gte.sql_symbol(), ">=");
        assert_eq!(Operator::Ne.sql_symbol(), "!=");
        assert_eq!(Operator::NotIn.sql_symbol(), "NOT IN");
    }

    #[test]
    fn test_unsupported_operator() {
        match "like".parse::<Operator>() {
            Err(ScreenerError::UnsupportedOperator(op)) => assert_eq!(op, "like"),
            other => panic!("expected UnsupportedOperator, got {:?}", other),
        }
    }

    #[test]
    fn test_arity() {
        assert_eq!(Operator::Between.arity(), OperatorArity::Two);
        assert_eq!(Operator::In.arity(), OperatorArity::List);
        assert_eq!(Operator::IsNotNull.arity(), OperatorArity::None);
        assert!(Operator::Lt.is_comparison());
        assert!(!Operator::Between.is_comparison());
    }
}
