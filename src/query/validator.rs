//! Free-form expression validation

use super::tokenizer;
use crate::catalog::Catalog;
use crate::error::{Result, ScreenerError};
use std::fmt;
use std::sync::Arc;

const DENIED_KEYWORDS: &[&str] = &[
    "DROP", "DELETE", "INSERT", "UPDATE", "CREATE", "ALTER", "TRUNCATE", "EXEC", "EXECUTE",
    "UNION", "DECLARE",
];

const ALLOWED_FUNCTIONS: &[&str] = &["ABS", "ROUND", "GREATEST", "LEAST", "COALESCE", "LAG", "LEAD"];

const ALLOWED_KEYWORDS: &[&str] = &[
    "AND", "OR", "NOT", "IS", "NULL", "BETWEEN", "IN", "LIKE", "TRUE", "FALSE", "CASE", "WHEN",
    "THEN", "ELSE", "END",
];

const FORBIDDEN_SEQUENCES: &[&str] = &[";", "--", "/*"];

/// SQLite bind-parameter markers; expression text never carries placeholders
const PARAMETER_SIGILS: &[char] = &['?', ':', '@', '$'];

fn in_list(list: &[&str], token: &str) -> bool {
    list.iter().any(|k| k.eq_ignore_ascii_case(token))
}

/// True for allowed SQL functions, matched case-insensitively
pub fn is_allowed_function(token: &str) -> bool {
    in_list(ALLOWED_FUNCTIONS, token)
}

/// True for allowed SQL keywords, matched case-insensitively
pub fn is_allowed_keyword(token: &str) -> bool {
    in_list(ALLOWED_KEYWORDS, token)
}

/// Expression text that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeExpression(String);

impl SafeExpression {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Wrap trusted text (template bodies) without validation
    pub(crate) fn trusted(text: String) -> Self {
        Self(text)
    }
}

impl fmt::Display for SafeExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SafeExpression {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Checks free-form expressions for safety and catalog membership
#[derive(Debug, Clone)]
pub struct ExpressionValidator {
    catalog: Arc<Catalog>,
}

impl ExpressionValidator {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn validate(&self, expr: &str) -> Result<SafeExpression> {
        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return Err(ScreenerError::EmptyExpression);
        }

        if let Some(seq) = FORBIDDEN_SEQUENCES.iter().find(|s| trimmed.contains(*s)) {
            return Err(ScreenerError::UnsafeExpression(format!(
                "'{}' not allowed in expressions",
                seq
            )));
        }

        if let Some(sigil) = trimmed.chars().find(|c| PARAMETER_SIGILS.contains(c)) {
            return Err(ScreenerError::UnsafeExpression(format!(
                "parameter marker '{}' not allowed in expressions",
                sigil
            )));
        }

        // An open literal would swallow the SQL appended after the expression
        if trimmed.matches('\'').count() % 2 != 0 {
            return Err(ScreenerError::UnsafeExpression(
                "unbalanced quote in expression".to_string(),
            ));
        }

        let tokens = tokenizer::identifiers(trimmed);

        // Denylist first, so "DROP TABLE users" reports the keyword, not `users`
        if let Some(token) = tokens.iter().find(|t| in_list(DENIED_KEYWORDS, t.text)) {
            return Err(ScreenerError::UnsafeExpression(format!(
                "keyword '{}' not allowed in expressions",
                token.text.to_ascii_uppercase()
            )));
        }

        for token in &tokens {
            if is_allowed_function(token.text)
                || is_allowed_keyword(token.text)
                || self.catalog.contains(token.text)
            {
                continue;
            }
            return Err(ScreenerError::UnknownField(token.text.to_string()));
        }

        Ok(SafeExpression(trimmed.to_string()))
    }
}
