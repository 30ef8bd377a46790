//! Identifier tokenizer
//!
//! Validation and alias rewriting both walk expressions with this tokenizer,
//! so whatever is checked is exactly what gets rewritten.

use regex::Regex;
use std::sync::LazyLock;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]*\b").expect("identifier pattern is valid")
});

/// One identifier occurrence inside an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
    /// Preceded by `.`, i.e. already table-qualified (`c2.high`)
    pub qualified: bool,
}

/// All identifier tokens of `expr`, left to right
pub fn identifiers(expr: &str) -> Vec<Token<'_>> {
    IDENTIFIER
        .find_iter(expr)
        .map(|m| Token {
            text: m.as_str(),
            start: m.start(),
            end: m.end(),
            qualified: expr[..m.start()].ends_with('.'),
        })
        .collect()
}

/// Rebuild `expr`, replacing each token for which `rewrite` returns `Some`.
/// Everything between tokens is copied through untouched.
pub fn rewrite<F>(expr: &str, mut rewrite: F) -> String
where
    F: FnMut(&Token<'_>) -> Option<String>,
{
    let mut out = String::with_capacity(expr.len() + 16);
    let mut cursor = 0;

    for token in identifiers(expr) {
        if let Some(replacement) = rewrite(&token) {
            out.push_str(&expr[cursor..token.start]);
            out.push_str(&replacement);
            cursor = token.end;
        }
    }
    out.push_str(&expr[cursor..]);
    out
}
