//! Advisory query complexity estimate

use super::filters::FilterUnit;
use super::templates::TemplateEngine;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    pub fn from_score(score: u32) -> Self {
        match score {
            0..=3 => Complexity::Low,
            4..=8 => Complexity::Medium,
            _ => Complexity::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Low => "low",
            Complexity::Medium => "medium",
            Complexity::High => "high",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score a set of filter units. Never fails: unknown templates count as plain ones.
pub fn score(units: &[FilterUnit], templates: &TemplateEngine) -> u32 {
    units
        .iter()
        .map(|unit| match unit {
            FilterUnit::Simple(_) | FilterUnit::Fundamentals(_) => 1,
            FilterUnit::Expression(expr) => {
                let upper = expr.to_ascii_uppercase();
                if upper.contains("LAG(") || upper.contains("LEAD(") {
                    5
                } else {
                    3
                }
            }
            FilterUnit::Template(t) => match templates.get(&t.name) {
                Ok(def) if def.uses_window_functions() => 4,
                _ => 2,
            },
            FilterUnit::MultiTimeframe(_) => 4,
        })
        .sum()
}

pub fn estimate(units: &[FilterUnit], templates: &TemplateEngine) -> Complexity {
    Complexity::from_score(score(units, templates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Operator;
    use crate::query::filters::{FieldCondition, Logic, MultiTimeframeFilter, TemplateFilter};

    fn simple() -> FilterUnit {
        FilterUnit::Simple(FieldCondition::new("rsi_14", Operator::IsNotNull, None))
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(Complexity::from_score(0), Complexity::Low);
        assert_eq!(Complexity::from_score(3), Complexity::Low);
        assert_eq!(Complexity::from_score(4), Complexity::Medium);
        assert_eq!(Complexity::from_score(8), Complexity::Medium);
        assert_eq!(Complexity::from_score(9), Complexity::High);
    }

    #[test]
    fn test_scoring() {
        let engine = TemplateEngine::standard();
        assert_eq!(score(&[simple(), simple(), simple()], &engine), 3);
        assert_eq!(score(&[FilterUnit::Expression("close > open".into())], &engine), 3);
        assert_eq!(
            score(&[FilterUnit::Expression("close > lag(close)".into())], &engine),
            5
        );
        assert_eq!(
            score(&[FilterUnit::Template(TemplateFilter::new("golden_cross"))], &engine),
            4
        );
        assert_eq!(
            score(&[FilterUnit::Template(TemplateFilter::new("high_volume"))], &engine),
            2
        );
    }

    #[test]
    fn test_multi_timeframe_is_high_quickly() {
        let engine = TemplateEngine::standard();
        let mt = FilterUnit::MultiTimeframe(MultiTimeframeFilter {
            conditions: vec![],
            logic: Logic::And,
            description: None,
        });
        assert_eq!(estimate(&[mt.clone(), mt.clone()], &engine), Complexity::Medium);
        assert_eq!(estimate(&[mt.clone(), mt, simple()], &engine), Complexity::High);
    }
}
