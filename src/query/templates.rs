//! Named filter templates
//!
//! Template bodies are trusted, pre-authored SQL boolean expressions with
//! `{param}` placeholders. User input only ever reaches a body through a
//! declared, type-checked and range-checked parameter.

use super::validator::SafeExpression;
use crate::error::{Result, ScreenerError};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// Placeholders filled from the query context rather than from parameters
pub const TABLE_NAME_PLACEHOLDER: &str = "table_name";
pub const TABLE_ALIAS_PLACEHOLDER: &str = "table_alias";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Int,
    Float,
    #[serde(rename = "str")]
    Str,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamDefault {
    Int(i64),
    Float(f64),
    Str(&'static str),
}

impl ParamDefault {
    fn to_value(self) -> Value {
        match self {
            ParamDefault::Int(i) => Value::from(i),
            ParamDefault::Float(f) => Value::from(f),
            ParamDefault::Str(s) => Value::from(s),
        }
    }
}

/// Declared template parameter
#[derive(Debug, Clone, Serialize)]
pub struct ParamSpec {
    #[serde(skip)]
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: ParamKind,
    pub default: ParamDefault,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "no_options")]
    pub options: &'static [&'static str],
    pub description: &'static str,
}

fn no_options(options: &&'static [&'static str]) -> bool {
    options.is_empty()
}

/// A registered template
#[derive(Debug, Clone)]
pub struct TemplateDef {
    pub name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub body: &'static str,
    pub params: &'static [ParamSpec],
}

impl TemplateDef {
    /// Body uses window-function syntax
    pub fn uses_window_functions(&self) -> bool {
        let upper = self.body.to_ascii_uppercase();
        upper.contains("LAG(") || upper.contains("PARTITION BY")
    }
}

/// Template listing entry
#[derive(Debug, Clone, Serialize)]
pub struct TemplateInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: BTreeMap<&'static str, ParamSpec>,
    pub category: &'static str,
}

/// Table context for the reserved `{table_name}` / `{table_alias}` placeholders
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    pub table_name: &'a str,
    pub table_alias: &'a str,
}

const fn int(
    name: &'static str,
    default: i64,
    min: f64,
    max: f64,
    description: &'static str,
) -> ParamSpec {
    ParamSpec {
        name,
        kind: ParamKind::Int,
        default: ParamDefault::Int(default),
        min: Some(min),
        max: Some(max),
        options: &[],
        description,
    }
}

const fn float(
    name: &'static str,
    default: f64,
    min: f64,
    max: f64,
    description: &'static str,
) -> ParamSpec {
    ParamSpec {
        name,
        kind: ParamKind::Float,
        default: ParamDefault::Float(default),
        min: Some(min),
        max: Some(max),
        options: &[],
        description,
    }
}

const RSI_PERIOD: ParamSpec = int("period", 14, 5.0, 50.0, "RSI period");
const MACD_FAST: ParamSpec = int("fast", 12, 5.0, 20.0, "Fast EMA period");
const MACD_SLOW: ParamSpec = int("slow", 26, 15.0, 40.0, "Slow EMA period");
const MACD_SIGNAL: ParamSpec = int("signal", 9, 5.0, 15.0, "Signal line period");
const MA_SHORT: ParamSpec = int("short_period", 50, 10.0, 100.0, "Short MA period");
const MA_LONG: ParamSpec = int("long_period", 200, 50.0, 500.0, "Long MA period");
const ADX_THRESHOLD: ParamSpec = float("adx_threshold", 25.0, 20.0, 50.0, "ADX threshold");
const GAP_THRESHOLD: ParamSpec = float("gap_threshold", 0.02, 0.01, 0.1, "Gap threshold %");
const STOCH_K: ParamSpec = int("k_period", 14, 5.0, 30.0, "Stochastic K period");

static STANDARD_TEMPLATES: &[TemplateDef] = &[
    TemplateDef {
        name: "oversold_rsi",
        description: "Stocks with RSI below oversold threshold",
        category: "momentum",
        body: "rsi_{period} < {threshold}",
        params: &[RSI_PERIOD, float("threshold", 30.0, 10.0, 50.0, "Oversold threshold")],
    },
    TemplateDef {
        name: "overbought_rsi",
        description: "Stocks with RSI above overbought threshold",
        category: "momentum",
        body: "rsi_{period} > {threshold}",
        params: &[RSI_PERIOD, float("threshold", 70.0, 50.0, 90.0, "Overbought threshold")],
    },
    TemplateDef {
        name: "rsi_neutral",
        description: "Stocks with RSI in neutral range",
        category: "momentum",
        body: "rsi_{period} BETWEEN {lower_bound} AND {upper_bound}",
        params: &[
            RSI_PERIOD,
            float("lower_bound", 40.0, 20.0, 50.0, "Lower bound"),
            float("upper_bound", 60.0, 50.0, 80.0, "Upper bound"),
        ],
    },
    TemplateDef {
        name: "golden_cross",
        description: "Short-term MA crosses above long-term MA (bullish)",
        category: "trend",
        body: "
            sma_{short_period} > sma_{long_period}
            AND LAG(sma_{short_period}) OVER (PARTITION BY symbol ORDER BY datetime) <=
                LAG(sma_{long_period}) OVER (PARTITION BY symbol ORDER BY datetime)
        ",
        params: &[MA_SHORT, MA_LONG],
    },
    TemplateDef {
        name: "death_cross",
        description: "Short-term MA crosses below long-term MA (bearish)",
        category: "trend",
        body: "
            sma_{short_period} < sma_{long_period}
            AND LAG(sma_{short_period}) OVER (PARTITION BY symbol ORDER BY datetime) >=
                LAG(sma_{long_period}) OVER (PARTITION BY symbol ORDER BY datetime)
        ",
        params: &[MA_SHORT, MA_LONG],
    },
    TemplateDef {
        name: "price_above_ma",
        description: "Price trading above moving average",
        category: "trend",
        body: "close > {ma_type}_{period} * {threshold_multiplier}",
        params: &[
            ParamSpec {
                name: "ma_type",
                kind: ParamKind::Str,
                default: ParamDefault::Str("sma"),
                min: None,
                max: None,
                options: &["sma", "ema", "wma", "hma"],
                description: "MA type",
            },
            int("period", 50, 5.0, 200.0, "MA period"),
            float("threshold_multiplier", 1.0, 0.95, 1.1, "Price threshold multiplier"),
        ],
    },
    TemplateDef {
        name: "volume_breakout",
        description: "High volume with significant price movement",
        category: "volume",
        body: "
            volume > volume_sma_20 * {volume_multiplier}
            AND ABS((close - open) / open) > {price_change_threshold}
        ",
        params: &[
            float("volume_multiplier", 2.0, 1.2, 5.0, "Volume spike multiplier"),
            float("price_change_threshold", 0.02, 0.01, 0.1, "Min price change %"),
        ],
    },
    TemplateDef {
        name: "high_volume",
        description: "Stocks with volume above average",
        category: "volume",
        body: "volume > volume_sma_20 * {multiplier}",
        params: &[float("multiplier", 1.5, 1.1, 5.0, "Volume multiplier")],
    },
    TemplateDef {
        name: "low_volume",
        description: "Stocks with volume below average",
        category: "volume",
        body: "volume < volume_sma_20 * {multiplier}",
        params: &[float("multiplier", 0.8, 0.1, 0.9, "Volume multiplier")],
    },
    TemplateDef {
        name: "bullish_macd",
        description: "MACD line above signal line (bullish momentum)",
        category: "momentum",
        body: "macd_{fast}_{slow}_{signal} > macd_signal_{fast}_{slow}_{signal}",
        params: &[MACD_FAST, MACD_SLOW, MACD_SIGNAL],
    },
    TemplateDef {
        name: "bearish_macd",
        description: "MACD line below signal line (bearish momentum)",
        category: "momentum",
        body: "macd_{fast}_{slow}_{signal} < macd_signal_{fast}_{slow}_{signal}",
        params: &[MACD_FAST, MACD_SLOW, MACD_SIGNAL],
    },
    TemplateDef {
        name: "macd_crossover",
        description: "MACD just crossed above signal line",
        category: "momentum",
        body: "
            macd_{fast}_{slow}_{signal} > macd_signal_{fast}_{slow}_{signal}
            AND LAG(macd_{fast}_{slow}_{signal}) OVER (PARTITION BY symbol ORDER BY datetime) <=
                LAG(macd_signal_{fast}_{slow}_{signal}) OVER (PARTITION BY symbol ORDER BY datetime)
        ",
        params: &[MACD_FAST, MACD_SLOW, MACD_SIGNAL],
    },
    TemplateDef {
        name: "bollinger_squeeze",
        description: "Bollinger Bands squeeze - low volatility",
        category: "volatility",
        body: "(bb_upper_20_2 - bb_lower_20_2) / close < {squeeze_threshold}",
        params: &[float("squeeze_threshold", 0.04, 0.01, 0.1, "Squeeze threshold")],
    },
    TemplateDef {
        name: "bollinger_breakout",
        description: "Price breaking out of Bollinger Bands",
        category: "volatility",
        body: "
            (close > bb_upper_20_2 OR close < bb_lower_20_2)
            AND volume > volume_sma_20 * {volume_threshold}
        ",
        params: &[float("volume_threshold", 1.5, 1.1, 3.0, "Volume confirmation")],
    },
    TemplateDef {
        name: "bb_oversold",
        description: "Price near lower Bollinger Band",
        category: "mean_reversion",
        body: "close < bb_lower_20_2 * {threshold}",
        params: &[float("threshold", 1.01, 1.0, 1.05, "Distance threshold")],
    },
    TemplateDef {
        name: "bb_overbought",
        description: "Price near upper Bollinger Band",
        category: "mean_reversion",
        body: "close > bb_upper_20_2 * {threshold}",
        params: &[float("threshold", 0.99, 0.95, 1.0, "Distance threshold")],
    },
    TemplateDef {
        name: "strong_trend",
        description: "Strong trending market (high ADX)",
        category: "trend",
        body: "adx_14 > {adx_threshold}",
        params: &[ADX_THRESHOLD],
    },
    TemplateDef {
        name: "bullish_trend",
        description: "Strong bullish trend (+DI > -DI and high ADX)",
        category: "trend",
        body: "
            plus_di_14 > minus_di_14
            AND adx_14 > {adx_threshold}
        ",
        params: &[ADX_THRESHOLD],
    },
    TemplateDef {
        name: "bearish_trend",
        description: "Strong bearish trend (-DI > +DI and high ADX)",
        category: "trend",
        body: "
            minus_di_14 > plus_di_14
            AND adx_14 > {adx_threshold}
        ",
        params: &[ADX_THRESHOLD],
    },
    TemplateDef {
        name: "stochastic_oversold",
        description: "Stochastic in oversold territory",
        category: "momentum",
        body: "
            stochastic_k_{k_period}_3_3 < {threshold}
            AND stochastic_d_{k_period}_3_3 < {threshold}
        ",
        params: &[STOCH_K, float("threshold", 20.0, 10.0, 30.0, "Oversold threshold")],
    },
    TemplateDef {
        name: "stochastic_overbought",
        description: "Stochastic in overbought territory",
        category: "momentum",
        body: "
            stochastic_k_{k_period}_3_3 > {threshold}
            AND stochastic_d_{k_period}_3_3 > {threshold}
        ",
        params: &[STOCH_K, float("threshold", 80.0, 70.0, 90.0, "Overbought threshold")],
    },
    TemplateDef {
        name: "momentum_breakout",
        description: "Multiple momentum indicators aligned bullishly",
        category: "combination",
        body: "
            rsi_14 > {rsi_threshold}
            AND macd_12_26_9 > macd_signal_12_26_9
            AND close > sma_21
            AND volume > volume_sma_20 * {volume_multiplier}
        ",
        params: &[
            float("rsi_threshold", 50.0, 40.0, 70.0, "RSI threshold"),
            float("volume_multiplier", 1.2, 1.0, 2.0, "Volume multiplier"),
        ],
    },
    TemplateDef {
        name: "oversold_reversal",
        description: "Potential oversold reversal setup",
        category: "combination",
        body: "
            rsi_14 < {rsi_threshold}
            AND close < bb_lower_20_2
            AND volume > volume_sma_20 * {volume_multiplier}
        ",
        params: &[
            float("rsi_threshold", 35.0, 20.0, 40.0, "RSI oversold level"),
            float("volume_multiplier", 1.5, 1.1, 3.0, "Volume confirmation"),
        ],
    },
    TemplateDef {
        name: "gap_up",
        description: "Stocks that gapped up significantly",
        category: "price_action",
        body: "
            (open - LAG(close) OVER (PARTITION BY symbol ORDER BY datetime)) /
            LAG(close) OVER (PARTITION BY symbol ORDER BY datetime) > {gap_threshold}
        ",
        params: &[GAP_THRESHOLD],
    },
    TemplateDef {
        name: "gap_down",
        description: "Stocks that gapped down significantly",
        category: "price_action",
        body: "
            (open - LAG(close) OVER (PARTITION BY symbol ORDER BY datetime)) /
            LAG(close) OVER (PARTITION BY symbol ORDER BY datetime) < -{gap_threshold}
        ",
        params: &[GAP_THRESHOLD],
    },
    TemplateDef {
        name: "new_highs",
        description: "Stocks making new highs over specified period",
        category: "price_action",
        body: "
            high = (
                SELECT MAX(c2.high)
                FROM {table_name} c2
                WHERE c2.symbol = {table_alias}.symbol
                AND c2.datetime >= datetime({table_alias}.datetime, '-{lookback_days} days')
                AND c2.datetime <= {table_alias}.datetime
            )
        ",
        params: &[int("lookback_days", 20, 5.0, 252.0, "Lookback period in days")],
    },
];

/// Resolves named templates into expression text
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    templates: &'static [TemplateDef],
}

impl TemplateEngine {
    pub fn standard() -> Self {
        Self {
            templates: STANDARD_TEMPLATES,
        }
    }

    pub fn get(&self, name: &str) -> Result<&TemplateDef> {
        self.templates
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| ScreenerError::UnknownTemplate(name.to_string()))
    }

    pub fn list_templates(&self) -> Vec<TemplateInfo> {
        self.templates
            .iter()
            .map(|t| TemplateInfo {
                name: t.name,
                description: t.description,
                parameters: t.params.iter().map(|p| (p.name, p.clone())).collect(),
                category: t.category,
            })
            .collect()
    }

    /// Distinct categories, sorted
    pub fn categories(&self) -> Vec<&'static str> {
        let mut categories: Vec<&'static str> = self.templates.iter().map(|t| t.category).collect();
        categories.sort_unstable();
        categories.dedup();
        categories
    }

    /// Resolve a template that needs no table context
    pub fn resolve(&self, name: &str, params: &Map<String, Value>) -> Result<SafeExpression> {
        self.render(name, params, None)
    }

    /// Resolve a template, filling table placeholders from `ctx`
    pub fn resolve_for(
        &self,
        name: &str,
        params: &Map<String, Value>,
        ctx: TemplateContext<'_>,
    ) -> Result<SafeExpression> {
        self.render(name, params, Some(ctx))
    }

    fn render(
        &self,
        name: &str,
        params: &Map<String, Value>,
        ctx: Option<TemplateContext<'_>>,
    ) -> Result<SafeExpression> {
        let template = self.get(name)?;

        let mut values: BTreeMap<&str, String> = BTreeMap::new();
        for spec in template.params {
            let rendered = match params.get(spec.name) {
                None | Some(Value::Null) => coerce(spec, &spec.default.to_value())?,
                Some(value) => coerce(spec, value)?,
            };
            values.insert(spec.name, rendered);
        }

        let mut missing = None;
        let body = PLACEHOLDER.replace_all(template.body, |caps: &regex::Captures<'_>| {
            let key = &caps[1];
            let filled = match (key, ctx) {
                (TABLE_NAME_PLACEHOLDER, Some(ctx)) => Some(ctx.table_name.to_string()),
                (TABLE_ALIAS_PLACEHOLDER, Some(ctx)) => Some(ctx.table_alias.to_string()),
                _ => values.get(key).cloned(),
            };
            filled.unwrap_or_else(|| {
                missing.get_or_insert_with(|| key.to_string());
                String::new()
            })
        });

        if let Some(placeholder) = missing {
            return Err(ScreenerError::TemplatePlaceholder {
                template: name.to_string(),
                placeholder,
            });
        }

        let collapsed = body.split_whitespace().collect::<Vec<_>>().join(" ");
        Ok(SafeExpression::trusted(collapsed))
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::standard()
    }
}

/// Coerce a parameter value to its declared kind and render it as SQL text
fn coerce(spec: &ParamSpec, value: &Value) -> Result<String> {
    match spec.kind {
        ParamKind::Int => {
            let n = coerce_int(value).ok_or_else(|| ScreenerError::InvalidParameterType {
                param: spec.name.to_string(),
                expected: "an integer",
            })?;
            check_range(spec, n as f64)?;
            Ok(n.to_string())
        }
        ParamKind::Float => {
            let n = coerce_float(value).ok_or_else(|| ScreenerError::InvalidParameterType {
                param: spec.name.to_string(),
                expected: "a number",
            })?;
            check_range(spec, n)?;
            Ok(n.to_string())
        }
        ParamKind::Str => {
            let s = value.as_str().ok_or_else(|| ScreenerError::InvalidParameterType {
                param: spec.name.to_string(),
                expected: "a string",
            })?;
            if !spec.options.is_empty() {
                if !spec.options.contains(&s) {
                    return Err(ScreenerError::InvalidParameterValue {
                        param: spec.name.to_string(),
                        reason: format!("must be one of {:?}", spec.options),
                    });
                }
            } else if s.is_empty() || !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(ScreenerError::InvalidParameterValue {
                    param: spec.name.to_string(),
                    reason: "must be a plain identifier".to_string(),
                });
            }
            Ok(s.to_string())
        }
    }
}

fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn coerce_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn check_range(spec: &ParamSpec, n: f64) -> Result<()> {
    if let Some(min) = spec.min {
        if n < min {
            return Err(ScreenerError::ParameterOutOfRange {
                param: spec.name.to_string(),
                bound: format!(">= {}", min),
            });
        }
    }
    if let Some(max) = spec.max {
        if n > max {
            return Err(ScreenerError::ParameterOutOfRange {
                param: spec.name.to_string(),
                bound: format!("<= {}", max),
            });
        }
    }
    Ok(())
}
