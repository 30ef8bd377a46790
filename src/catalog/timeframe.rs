//! Candle timeframes and their storage mappings

use crate::error::ScreenerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Candle aggregation interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Timeframe {
    OneMin,
    ThreeMin,
    FiveMin,
    FifteenMin,
    ThirtyMin,
    OneHour,
    TwoHour,
    FourHour,
}

impl Timeframe {
    pub const ALL: [Timeframe; 8] = [
        Timeframe::OneMin,
        Timeframe::ThreeMin,
        Timeframe::FiveMin,
        Timeframe::FifteenMin,
        Timeframe::ThirtyMin,
        Timeframe::OneHour,
        Timeframe::TwoHour,
        Timeframe::FourHour,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::OneMin => "1min",
            Timeframe::ThreeMin => "3min",
            Timeframe::FiveMin => "5min",
            Timeframe::FifteenMin => "15min",
            Timeframe::ThirtyMin => "30min",
            Timeframe::OneHour => "1hr",
            Timeframe::TwoHour => "2hr",
            Timeframe::FourHour => "4hr",
        }
    }

    /// Candle table holding this timeframe's bars
    pub fn table_name(&self) -> &'static str {
        match self {
            Timeframe::OneMin => "one_min_candle_data",
            Timeframe::ThreeMin => "candles_3min",
            Timeframe::FiveMin => "candles_5min",
            Timeframe::FifteenMin => "candles_15min",
            Timeframe::ThirtyMin => "candles_30min",
            Timeframe::OneHour => "candles_1hr",
            Timeframe::TwoHour => "candles_2hr",
            Timeframe::FourHour => "candles_4hr",
        }
    }

    /// Value of `indicators.timeframe` for rows computed on this timeframe
    pub fn indicator_label(&self) -> &'static str {
        match self {
            Timeframe::OneMin => "1min",
            Timeframe::ThreeMin => "3min",
            Timeframe::FiveMin => "5min",
            Timeframe::FifteenMin => "15min",
            Timeframe::ThirtyMin => "30min",
            Timeframe::OneHour => "1h",
            Timeframe::TwoHour => "2h",
            Timeframe::FourHour => "4h",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ScreenerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.as_str() == s)
            .ok_or_else(|| ScreenerError::UnknownTimeframe(s.to_string()))
    }
}

impl TryFrom<String> for Timeframe {
    type Error = ScreenerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timeframe> for String {
    fn from(tf: Timeframe) -> Self {
        tf.as_str().to_string()
    }
}
