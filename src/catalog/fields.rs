//! Standard field table

use super::{FieldDescriptor, SemanticType, SourceTable};

use SemanticType::{Float, Int};
use SourceTable::{Candles, Fundamentals, Indicators};

const STANDARD_FIELDS: &[(&str, SemanticType, SourceTable)] = &[
    // OHLCV
    ("open", Float, Candles),
    ("high", Float, Candles),
    ("low", Float, Candles),
    ("close", Float, Candles),
    ("volume", Float, Candles),
    // Moving averages
    ("sma_9", Float, Indicators),
    ("sma_21", Float, Indicators),
    ("sma_50", Float, Indicators),
    ("sma_100", Float, Indicators),
    ("sma_200", Float, Indicators),
    ("ema_9", Float, Indicators),
    ("ema_21", Float, Indicators),
    ("ema_50", Float, Indicators),
    ("ema_100", Float, Indicators),
    ("ema_200", Float, Indicators),
    ("wma_9", Float, Indicators),
    ("wma_21", Float, Indicators),
    ("wma_50", Float, Indicators),
    ("wma_100", Float, Indicators),
    ("wma_200", Float, Indicators),
    ("hma_9", Float, Indicators),
    ("hma_21", Float, Indicators),
    ("hma_50", Float, Indicators),
    ("hma_100", Float, Indicators),
    // Momentum
    ("rsi_7", Float, Indicators),
    ("rsi_14", Float, Indicators),
    ("rsi_21", Float, Indicators),
    ("macd_12_26_9", Float, Indicators),
    ("macd_signal_12_26_9", Float, Indicators),
    ("macd_hist_12_26_9", Float, Indicators),
    ("stochastic_k_14_3_3", Float, Indicators),
    ("stochastic_d_14_3_3", Float, Indicators),
    ("stochastic_k_9_3_3", Float, Indicators),
    ("stochastic_d_9_3_3", Float, Indicators),
    ("atr_14", Float, Indicators),
    ("cci_14", Float, Indicators),
    ("willr_14", Float, Indicators),
    ("roc_14", Float, Indicators),
    ("ao_5_34", Float, Indicators),
    // Volume
    ("obv", Float, Indicators),
    ("vwap", Float, Indicators),
    ("mfi_14", Float, Indicators),
    ("cmf_20", Float, Indicators),
    ("volume_osc_14_28", Float, Indicators),
    ("volume_sma_20", Float, Indicators),
    // Trend
    ("plus_di_14", Float, Indicators),
    ("minus_di_14", Float, Indicators),
    ("adx_14", Float, Indicators),
    ("supertrend_10_3", Float, Indicators),
    ("supertrend_14_2", Float, Indicators),
    // Bands and channels
    ("bb_upper_20_2", Float, Indicators),
    ("bb_mid_20_2", Float, Indicators),
    ("bb_lower_20_2", Float, Indicators),
    ("keltner_upper_20_2", Float, Indicators),
    ("keltner_mid_20", Float, Indicators),
    ("keltner_lower_20_2", Float, Indicators),
    ("donchian_upper_20", Float, Indicators),
    ("donchian_lower_20", Float, Indicators),
    // Ichimoku
    ("ichimoku_tenkan_sen", Float, Indicators),
    ("ichimoku_kijun_sen", Float, Indicators),
    ("ichimoku_senkou_span_a", Float, Indicators),
    ("ichimoku_senkou_span_b", Float, Indicators),
    ("ichimoku_chikou_span", Float, Indicators),
    // Pivots
    ("pivot", Float, Indicators),
    ("pivot_r1", Float, Indicators),
    ("pivot_s1", Float, Indicators),
    ("pivot_r2", Float, Indicators),
    ("pivot_s2", Float, Indicators),
    // Other
    ("stddev_20", Float, Indicators),
    ("tema_20", Float, Indicators),
    ("tema_50", Float, Indicators),
    ("tema_100", Float, Indicators),
    // Fundamentals
    ("market_cap", Int, Fundamentals),
    ("enterprise_value", Int, Fundamentals),
    ("trailing_pe", Float, Fundamentals),
    ("forward_pe", Float, Fundamentals),
    ("peg_ratio", Float, Fundamentals),
    ("price_to_book", Float, Fundamentals),
    ("price_to_sales", Float, Fundamentals),
    ("enterprise_to_revenue", Float, Fundamentals),
    ("enterprise_to_ebitda", Float, Fundamentals),
    ("roe", Float, Fundamentals),
    ("roa", Float, Fundamentals),
    ("gross_margin", Float, Fundamentals),
    ("operating_margin", Float, Fundamentals),
    ("profit_margin", Float, Fundamentals),
    ("ebitda_margin", Float, Fundamentals),
    ("free_cash_flow", Int, Fundamentals),
    ("operating_cash_flow", Int, Fundamentals),
    ("debt_to_equity", Float, Fundamentals),
    ("current_ratio", Float, Fundamentals),
    ("total_debt", Int, Fundamentals),
    ("total_cash", Int, Fundamentals),
    ("revenue_growth", Float, Fundamentals),
    ("earnings_growth", Float, Fundamentals),
    ("quarterly_revenue_growth", Float, Fundamentals),
    ("quarterly_earnings_growth", Float, Fundamentals),
    ("dividend_yield", Float, Fundamentals),
    ("dividend_rate", Float, Fundamentals),
    ("payout_ratio", Float, Fundamentals),
    ("insider_holding", Float, Fundamentals),
    ("institutional_holding", Float, Fundamentals),
    ("float_shares", Int, Fundamentals),
    ("shares_outstanding", Int, Fundamentals),
    ("beta", Float, Fundamentals),
    ("short_ratio", Float, Fundamentals),
    ("short_percent_of_float", Float, Fundamentals),
    ("previous_close", Float, Fundamentals),
    ("fifty_day_avg", Float, Fundamentals),
    ("two_hundred_day_avg", Float, Fundamentals),
    ("current_price", Float, Fundamentals),
];

pub(super) fn standard_fields() -> Vec<FieldDescriptor> {
    STANDARD_FIELDS
        .iter()
        .map(|&(name, semantic_type, source_table)| {
            FieldDescriptor::new(name, semantic_type, source_table)
        })
        .collect()
}
