//! Point-in-time indicator values for report decoration.

use super::{Ema, Indicator, Rsi, Sma};
use crate::domain::Series;
use serde::{Deserialize, Serialize};

pub const RSI_PERIOD: usize = 14;
pub const MA_PERIOD: usize = 20;
const NEUTRAL_RSI: f64 = 50.0;

/// Indicator readings at the last candle.
///
/// Missing readings fall back to neutral values: RSI 50, averages equal to
/// the last close, zero change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub rsi: f64,
    pub sma_20: f64,
    pub ema_20: f64,
    pub current_price: f64,
    pub price_change: f64,
    pub price_change_pct: f64,
}

impl IndicatorSnapshot {
    /// Compute over the most recent `window` candles.
    pub fn compute(series: &Series, window: usize) -> Option<Self> {
        let recent = series.tail(window);
        let candles = recent.candles();
        let last = candles.last()?;
        let current_price = last.close;

        let last_value = |values: Vec<f64>, fallback: f64| {
            values
                .last()
                .copied()
                .filter(|v| v.is_finite())
                .unwrap_or(fallback)
        };

        let (price_change, price_change_pct) = match candles.len().checked_sub(2) {
            Some(prev) if candles[prev].close != 0.0 => {
                let change = current_price - candles[prev].close;
                (change, change / candles[prev].close * 100.0)
            }
            _ => (0.0, 0.0),
        };

        Some(Self {
            rsi: last_value(Rsi::new(RSI_PERIOD).compute(candles), NEUTRAL_RSI),
            sma_20: last_value(Sma::new(MA_PERIOD).compute(candles), current_price),
            ema_20: last_value(Ema::new(MA_PERIOD).compute(candles), current_price),
            current_price,
            price_change,
            price_change_pct,
        })
    }
}
