//! Liquidity sweeps: a wick through the recent range that closes back inside.
//!
//! `recent_high[i]` / `recent_low[i]` are the max high / min low of the five
//! candles before `i` (the current candle is excluded), so the first five
//! candles can never sweep.
//!
//! - bearish sweep: `high[i] > recent_high[i] && close[i] < recent_high[i]`
//! - bullish sweep: `low[i] < recent_low[i] && close[i] > recent_low[i]`
//!
//! If both hold on one candle the bullish reading is kept.

use crate::domain::{Candle, Direction};
use serde::{Deserialize, Serialize};

/// Number of prior candles forming the swept range.
pub const SWEEP_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquiditySweep {
    pub index: usize,
    pub direction: Direction,
    /// The prior extreme that was taken out.
    pub level: f64,
}

/// Which resting orders a sweep consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquiditySide {
    /// Stops above recent highs, taken by a bearish sweep.
    BuySide,
    /// Stops below recent lows, taken by a bullish sweep.
    SellSide,
}

/// Output view of a sweep: the level that was run and how far the wick went.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidityZone {
    pub index: usize,
    pub side: LiquiditySide,
    pub level: f64,
    pub wick: f64,
}

impl LiquidityZone {
    pub fn from_sweep(sweep: &LiquiditySweep, candle: &Candle) -> Self {
        match sweep.direction {
            Direction::Bear => Self {
                index: sweep.index,
                side: LiquiditySide::BuySide,
                level: sweep.level,
                wick: candle.high,
            },
            Direction::Bull => Self {
                index: sweep.index,
                side: LiquiditySide::SellSide,
                level: sweep.level,
                wick: candle.low,
            },
        }
    }
}

/// Rolling prior-window extremes; `None` until a full window exists.
pub fn recent_extremes(candles: &[Candle]) -> Vec<Option<(f64, f64)>> {
    (0..candles.len())
        .map(|i| {
            if i < SWEEP_WINDOW {
                return None;
            }
            let window = &candles[i - SWEEP_WINDOW..i];
            let high = window
                .iter()
                .map(|c| c.high)
                .fold(f64::NEG_INFINITY, f64::max);
            let low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
            Some((high, low))
        })
        .collect()
}

pub fn detect_sweeps(candles: &[Candle]) -> Vec<LiquiditySweep> {
    recent_extremes(candles)
        .into_iter()
        .enumerate()
        .filter_map(|(index, extremes)| {
            let (recent_high, recent_low) = extremes?;
            let c = &candles[index];

            let bullish = c.low < recent_low && c.close > recent_low;
            let bearish = c.high > recent_high && c.close < recent_high;

            if bullish {
                Some(LiquiditySweep {
                    index,
                    direction: Direction::Bull,
                    level: recent_low,
                })
            } else if bearish {
                Some(LiquiditySweep {
                    index,
                    direction: Direction::Bear,
                    level: recent_high,
                })
            } else {
                None
            }
        })
        .collect()
}
