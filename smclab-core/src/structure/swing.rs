//! Swing point detection: local extrema over a centered window.
//!
//! A candle is a swing high when its high equals the maximum high of the
//! `2 * lookback + 1` candles centered on it, and a swing low when its low
//! equals the window's minimum low. The first and last `lookback` candles have
//! no full window and are never flagged. Ties flag every tied candle, and a
//! single candle may be both.

use crate::domain::Candle;
use serde::{Deserialize, Serialize};

/// Default half-width of the swing window.
pub const DEFAULT_SWING_LOOKBACK: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwingKind {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub index: usize,
    pub kind: SwingKind,
}

/// Per-candle swing flags, parallel to the input candles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwingFlags {
    highs: Vec<bool>,
    lows: Vec<bool>,
}

impl SwingFlags {
    pub fn len(&self) -> usize {
        self.highs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.highs.is_empty()
    }

    pub fn is_high(&self, index: usize) -> bool {
        self.highs.get(index).copied().unwrap_or(false)
    }

    pub fn is_low(&self, index: usize) -> bool {
        self.lows.get(index).copied().unwrap_or(false)
    }

    /// Flagged candles in index order; a candle that is both yields the high first.
    pub fn points(&self) -> Vec<SwingPoint> {
        let mut points = Vec::new();
        for index in 0..self.len() {
            if self.highs[index] {
                points.push(SwingPoint {
                    index,
                    kind: SwingKind::High,
                });
            }
            if self.lows[index] {
                points.push(SwingPoint {
                    index,
                    kind: SwingKind::Low,
                });
            }
        }
        points
    }
}

/// Flag swing highs and lows over the full candle history.
pub fn detect_swings(candles: &[Candle], lookback: usize) -> SwingFlags {
    let n = candles.len();
    let mut flags = SwingFlags {
        highs: vec![false; n],
        lows: vec![false; n],
    };

    let width = 2 * lookback + 1;
    if n < width {
        return flags;
    }

    for i in lookback..(n - lookback) {
        let window = &candles[i - lookback..=i + lookback];
        let max_high = window
            .iter()
            .map(|c| c.high)
            .fold(f64::NEG_INFINITY, f64::max);
        let min_low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);

        flags.highs[i] = candles[i].high == max_high;
        flags.lows[i] = candles[i].low == min_low;
    }

    flags
}
