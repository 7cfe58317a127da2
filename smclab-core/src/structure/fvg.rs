//! Fair value gap detection over 3-candle windows.
//!
//! For the window `(i-2, i-1, i)`:
//! - bullish gap at `i-1` when `low[i-2] > high[i]` (top = `low[i-2]`, bottom = `high[i]`)
//! - otherwise bearish gap at `i-1` when `high[i-2] < low[i]` (the zone spans
//!   `high[i-2]..low[i]`, stored as top = `low[i]`, bottom = `high[i-2]`)
//!
//! The bullish test runs first, so a middle candle carries at most one gap.
//! A gap is only known once its third candle has closed.

use crate::domain::{Candle, Direction};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FairValueGap {
    /// Middle candle of the pattern.
    pub index: usize,
    pub direction: Direction,
    pub top: f64,
    pub bottom: f64,
    /// Set by a later fill-tracking pass; detection always leaves it false.
    pub filled: bool,
}

impl FairValueGap {
    /// Index of the candle that completes the pattern.
    pub fn confirmed_at(&self) -> usize {
        self.index + 1
    }

    pub fn is_well_formed(&self) -> bool {
        self.top > self.bottom
    }
}

pub fn detect_fair_value_gaps(candles: &[Candle]) -> Vec<FairValueGap> {
    let mut gaps = Vec::new();

    for i in 2..candles.len() {
        let first = &candles[i - 2];
        let third = &candles[i];

        let gap = if first.low > third.high {
            Some((Direction::Bull, first.low, third.high))
        } else if first.high < third.low {
            Some((Direction::Bear, third.low, first.high))
        } else {
            None
        };

        if let Some((direction, top, bottom)) = gap {
            gaps.push(FairValueGap {
                index: i - 1,
                direction,
                top,
                bottom,
                filled: false,
            });
        }
    }

    gaps
}
