//! Condensed report: trend, signal strength, key levels and a recommendation.
//!
//! Strength comes from a replaceable `SignalScorer`. The default
//! `EventCountScorer` weights the truncated output lists:
//! strength = 0.3 * structure events + 0.2 * gaps + 0.1 * order blocks
//!          + 0.5 if RSI is outside [30, 70], capped at 10.

use crate::domain::Direction;
use crate::indicators::IndicatorSnapshot;
use crate::output::AnalysisOutput;
use crate::structure::LiquiditySide;
use serde::{Deserialize, Serialize};

const NEUTRAL_RSI: f64 = 50.0;
const KEY_LEVELS_PER_SOURCE: usize = 3;

/// Scores how much structure an analysis shows.
pub trait SignalScorer: Send + Sync {
    fn name(&self) -> &str;

    fn score(&self, output: &AnalysisOutput, rsi: f64) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventCountScorer {
    pub structure_weight: f64,
    pub gap_weight: f64,
    pub order_block_weight: f64,
    pub rsi_extreme_bonus: f64,
    pub cap: f64,
}

impl Default for EventCountScorer {
    fn default() -> Self {
        Self {
            structure_weight: 0.3,
            gap_weight: 0.2,
            order_block_weight: 0.1,
            rsi_extreme_bonus: 0.5,
            cap: 10.0,
        }
    }
}

impl SignalScorer for EventCountScorer {
    fn name(&self) -> &str {
        "event_count"
    }

    fn score(&self, output: &AnalysisOutput, rsi: f64) -> f64 {
        let mut strength = output.break_of_structure.len() as f64 * self.structure_weight
            + output.fair_value_gaps.len() as f64 * self.gap_weight
            + output.order_blocks.len() as f64 * self.order_block_weight;
        if rsi > 70.0 || rsi < 30.0 {
            strength += self.rsi_extreme_bonus;
        }
        strength.min(self.cap)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

impl From<Option<Direction>> for Trend {
    fn from(direction: Option<Direction>) -> Self {
        match direction {
            Some(Direction::Bull) => Self::Bullish,
            Some(Direction::Bear) => Self::Bearish,
            None => Self::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    StrongBuy,
    Buy,
    StrongSell,
    Sell,
    Hold,
}

impl Recommendation {
    pub fn from_strength(strength: f64, rsi: f64) -> Self {
        if strength > 7.0 && rsi < 30.0 {
            Self::StrongBuy
        } else if strength > 5.0 && rsi < 40.0 {
            Self::Buy
        } else if strength > 7.0 && rsi > 70.0 {
            Self::StrongSell
        } else if strength > 5.0 && rsi > 60.0 {
            Self::Sell
        } else {
            Self::Hold
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelSource {
    OrderBlock,
    Liquidity,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyLevel {
    pub source: LevelSource,
    pub price: f64,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub symbol: String,
    pub price: Option<f64>,
    pub rsi: f64,
    pub trend: Trend,
    pub signal_strength: f64,
    pub key_levels: Vec<KeyLevel>,
    pub recommendation: Recommendation,
}

/// Summarize one analysis output.
pub fn summarize(
    symbol: &str,
    output: &AnalysisOutput,
    indicators: Option<&IndicatorSnapshot>,
    scorer: &dyn SignalScorer,
) -> Summary {
    let rsi = indicators.map_or(NEUTRAL_RSI, |i| i.rsi);
    let signal_strength = scorer.score(output, rsi);
    let trend = Trend::from(output.break_of_structure.last().map(|e| e.item.direction));

    Summary {
        symbol: symbol.to_string(),
        price: indicators.map(|i| i.current_price),
        rsi,
        trend,
        signal_strength,
        key_levels: key_levels(output),
        recommendation: Recommendation::from_strength(signal_strength, rsi),
    }
}

/// Midpoints of the last three order blocks, then the last three liquidity levels.
pub fn key_levels(output: &AnalysisOutput) -> Vec<KeyLevel> {
    let blocks = crate::output::recent(&output.order_blocks, KEY_LEVELS_PER_SOURCE)
        .iter()
        .map(|b| KeyLevel {
            source: LevelSource::OrderBlock,
            price: (b.item.top + b.item.bottom) / 2.0,
            direction: b.item.direction,
        });
    let liquidity = crate::output::recent(&output.liquidity_zones, KEY_LEVELS_PER_SOURCE)
        .iter()
        .map(|z| KeyLevel {
            source: LevelSource::Liquidity,
            price: z.item.level,
            direction: match z.item.side {
                LiquiditySide::BuySide => Direction::Bear,
                LiquiditySide::SellSide => Direction::Bull,
            },
        });
    blocks.chain(liquidity).collect()
}
