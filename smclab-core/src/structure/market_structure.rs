//! Market structure state machine: BOS / CHoCH detection.
//!
//! One forward pass carries a single [`TrendState`]. At each candle the swing
//! extremes are refreshed first, then the transition rules are tried in a fixed
//! priority order and the first match produces the (only) event for that index:
//!
//! 1. bull trend, break below the tracked swing low      → bearish CHoCH
//! 2. bear trend, break above the tracked swing high     → bullish CHoCH
//! 3. break above the tracked swing high                 → bullish BOS
//! 4. break below the tracked swing low                  → bearish BOS
//!
//! Every event sets the trend to its direction and clears the opposite
//! extreme, so a fresh swing must form before that side can fire again.

use crate::domain::{Candle, Direction};
use serde::{Deserialize, Serialize};

use super::swing::SwingFlags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    /// Break of structure: continuation through a swing extreme.
    Bos,
    /// Change of character: a break against the prevailing trend.
    Choch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureEvent {
    pub index: usize,
    pub kind: StructureKind,
    pub direction: Direction,
}

/// Mutable scan state, owned by a single [`StructureScanner`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrendState {
    pub direction: Option<Direction>,
    pub last_swing_high: Option<f64>,
    pub last_swing_low: Option<f64>,
}

impl TrendState {
    fn breaks_high(&self, candle: &Candle) -> bool {
        self.last_swing_high.is_some_and(|level| candle.high > level)
    }

    fn breaks_low(&self, candle: &Candle) -> bool {
        self.last_swing_low.is_some_and(|level| candle.low < level)
    }

    fn apply(&mut self, direction: Direction) {
        self.direction = Some(direction);
        match direction {
            Direction::Bull => self.last_swing_low = None,
            Direction::Bear => self.last_swing_high = None,
        }
    }
}

/// One entry of the ordered transition table.
struct Rule {
    kind: StructureKind,
    direction: Direction,
    matches: fn(&TrendState, &Candle) -> bool,
}

const RULES: [Rule; 4] = [
    Rule {
        kind: StructureKind::Choch,
        direction: Direction::Bear,
        matches: bearish_choch,
    },
    Rule {
        kind: StructureKind::Choch,
        direction: Direction::Bull,
        matches: bullish_choch,
    },
    Rule {
        kind: StructureKind::Bos,
        direction: Direction::Bull,
        matches: TrendState::breaks_high,
    },
    Rule {
        kind: StructureKind::Bos,
        direction: Direction::Bear,
        matches: TrendState::breaks_low,
    },
];

fn bearish_choch(state: &TrendState, candle: &Candle) -> bool {
    state.direction == Some(Direction::Bull) && state.breaks_low(candle)
}

fn bullish_choch(state: &TrendState, candle: &Candle) -> bool {
    state.direction == Some(Direction::Bear) && state.breaks_high(candle)
}

/// Sequential BOS/CHoCH scanner. Indices must be fed in increasing order.
#[derive(Debug, Clone, Default)]
pub struct StructureScanner {
    state: TrendState,
}

impl StructureScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &TrendState {
        &self.state
    }

    /// Advance by one candle and return the event it produces, if any.
    pub fn step(
        &mut self,
        index: usize,
        candle: &Candle,
        swing_high: bool,
        swing_low: bool,
    ) -> Option<StructureEvent> {
        if swing_high {
            self.state.last_swing_high = Some(candle.high);
        }
        if swing_low {
            self.state.last_swing_low = Some(candle.low);
        }

        let rule = RULES.iter().find(|r| (r.matches)(&self.state, candle))?;
        self.state.apply(rule.direction);
        Some(StructureEvent {
            index,
            kind: rule.kind,
            direction: rule.direction,
        })
    }
}

/// Run the state machine over the whole history.
pub fn scan_structure(candles: &[Candle], swings: &SwingFlags) -> Vec<StructureEvent> {
    let mut scanner = StructureScanner::new();
    candles
        .iter()
        .enumerate()
        .filter_map(|(i, c)| scanner.step(i, c, swings.is_high(i), swings.is_low(i)))
        .collect()
}
