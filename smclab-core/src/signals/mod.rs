//! Signal types and the single-timeframe composer.
//!
//! Signals are mechanical consequences of structure: they carry the candle
//! index, the close price and a tag naming the rule that fired. They never
//! look at positions or account state.

pub mod composer;

pub use composer::compose_signals;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    EntryLong,
    EntryShort,
    ExitLong,
    ExitShort,
}

/// The rule that produced a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalTag {
    LongSmcSimple,
    ShortSmcSimple,
    LongSmcMtf,
    ShortSmcMtf,
    ExitOnBearishChoch,
    ExitOnBullishChoch,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub index: usize,
    pub kind: SignalKind,
    pub tag: SignalTag,
    pub price: f64,
}

/// Signals split by kind, each list in index order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalBook<T> {
    pub entry_long: Vec<T>,
    pub entry_short: Vec<T>,
    pub exit_long: Vec<T>,
    pub exit_short: Vec<T>,
}

impl<T> Default for SignalBook<T> {
    fn default() -> Self {
        Self {
            entry_long: Vec::new(),
            entry_short: Vec::new(),
            exit_long: Vec::new(),
            exit_short: Vec::new(),
        }
    }
}

impl<T> SignalBook<T> {
    pub fn bucket_mut(&mut self, kind: SignalKind) -> &mut Vec<T> {
        match kind {
            SignalKind::EntryLong => &mut self.entry_long,
            SignalKind::EntryShort => &mut self.entry_short,
            SignalKind::ExitLong => &mut self.exit_long,
            SignalKind::ExitShort => &mut self.exit_short,
        }
    }

    pub fn len(&self) -> usize {
        self.entry_long.len() + self.entry_short.len() + self.exit_long.len() + self.exit_short.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Group signals by kind, preserving order.
pub fn group_by_kind(signals: &[Signal]) -> SignalBook<Signal> {
    let mut book = SignalBook::default();
    for signal in signals {
        book.bucket_mut(signal.kind).push(*signal);
    }
    book
}
