//! Serializable analysis output.
//!
//! Every list is sorted by index and truncated to its most recent entries:
//!
//! | list                 | kept |
//! |----------------------|------|
//! | `order_blocks`       | 10   |
//! | `fair_value_gaps`    | 20   |
//! | `break_of_structure` | 10   |
//! | `liquidity_zones`    | 10   |
//! | each signal kind     | 50   |
//!
//! Each entry carries `time`, the unix seconds of the candle at its index.

use crate::analysis::StructuralResult;
use crate::diagnostics::Diagnostic;
use crate::domain::{Fingerprint, Series};
use crate::signals::{group_by_kind, Signal, SignalBook};
use crate::structure::{FairValueGap, LiquidityZone, OrderBlock, StructureEvent};
use serde::{Deserialize, Serialize};

pub const MAX_ORDER_BLOCKS: usize = 10;
pub const MAX_FAIR_VALUE_GAPS: usize = 20;
pub const MAX_STRUCTURE_EVENTS: usize = 10;
pub const MAX_LIQUIDITY_ZONES: usize = 10;
pub const MAX_SIGNALS_PER_KIND: usize = 50;

/// An entity with the timestamp of the candle it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stamped<T> {
    pub time: i64,
    #[serde(flatten)]
    pub item: T,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub order_blocks: Vec<Stamped<OrderBlock>>,
    pub fair_value_gaps: Vec<Stamped<FairValueGap>>,
    pub break_of_structure: Vec<Stamped<StructureEvent>>,
    pub liquidity_zones: Vec<Stamped<LiquidityZone>>,
    pub trading_signals: SignalBook<Stamped<Signal>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl AnalysisOutput {
    pub fn from_result(result: &StructuralResult) -> Self {
        let series = result.series();
        let structure = result.structure();
        let candles = series.candles();

        let liquidity_zones: Vec<LiquidityZone> = structure
            .sweeps
            .iter()
            .map(|s| LiquidityZone::from_sweep(s, &candles[s.index]))
            .collect();

        Self {
            order_blocks: stamp(series, recent(&structure.order_blocks, MAX_ORDER_BLOCKS), |b| b.index),
            fair_value_gaps: stamp(
                series,
                recent(&structure.fair_value_gaps, MAX_FAIR_VALUE_GAPS),
                |g| g.index,
            ),
            break_of_structure: stamp(
                series,
                recent(&structure.events, MAX_STRUCTURE_EVENTS),
                |e| e.index,
            ),
            liquidity_zones: stamp(series, recent(&liquidity_zones, MAX_LIQUIDITY_ZONES), |z| z.index),
            trading_signals: signal_book(series, result.signals()),
            diagnostics: result.diagnostics().to_vec(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.order_blocks.is_empty()
            && self.fair_value_gaps.is_empty()
            && self.break_of_structure.is_empty()
            && self.liquidity_zones.is_empty()
            && self.trading_signals.is_empty()
    }

    /// BLAKE3 of the compact JSON encoding.
    pub fn fingerprint(&self) -> Result<Fingerprint, serde_json::Error> {
        let bytes = serde_json::to_vec(self)?;
        Ok(Fingerprint::from_bytes(&bytes))
    }
}

/// Group signals by kind and keep the most recent of each.
pub fn signal_book(series: &Series, signals: &[Signal]) -> SignalBook<Stamped<Signal>> {
    let book = group_by_kind(signals);
    let keep = |list: &[Signal]| stamp(series, recent(list, MAX_SIGNALS_PER_KIND), |s| s.index);
    SignalBook {
        entry_long: keep(&book.entry_long),
        entry_short: keep(&book.entry_short),
        exit_long: keep(&book.exit_long),
        exit_short: keep(&book.exit_short),
    }
}

/// The last `n` items (all if fewer).
pub fn recent<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

fn stamp<T: Copy>(series: &Series, items: &[T], index_of: impl Fn(&T) -> usize) -> Vec<Stamped<T>> {
    items
        .iter()
        .filter_map(|item| {
            series.get(index_of(item)).map(|c| Stamped {
                time: c.unix_secs(),
                item: *item,
            })
        })
        .collect()
}
