//! Single-timeframe analysis: one forward pass from candles to signals.
//!
//! Pipeline: swings → structure events → {order blocks, gaps, sweeps} →
//! timeline → signals. Every stage reads the stage before it and writes its own
//! collection; nothing is written back onto the candles.

use crate::diagnostics::{Diagnostic, EntityKind};
use crate::domain::{Direction, Fingerprint, Series};
use crate::output::AnalysisOutput;
use crate::signals::{compose_signals, Signal};
use crate::structure::{
    assign_order_blocks, collapse_order_blocks, detect_fair_value_gaps, detect_sweeps,
    detect_swings, scan_structure, FairValueGap, LiquiditySweep, OrderBlock, StructureEvent,
    StructureTimeline, SwingFlags,
};
use tracing::debug;

/// Series shorter than this produce an empty result.
pub const MIN_HISTORY: usize = 50;

/// All derived entities of one scan, untruncated and sorted by index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructureSet {
    pub swings: SwingFlags,
    pub events: Vec<StructureEvent>,
    /// One block per supporting candle, later events winning.
    pub order_blocks: Vec<OrderBlock>,
    /// Every valid assignment in event order, before collapsing.
    pub order_block_assignments: Vec<OrderBlock>,
    pub fair_value_gaps: Vec<FairValueGap>,
    pub sweeps: Vec<LiquiditySweep>,
}

impl StructureSet {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
            && self.order_blocks.is_empty()
            && self.fair_value_gaps.is_empty()
            && self.sweeps.is_empty()
    }

    pub fn sweep_at(&self, index: usize) -> Option<&LiquiditySweep> {
        self.sweeps
            .binary_search_by_key(&index, |s| s.index)
            .ok()
            .map(|pos| &self.sweeps[pos])
    }
}

/// Result of analyzing one series.
#[derive(Debug, Clone)]
pub struct StructuralResult {
    series: Series,
    lookback: usize,
    structure: StructureSet,
    timeline: StructureTimeline,
    signals: Vec<Signal>,
    diagnostics: Vec<Diagnostic>,
}

impl StructuralResult {
    /// Well-formed empty result over `series`.
    pub fn empty(series: Series, lookback: usize, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            series,
            lookback,
            structure: StructureSet::default(),
            timeline: StructureTimeline::default(),
            signals: Vec::new(),
            diagnostics,
        }
    }

    /// Result over hand-built structure; the timeline is replayed from it.
    #[cfg(test)]
    pub(crate) fn from_structure(series: Series, lookback: usize, structure: StructureSet) -> Self {
        let timeline = StructureTimeline::build(
            series.candles(),
            &structure.events,
            &structure.order_block_assignments,
            &structure.fair_value_gaps,
        );
        Self {
            series,
            lookback,
            structure,
            timeline,
            signals: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn series(&self) -> &Series {
        &self.series
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    pub fn structure(&self) -> &StructureSet {
        &self.structure
    }

    pub fn timeline(&self) -> &StructureTimeline {
        &self.timeline
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// True when the scan was skipped (insufficient history).
    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }

    /// Direction of the most recent structure event.
    pub fn latest_direction(&self) -> Option<Direction> {
        self.structure.events.last().map(|e| e.direction)
    }

    /// Truncated, time-stamped view for serialization.
    pub fn output(&self) -> AnalysisOutput {
        AnalysisOutput::from_result(self)
    }

    /// BLAKE3 of the serialized output.
    pub fn fingerprint(&self) -> Result<Fingerprint, serde_json::Error> {
        self.output().fingerprint()
    }
}

/// Run the full structural scan over `series`.
pub fn analyze(series: &Series, lookback: usize) -> StructuralResult {
    if series.len() < MIN_HISTORY {
        debug!(candles = series.len(), required = MIN_HISTORY, "skipping short series");
        let diagnostic = Diagnostic::InsufficientHistory {
            candles: series.len(),
            required: MIN_HISTORY,
        };
        return StructuralResult::empty(series.clone(), lookback, vec![diagnostic]);
    }

    let candles = series.candles();
    let mut diagnostics = Vec::new();

    let swings = detect_swings(candles, lookback);
    let events = scan_structure(candles, &swings);
    let order_block_assignments =
        drop_invalid_blocks(assign_order_blocks(candles, &events), &mut diagnostics);
    let order_blocks = collapse_order_blocks(&order_block_assignments);
    let fair_value_gaps = drop_invalid_gaps(detect_fair_value_gaps(candles), &mut diagnostics);
    let sweeps = detect_sweeps(candles);

    let timeline =
        StructureTimeline::build(candles, &events, &order_block_assignments, &fair_value_gaps);
    let signals = compose_signals(candles, &events, &sweeps, &timeline);

    debug!(
        candles = candles.len(),
        lookback,
        events = events.len(),
        order_blocks = order_blocks.len(),
        gaps = fair_value_gaps.len(),
        sweeps = sweeps.len(),
        signals = signals.len(),
        "structural scan complete"
    );

    StructuralResult {
        series: series.clone(),
        lookback,
        structure: StructureSet {
            swings,
            events,
            order_blocks,
            order_block_assignments,
            fair_value_gaps,
            sweeps,
        },
        timeline,
        signals,
        diagnostics,
    }
}

fn drop_invalid_blocks(blocks: Vec<OrderBlock>, diagnostics: &mut Vec<Diagnostic>) -> Vec<OrderBlock> {
    blocks
        .into_iter()
        .filter(|b| {
            let ok = b.top > b.bottom;
            if !ok {
                diagnostics.push(Diagnostic::InvalidEntity {
                    entity: EntityKind::OrderBlock,
                    index: b.index,
                    top: b.top,
                    bottom: b.bottom,
                });
            }
            ok
        })
        .collect()
}

fn drop_invalid_gaps(gaps: Vec<FairValueGap>, diagnostics: &mut Vec<Diagnostic>) -> Vec<FairValueGap> {
    gaps.into_iter()
        .filter(|g| {
            let ok = g.is_well_formed();
            if !ok {
                diagnostics.push(Diagnostic::InvalidEntity {
                    entity: EntityKind::FairValueGap,
                    index: g.index,
                    top: g.top,
                    bottom: g.bottom,
                });
            }
            ok
        })
        .collect()
}
