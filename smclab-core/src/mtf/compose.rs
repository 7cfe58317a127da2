//! Multi-timeframe signal composition.
//!
//! Each higher timeframe is analyzed on its own, then joined onto the base
//! series. A higher bar becomes visible once it has closed relative to the base
//! bar: its open time is shifted by `higher.duration - base.duration` before
//! the "last value at or before" join.
//!
//! Confluence comes only from timeframes slower than the base, excluding the
//! auxiliary. Entry long at base index `i` needs all of:
//! - some confluence timeframe showing a bullish BOS at its visible index,
//! - some confluence timeframe with an active bullish zone overlapping base candle `i`,
//! - a bullish sweep on the base at `i`,
//! - the base CHoCH state at `i - 1` being bullish,
//! - the auxiliary timeframe (if configured and present) not showing a bearish CHoCH.
//!
//! Entry short mirrors it. Exits come from base CHoCH events only.

use std::collections::BTreeMap;

use crate::analysis::StructuralResult;
use crate::diagnostics::Diagnostic;
use crate::domain::{Candle, Direction, Fingerprint, Series, Timeframe};
use crate::output::{signal_book, Stamped};
use crate::signals::composer::{entry_signal, exit_signals};
use crate::signals::{Signal, SignalBook};
use crate::structure::StructureState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::align::{align_to_base, Alignment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MtfConfig {
    pub base_timeframe: Timeframe,
    /// Fastest timeframe, used only to veto entries against its CHoCH.
    pub auxiliary: Option<Timeframe>,
}

impl Default for MtfConfig {
    fn default() -> Self {
        Self {
            base_timeframe: Timeframe::M15,
            auxiliary: Some(Timeframe::M15),
        }
    }
}

/// One higher timeframe joined onto the base.
#[derive(Debug, Clone)]
pub struct TimeframeContribution {
    pub timeframe: Timeframe,
    result: StructuralResult,
    alignment: Option<Alignment>,
}

impl TimeframeContribution {
    pub fn result(&self) -> &StructuralResult {
        &self.result
    }

    pub fn is_aligned(&self) -> bool {
        self.alignment.is_some()
    }

    /// Higher-timeframe index visible at base index `i`.
    pub fn visible_index(&self, i: usize) -> Option<usize> {
        self.alignment.as_ref()?.get(i)
    }

    /// Structure state visible at base index `i`.
    pub fn state_at(&self, i: usize) -> Option<&StructureState> {
        self.result.timeline().state_at(self.visible_index(i)?)
    }

    /// Active zone of `direction` visible at base index `i` overlapping `candle`.
    pub fn has_overlapping_zone(&self, i: usize, direction: Direction, candle: &Candle) -> bool {
        self.visible_index(i)
            .is_some_and(|j| self.result.timeline().has_overlapping_zone(j, direction, candle))
    }
}

#[derive(Debug, Clone)]
pub struct MergedResult {
    config: MtfConfig,
    series: Series,
    contributions: Vec<TimeframeContribution>,
    signals: Vec<Signal>,
    diagnostics: Vec<Diagnostic>,
}

impl MergedResult {
    pub fn config(&self) -> &MtfConfig {
        &self.config
    }

    pub fn series(&self) -> &Series {
        &self.series
    }

    pub fn contributions(&self) -> &[TimeframeContribution] {
        &self.contributions
    }

    pub fn contribution(&self, timeframe: Timeframe) -> Option<&TimeframeContribution> {
        self.contributions.iter().find(|c| c.timeframe == timeframe)
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn output(&self) -> MergedOutput {
        let timeframes = self
            .contributions
            .iter()
            .map(|c| {
                let status = TimeframeStatus {
                    candles: c.result.series().len(),
                    aligned: c.is_aligned(),
                    trend: c.result.latest_direction(),
                };
                (c.timeframe, status)
            })
            .collect();
        MergedOutput {
            base_timeframe: self.config.base_timeframe,
            timeframes,
            trading_signals: signal_book(&self.series, &self.signals),
            diagnostics: self.diagnostics.clone(),
        }
    }

    pub fn fingerprint(&self) -> Result<Fingerprint, serde_json::Error> {
        let bytes = serde_json::to_vec(&self.output())?;
        Ok(Fingerprint::from_bytes(&bytes))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeframeStatus {
    pub candles: usize,
    pub aligned: bool,
    pub trend: Option<Direction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedOutput {
    pub base_timeframe: Timeframe,
    pub timeframes: BTreeMap<Timeframe, TimeframeStatus>,
    pub trading_signals: SignalBook<Stamped<Signal>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Join every higher-timeframe analysis onto `base` and compose signals.
///
/// Timeframes that are empty or cannot be aligned contribute nothing and are
/// reported as diagnostics; composition always completes.
pub fn compose_multi_timeframe(
    base: &StructuralResult,
    higher: &BTreeMap<Timeframe, StructuralResult>,
    config: &MtfConfig,
) -> MergedResult {
    let base_times: Vec<DateTime<Utc>> = base.series().iter().map(|c| c.timestamp).collect();
    let mut diagnostics = base.diagnostics().to_vec();

    let contributions: Vec<TimeframeContribution> = higher
        .iter()
        .map(|(&timeframe, result)| {
            let alignment = align_timeframe(&base_times, config.base_timeframe, timeframe, result)
                .map_err(|diagnostic| diagnostics.push(diagnostic))
                .ok();
            TimeframeContribution {
                timeframe,
                result: result.clone(),
                alignment,
            }
        })
        .collect();

    if let Some(aux) = config.auxiliary {
        if !higher.contains_key(&aux) {
            diagnostics.push(Diagnostic::TimeframeUnavailable {
                timeframe: aux,
                reason: "auxiliary timeframe not analyzed".into(),
            });
        }
    }

    let signals = compose_signals_mtf(base, &contributions, config);
    debug!(
        base = %config.base_timeframe,
        timeframes = contributions.len(),
        aligned = contributions.iter().filter(|c| c.is_aligned()).count(),
        signals = signals.len(),
        "multi-timeframe composition complete"
    );

    MergedResult {
        config: *config,
        series: base.series().clone(),
        contributions,
        signals,
        diagnostics,
    }
}

fn align_timeframe(
    base_times: &[DateTime<Utc>],
    base_timeframe: Timeframe,
    timeframe: Timeframe,
    result: &StructuralResult,
) -> Result<Alignment, Diagnostic> {
    if result.is_empty() {
        return Err(Diagnostic::TimeframeUnavailable {
            timeframe,
            reason: format!("{} candles, too short to analyze", result.series().len()),
        });
    }
    let delay = (timeframe.duration() - base_timeframe.duration()).max(chrono::Duration::zero());
    let visible_from: Vec<DateTime<Utc>> =
        result.series().iter().map(|c| c.timestamp + delay).collect();

    align_to_base(base_times, &visible_from).map_err(|e| Diagnostic::AlignmentMismatch {
        timeframe,
        reason: e.to_string(),
    })
}

/// Slower than the base and not the auxiliary.
fn is_confluence(timeframe: Timeframe, config: &MtfConfig) -> bool {
    Some(timeframe) != config.auxiliary
        && timeframe.duration() > config.base_timeframe.duration()
}

fn compose_signals_mtf(
    base: &StructuralResult,
    contributions: &[TimeframeContribution],
    config: &MtfConfig,
) -> Vec<Signal> {
    let candles = base.series().candles();
    let timeline = base.timeline();
    let auxiliary = config
        .auxiliary
        .and_then(|tf| contributions.iter().find(|c| c.timeframe == tf));
    let confluence: Vec<&TimeframeContribution> = contributions
        .iter()
        .filter(|c| is_confluence(c.timeframe, config))
        .collect();

    let mut signals = Vec::new();
    for sweep in &base.structure().sweeps {
        let i = sweep.index;
        let dir = sweep.direction;
        let candle = &candles[i];

        let local_choch = i
            .checked_sub(1)
            .and_then(|prev| timeline.state_at(prev))
            .is_some_and(|s| s.choch == Some(dir));
        if !local_choch {
            continue;
        }

        let higher_bos = confluence
            .iter()
            .any(|c| c.state_at(i).is_some_and(|s| s.bos == Some(dir)));
        let higher_zone = confluence
            .iter()
            .any(|c| c.has_overlapping_zone(i, dir, candle));
        let vetoed = auxiliary
            .and_then(|c| c.state_at(i))
            .is_some_and(|s| s.choch == Some(dir.opposite()));

        if higher_bos && higher_zone && !vetoed {
            signals.push(entry_signal(i, dir, candle, true));
        }
    }

    signals.extend(exit_signals(candles, &base.structure().events));
    signals.sort_by_key(|s| (s.index, s.kind as u8));
    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{analyze, StructureSet};
    use crate::signals::{SignalKind, SignalTag};
    use crate::structure::{LiquiditySweep, OrderBlock, StructureEvent, StructureKind};

    const SWEEP_AT: usize = 10;

    /// Flat candles `step` minutes apart; every candle spans 99..101.
    fn flat_series(step: i64, n: usize) -> Series {
        let mut candles = crate::structure::make_candles(&vec![(100.0, 101.0, 99.0, 100.0); n]);
        let start = candles[0].timestamp;
        for (j, c) in candles.iter_mut().enumerate() {
            c.timestamp = start + chrono::Duration::minutes(step * j as i64);
        }
        Series::new(candles).unwrap()
    }

    fn event(index: usize, kind: StructureKind, direction: Direction) -> StructureEvent {
        StructureEvent {
            index,
            kind,
            direction,
        }
    }

    /// 1m base with an optional bullish CHoCH and an optional bullish sweep.
    fn base(choch_at: Option<usize>, sweep_at: Option<usize>) -> StructuralResult {
        let structure = StructureSet {
            events: choch_at
                .map(|i| event(i, StructureKind::Choch, Direction::Bull))
                .into_iter()
                .collect(),
            sweeps: sweep_at
                .map(|index| LiquiditySweep {
                    index,
                    direction: Direction::Bull,
                    level: 99.5,
                })
                .into_iter()
                .collect(),
            ..Default::default()
        };
        StructuralResult::from_structure(flat_series(1, 12), 3, structure)
    }

    /// Series `step` minutes apart with an event at index 1 and optionally a
    /// bullish order block on candle 0 overlapping every base candle.
    fn higher(step: i64, kind: StructureKind, direction: Direction, zone: bool) -> StructuralResult {
        let blocks: Vec<OrderBlock> = if zone {
            vec![OrderBlock {
                index: 0,
                direction: Direction::Bull,
                top: 100.5,
                bottom: 99.5,
                event_index: 1,
            }]
        } else {
            Vec::new()
        };
        let structure = StructureSet {
            events: vec![event(1, kind, direction)],
            order_blocks: blocks.clone(),
            order_block_assignments: blocks,
            ..Default::default()
        };
        StructuralResult::from_structure(flat_series(step, 12), 3, structure)
    }

    fn bullish_5m() -> StructuralResult {
        higher(5, StructureKind::Bos, Direction::Bull, true)
    }

    fn config(auxiliary: Option<Timeframe>) -> MtfConfig {
        MtfConfig {
            base_timeframe: Timeframe::M1,
            auxiliary,
        }
    }

    fn entries(merged: &MergedResult) -> Vec<&Signal> {
        merged
            .signals()
            .iter()
            .filter(|s| matches!(s.kind, SignalKind::EntryLong | SignalKind::EntryShort))
            .collect()
    }

    // ── Entry conditions ────────────────────────────────────────────────

    #[test]
    fn entry_fires_when_all_conditions_hold() {
        let higher_map = BTreeMap::from([(Timeframe::M5, bullish_5m())]);
        let merged = compose_multi_timeframe(&base(Some(5), Some(SWEEP_AT)), &higher_map, &config(None));
        let entries = entries(&merged);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].index, SWEEP_AT);
        assert_eq!(entries[0].kind, SignalKind::EntryLong);
        assert_eq!(entries[0].tag, SignalTag::LongSmcMtf);
    }

    #[test]
    fn no_entry_without_higher_bos() {
        let higher_map = BTreeMap::from([(
            Timeframe::M5,
            higher(5, StructureKind::Choch, Direction::Bull, true),
        )]);
        let merged = compose_multi_timeframe(&base(Some(5), Some(SWEEP_AT)), &higher_map, &config(None));
        assert!(entries(&merged).is_empty());
    }

    #[test]
    fn no_entry_without_higher_zone() {
        let higher_map = BTreeMap::from([(
            Timeframe::M5,
            higher(5, StructureKind::Bos, Direction::Bull, false),
        )]);
        let merged = compose_multi_timeframe(&base(Some(5), Some(SWEEP_AT)), &higher_map, &config(None));
        assert!(entries(&merged).is_empty());
    }

    #[test]
    fn no_entry_without_base_sweep() {
        let higher_map = BTreeMap::from([(Timeframe::M5, bullish_5m())]);
        let merged = compose_multi_timeframe(&base(Some(5), None), &higher_map, &config(None));
        assert!(entries(&merged).is_empty());
    }

    #[test]
    fn base_choch_must_precede_the_sweep() {
        let higher_map = BTreeMap::from([(Timeframe::M5, bullish_5m())]);
        for choch_at in [None, Some(SWEEP_AT)] {
            let merged = compose_multi_timeframe(&base(choch_at, Some(SWEEP_AT)), &higher_map, &config(None));
            assert!(entries(&merged).is_empty(), "choch at {choch_at:?}");
        }
    }

    #[test]
    fn higher_bar_counts_only_once_closed() {
        // The 5m bar opened at minute 5 carries the BOS and closes at minute 10,
        // so it is first visible to the 1m bar opened at minute 9.
        let higher_map = BTreeMap::from([(Timeframe::M5, bullish_5m())]);
        let early = compose_multi_timeframe(&base(Some(5), Some(8)), &higher_map, &config(None));
        assert!(entries(&early).is_empty());
        let closed = compose_multi_timeframe(&base(Some(5), Some(9)), &higher_map, &config(None));
        assert_eq!(entries(&closed).len(), 1);
    }

    // ── Auxiliary timeframe ─────────────────────────────────────────────

    #[test]
    fn opposing_auxiliary_choch_vetoes_entry() {
        let higher_map = BTreeMap::from([
            (Timeframe::M1, higher(1, StructureKind::Choch, Direction::Bear, false)),
            (Timeframe::M5, bullish_5m()),
        ]);
        let merged = compose_multi_timeframe(
            &base(Some(5), Some(SWEEP_AT)),
            &higher_map,
            &config(Some(Timeframe::M1)),
        );
        assert!(entries(&merged).is_empty());
    }

    #[test]
    fn agreeing_auxiliary_does_not_veto() {
        let higher_map = BTreeMap::from([
            (Timeframe::M1, higher(1, StructureKind::Choch, Direction::Bull, false)),
            (Timeframe::M5, bullish_5m()),
        ]);
        let merged = compose_multi_timeframe(
            &base(Some(5), Some(SWEEP_AT)),
            &higher_map,
            &config(Some(Timeframe::M1)),
        );
        assert_eq!(entries(&merged).len(), 1);
    }

    #[test]
    fn absent_auxiliary_vetoes_nothing() {
        let higher_map = BTreeMap::from([(Timeframe::M5, bullish_5m())]);
        let merged = compose_multi_timeframe(
            &base(Some(5), Some(SWEEP_AT)),
            &higher_map,
            &config(Some(Timeframe::M1)),
        );
        assert_eq!(entries(&merged).len(), 1);
        assert!(merged.diagnostics().iter().any(|d| matches!(
            d,
            Diagnostic::TimeframeUnavailable {
                timeframe: Timeframe::M1,
                ..
            }
        )));
    }

    // ── Confluence set ──────────────────────────────────────────────────

    #[test]
    fn auxiliary_never_confirms_an_entry() {
        // Bullish BOS and zone on the auxiliary alone, no other timeframe.
        for aux in [Timeframe::M1, Timeframe::M5] {
            let step = aux.duration().num_minutes();
            let higher_map = BTreeMap::from([(
                aux,
                higher(step, StructureKind::Bos, Direction::Bull, true),
            )]);
            let merged =
                compose_multi_timeframe(&base(Some(5), Some(SWEEP_AT)), &higher_map, &config(Some(aux)));
            assert!(entries(&merged).is_empty(), "auxiliary {aux}");
        }
    }

    #[test]
    fn base_timeframe_never_confirms_itself() {
        let higher_map = BTreeMap::from([(
            Timeframe::M1,
            higher(1, StructureKind::Bos, Direction::Bull, true),
        )]);
        let merged = compose_multi_timeframe(&base(Some(5), Some(SWEEP_AT)), &higher_map, &config(None));
        assert!(entries(&merged).is_empty());
        assert!(merged.contribution(Timeframe::M1).unwrap().is_aligned());
    }

    #[test]
    fn base_analysis_as_its_own_auxiliary_yields_no_entries() {
        let candles: Vec<Candle> = crate::structure::make_candles(
            &(0..300)
                .map(|i| {
                    let phase = (i % 16) as f64;
                    let swing = if phase < 8.0 { phase } else { 16.0 - phase };
                    let drift = ((i * 7) % 5) as f64 - 2.0;
                    let mid = 100.0 + swing * 2.5 + drift;
                    (mid - 0.5, mid + 1.5, mid - 1.5, mid + 0.5)
                })
                .collect::<Vec<_>>(),
        );
        let base = analyze(&Series::new(candles).unwrap(), 3);
        let higher_map = BTreeMap::from([(Timeframe::M1, base.clone())]);
        let merged =
            compose_multi_timeframe(&base, &higher_map, &config(Some(Timeframe::M1)));
        assert!(entries(&merged).is_empty());
    }

    #[test]
    fn empty_higher_map_yields_exits_only() {
        let candles: Vec<Candle> = crate::structure::make_candles(
            &(0..120)
                .map(|i| {
                    let phase = (i % 12) as f64;
                    let swing = if phase < 6.0 { phase } else { 12.0 - phase };
                    let mid = 100.0 + swing * 3.0 - (i / 24) as f64 * 4.0;
                    (mid, mid + 1.0, mid - 1.0, mid)
                })
                .collect::<Vec<_>>(),
        );
        let base = analyze(&Series::new(candles).unwrap(), 3);
        let config = MtfConfig {
            base_timeframe: Timeframe::M1,
            auxiliary: None,
        };
        let merged = compose_multi_timeframe(&base, &BTreeMap::new(), &config);
        assert!(merged
            .signals()
            .iter()
            .all(|s| matches!(s.kind, crate::signals::SignalKind::ExitLong | crate::signals::SignalKind::ExitShort)));
        assert!(merged.contributions().is_empty());
    }

    #[test]
    fn missing_auxiliary_is_reported() {
        let base = StructuralResult::empty(Series::empty(), 20, Vec::new());
        let merged = compose_multi_timeframe(&base, &BTreeMap::new(), &MtfConfig::default());
        assert!(merged.signals().is_empty());
        assert!(merged.diagnostics().iter().any(|d| matches!(
            d,
            Diagnostic::TimeframeUnavailable {
                timeframe: Timeframe::M15,
                ..
            }
        )));
    }

    #[test]
    fn empty_higher_result_is_unavailable_not_fatal() {
        let base = StructuralResult::empty(Series::empty(), 20, Vec::new());
        let mut higher = BTreeMap::new();
        higher.insert(
            Timeframe::H4,
            StructuralResult::empty(Series::empty(), 20, Vec::new()),
        );
        let merged = compose_multi_timeframe(&base, &higher, &MtfConfig::default());
        let c = merged.contribution(Timeframe::H4).unwrap();
        assert!(!c.is_aligned());
        assert!(c.state_at(0).is_none());
        assert!(merged.diagnostics().iter().any(|d| matches!(
            d,
            Diagnostic::TimeframeUnavailable {
                timeframe: Timeframe::H4,
                ..
            }
        )));
    }
}
