//! Single-timeframe signal composition.
//!
//! Entry long at `i` needs all of:
//! - the latest structure event at or before `i` is bullish,
//! - a bullish sweep at `i`,
//! - the candle range overlapping an active bullish order block or gap.
//!
//! Entry short mirrors it. Exits fire on every CHoCH regardless of entries:
//! a bearish CHoCH exits longs, a bullish CHoCH exits shorts.

use crate::domain::{Candle, Direction};
use crate::structure::{LiquiditySweep, StructureEvent, StructureKind, StructureTimeline};

use super::{Signal, SignalKind, SignalTag};

pub fn compose_signals(
    candles: &[Candle],
    events: &[StructureEvent],
    sweeps: &[LiquiditySweep],
    timeline: &StructureTimeline,
) -> Vec<Signal> {
    let mut signals = Vec::new();

    for sweep in sweeps {
        let i = sweep.index;
        let Some(state) = timeline.state_at(i) else {
            continue;
        };
        let candle = &candles[i];

        if state.trend == Some(sweep.direction)
            && timeline.has_overlapping_zone(i, sweep.direction, candle)
        {
            signals.push(entry_signal(i, sweep.direction, candle, false));
        }
    }

    signals.extend(exit_signals(candles, events));
    signals.sort_by_key(|s| (s.index, s.kind as u8));
    signals
}

pub(crate) fn entry_signal(index: usize, direction: Direction, candle: &Candle, mtf: bool) -> Signal {
    let (kind, tag) = match (direction, mtf) {
        (Direction::Bull, false) => (SignalKind::EntryLong, SignalTag::LongSmcSimple),
        (Direction::Bear, false) => (SignalKind::EntryShort, SignalTag::ShortSmcSimple),
        (Direction::Bull, true) => (SignalKind::EntryLong, SignalTag::LongSmcMtf),
        (Direction::Bear, true) => (SignalKind::EntryShort, SignalTag::ShortSmcMtf),
    };
    Signal {
        index,
        kind,
        tag,
        price: candle.close,
    }
}

/// Exit signals from CHoCH events.
pub(crate) fn exit_signals<'a>(
    candles: &'a [Candle],
    events: &'a [StructureEvent],
) -> impl Iterator<Item = Signal> + 'a {
    events
        .iter()
        .filter(|e| e.kind == StructureKind::Choch)
        .map(|e| {
            let (kind, tag) = match e.direction {
                Direction::Bear => (SignalKind::ExitLong, SignalTag::ExitOnBearishChoch),
                Direction::Bull => (SignalKind::ExitShort, SignalTag::ExitOnBullishChoch),
            };
            Signal {
                index: e.index,
                kind,
                tag,
                price: candles[e.index].close,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::{make_candles, FairValueGap, OrderBlock};

    // index 6 sweeps the prior lows (95) and closes back inside
    fn sweep_setup() -> Vec<Candle> {
        let mut data = vec![(100.0, 105.0, 95.0, 101.0); 6];
        data.push((98.0, 100.0, 92.0, 97.0));
        make_candles(&data)
    }

    fn event(index: usize, kind: StructureKind, direction: Direction) -> StructureEvent {
        StructureEvent {
            index,
            kind,
            direction,
        }
    }

    fn bull_sweep() -> LiquiditySweep {
        LiquiditySweep {
            index: 6,
            direction: Direction::Bull,
            level: 95.0,
        }
    }

    fn bull_block() -> OrderBlock {
        OrderBlock {
            index: 1,
            direction: Direction::Bull,
            top: 94.0,
            bottom: 90.0,
            event_index: 2,
        }
    }

    #[test]
    fn long_entry_needs_trend_sweep_and_zone() {
        let candles = sweep_setup();
        let events = [event(2, StructureKind::Bos, Direction::Bull)];
        let sweeps = [bull_sweep()];
        let tl = StructureTimeline::build(&candles, &events, &[bull_block()], &[]);

        let signals = compose_signals(&candles, &events, &sweeps, &tl);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, SignalKind::EntryLong);
        assert_eq!(signals[0].tag, SignalTag::LongSmcSimple);
        assert_eq!(signals[0].index, 6);
        assert_eq!(signals[0].price, 97.0);
    }

    #[test]
    fn bearish_trend_blocks_long_entry() {
        let candles = sweep_setup();
        let events = [event(2, StructureKind::Bos, Direction::Bear)];
        let tl = StructureTimeline::build(&candles, &events, &[bull_block()], &[]);
        let signals = compose_signals(&candles, &events, &[bull_sweep()], &tl);
        assert!(signals.is_empty());
    }

    #[test]
    fn no_zone_no_entry() {
        let candles = sweep_setup();
        let events = [event(2, StructureKind::Bos, Direction::Bull)];
        let tl = StructureTimeline::build(&candles, &events, &[], &[]);
        assert!(compose_signals(&candles, &events, &[bull_sweep()], &tl).is_empty());
    }

    #[test]
    fn gap_counts_as_zone() {
        let candles = sweep_setup();
        let events = [event(2, StructureKind::Bos, Direction::Bull)];
        let gap = FairValueGap {
            index: 3,
            direction: Direction::Bull,
            top: 96.0,
            bottom: 93.0,
            filled: false,
        };
        let tl = StructureTimeline::build(&candles, &events, &[], &[gap]);
        let signals = compose_signals(&candles, &events, &[bull_sweep()], &tl);
        assert_eq!(signals.len(), 1);
    }

    #[test]
    fn choch_produces_exit_alongside_entry() {
        let candles = sweep_setup();
        let events = [event(6, StructureKind::Choch, Direction::Bull)];
        let zone = OrderBlock {
            event_index: 6,
            ..bull_block()
        };
        let tl = StructureTimeline::build(&candles, &events, &[zone], &[]);
        let signals = compose_signals(&candles, &events, &[bull_sweep()], &tl);

        let kinds: Vec<_> = signals.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![SignalKind::EntryLong, SignalKind::ExitShort]);
        assert_eq!(signals[1].tag, SignalTag::ExitOnBullishChoch);
    }

    #[test]
    fn bos_never_exits() {
        let candles = sweep_setup();
        let events = [event(3, StructureKind::Bos, Direction::Bear)];
        let tl = StructureTimeline::build(&candles, &events, &[], &[]);
        assert!(compose_signals(&candles, &events, &[], &tl).is_empty());
    }
}
