//! Per-index structure state and zone activity, as known at each candle's close.
//!
//! The timeline replays events and zones strictly forward so the state at index
//! `t` depends only on candles `0..=t`:
//! - an order block becomes active at its event's index, a gap at its third candle;
//! - a bullish zone is mitigated by a later close below its bottom, a bearish
//!   zone by a later close above its top;
//! - an order block slot reassigned by a later event replaces the earlier block
//!   from that event onward.

use crate::domain::{Candle, Direction};
use serde::{Deserialize, Serialize};

use super::fvg::FairValueGap;
use super::market_structure::{StructureEvent, StructureKind};
use super::order_block::OrderBlock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneSource {
    OrderBlock,
    FairValueGap,
}

/// A price zone with the candle range over which it is active.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zone {
    pub source: ZoneSource,
    /// Index of the order block candle or the gap's middle candle.
    pub index: usize,
    pub direction: Direction,
    pub top: f64,
    pub bottom: f64,
    active_from: usize,
    active_until: Option<usize>,
}

impl Zone {
    /// Candle range touches the zone: `low <= top && high >= bottom`.
    pub fn overlaps(&self, candle: &Candle) -> bool {
        candle.low <= self.top && candle.high >= self.bottom
    }

    pub fn is_active_at(&self, index: usize) -> bool {
        self.active_from <= index && self.active_until.map_or(true, |end| index < end)
    }

    fn mitigated_by(&self, candle: &Candle) -> bool {
        match self.direction {
            Direction::Bull => candle.close < self.bottom,
            Direction::Bear => candle.close > self.top,
        }
    }
}

/// Structure state visible at one index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StructureState {
    /// Direction of the most recent event (BOS or CHoCH).
    pub trend: Option<Direction>,
    /// Set while the most recent event is a BOS.
    pub bos: Option<Direction>,
    /// Direction of the last CHoCH, cleared once an opposing event follows it.
    pub choch: Option<Direction>,
}

#[derive(Debug, Clone, Default)]
pub struct StructureTimeline {
    states: Vec<StructureState>,
    zones: Vec<Zone>,
}

impl StructureTimeline {
    /// Replay events, order block assignments (in event order) and gaps.
    pub fn build(
        candles: &[Candle],
        events: &[StructureEvent],
        order_block_assignments: &[OrderBlock],
        gaps: &[FairValueGap],
    ) -> Self {
        let n = candles.len();
        let mut states = Vec::with_capacity(n);
        let mut zones: Vec<Zone> = Vec::new();
        let mut state = StructureState::default();

        let mut events = events.iter().peekable();
        let mut blocks = order_block_assignments.iter().peekable();
        let mut gaps = gaps.iter().peekable();

        for (i, candle) in candles.iter().enumerate() {
            for zone in zones.iter_mut() {
                if zone.active_until.is_none() && zone.active_from < i && zone.mitigated_by(candle)
                {
                    zone.active_until = Some(i);
                }
            }

            while let Some(event) = events.next_if(|e| e.index == i) {
                state.trend = Some(event.direction);
                match event.kind {
                    StructureKind::Bos => {
                        state.bos = Some(event.direction);
                        if state.choch != Some(event.direction) {
                            state.choch = None;
                        }
                    }
                    StructureKind::Choch => {
                        state.bos = None;
                        state.choch = Some(event.direction);
                    }
                }
            }

            while let Some(block) = blocks.next_if(|b| b.event_index == i) {
                for zone in zones.iter_mut() {
                    if zone.source == ZoneSource::OrderBlock
                        && zone.index == block.index
                        && zone.active_until.is_none()
                    {
                        zone.active_until = Some(i);
                    }
                }
                zones.push(Zone {
                    source: ZoneSource::OrderBlock,
                    index: block.index,
                    direction: block.direction,
                    top: block.top,
                    bottom: block.bottom,
                    active_from: i,
                    active_until: None,
                });
            }

            while let Some(gap) = gaps.next_if(|g| g.confirmed_at() == i) {
                zones.push(Zone {
                    source: ZoneSource::FairValueGap,
                    index: gap.index,
                    direction: gap.direction,
                    top: gap.top,
                    bottom: gap.bottom,
                    active_from: i,
                    active_until: None,
                });
            }

            states.push(state);
        }

        Self { states, zones }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state_at(&self, index: usize) -> Option<&StructureState> {
        self.states.get(index)
    }

    /// Zones active at `index`, in creation order.
    pub fn active_zones(&self, index: usize) -> impl Iterator<Item = &Zone> + '_ {
        self.zones.iter().filter(move |z| z.is_active_at(index))
    }

    /// Any active zone of `direction` at `index` overlapping `candle`.
    pub fn has_overlapping_zone(&self, index: usize, direction: Direction, candle: &Candle) -> bool {
        self.active_zones(index)
            .any(|z| z.direction == direction && z.overlaps(candle))
    }
}
