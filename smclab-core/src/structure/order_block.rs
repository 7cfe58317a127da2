//! Order block extraction: the last opposite-colored candle before a break.
//!
//! For a bullish event at index `e` the candles `e-1, e-2, ...` are searched
//! for the nearest down candle, stopping before `max(0, e - 10)` (that bound is
//! exclusive). Bearish events search for the nearest up candle. Events with no
//! qualifying candle in the window produce nothing.

use crate::domain::{Candle, Direction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::market_structure::StructureEvent;

/// How far back (in candles) an event may look for its supporting candle.
pub const ORDER_BLOCK_SEARCH_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBlock {
    /// Index of the supporting candle.
    pub index: usize,
    pub direction: Direction,
    pub top: f64,
    pub bottom: f64,
    /// Index of the structure event that produced this block.
    pub event_index: usize,
}

/// Locate the supporting candle for one structure event.
pub fn find_order_block(candles: &[Candle], event: &StructureEvent) -> Option<OrderBlock> {
    let stop = event.index.saturating_sub(ORDER_BLOCK_SEARCH_WINDOW);
    let qualifies = |c: &Candle| match event.direction {
        Direction::Bull => c.is_bearish(),
        Direction::Bear => c.is_bullish(),
    };

    (stop + 1..event.index)
        .rev()
        .find(|&j| candles.get(j).is_some_and(qualifies))
        .map(|j| OrderBlock {
            index: j,
            direction: event.direction,
            top: candles[j].high,
            bottom: candles[j].low,
            event_index: event.index,
        })
}

/// Every assignment in event order. Two events may target the same candle.
pub fn assign_order_blocks(candles: &[Candle], events: &[StructureEvent]) -> Vec<OrderBlock> {
    events
        .iter()
        .filter_map(|event| find_order_block(candles, event))
        .collect()
}

/// Collapse assignments to one block per candle, later events winning.
pub fn collapse_order_blocks(assignments: &[OrderBlock]) -> Vec<OrderBlock> {
    let mut slots: BTreeMap<usize, OrderBlock> = BTreeMap::new();
    for block in assignments {
        slots.insert(block.index, *block);
    }
    slots.into_values().collect()
}
