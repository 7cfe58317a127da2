//! Smart-money structure detectors.
//!
//! Each detector is a pure function of the candle slice. The market structure
//! scan is the only stateful pass and must run strictly forward; everything
//! else reads its output. Results are separate read-only collections keyed by
//! candle index.

pub mod fvg;
pub mod liquidity;
pub mod market_structure;
pub mod order_block;
pub mod swing;
pub mod timeline;

pub use fvg::{detect_fair_value_gaps, FairValueGap};
pub use liquidity::{
    detect_sweeps, recent_extremes, LiquiditySide, LiquiditySweep, LiquidityZone, SWEEP_WINDOW,
};
pub use market_structure::{
    scan_structure, StructureEvent, StructureKind, StructureScanner, TrendState,
};
pub use order_block::{
    assign_order_blocks, collapse_order_blocks, find_order_block, OrderBlock,
    ORDER_BLOCK_SEARCH_WINDOW,
};
pub use swing::{detect_swings, SwingFlags, SwingKind, SwingPoint, DEFAULT_SWING_LOOKBACK};
pub use timeline::{StructureState, StructureTimeline, Zone, ZoneSource};

/// Build candles from `(open, high, low, close)` tuples, one minute apart.
#[cfg(test)]
pub fn make_candles(data: &[(f64, f64, f64, f64)]) -> Vec<crate::domain::Candle> {
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| crate::domain::Candle {
            timestamp: base + chrono::Duration::minutes(i as i64),
            open,
            high,
            low,
            close,
            volume: 1000.0,
        })
        .collect()
}
