//! Decoration indicators.
//!
//! Indicators are pure functions of the candle history and never feed back
//! into the structural scan; they only enrich reports. Each produces a series
//! the same length as its input with `f64::NAN` during warmup.

pub mod ema;
pub mod rsi;
pub mod sma;
pub mod snapshot;

pub use ema::Ema;
pub use rsi::Rsi;
pub use sma::Sma;
pub use snapshot::IndicatorSnapshot;

use crate::domain::Candle;

/// Trait for indicators.
///
/// No value at index t may depend on candles after t.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g. "sma_20", "rsi_14").
    fn name(&self) -> &str;

    /// Number of candles needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute over the whole slice; output length equals `candles.len()`.
    fn compute(&self, candles: &[Candle]) -> Vec<f64>;
}

/// Create candles from closes for testing.
///
/// open = prev close (or close for the first), high/low one point outside the body.
#[cfg(test)]
pub fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
    let data: Vec<_> = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            (open, open.max(close) + 1.0, open.min(close) - 1.0, close)
        })
        .collect();
    crate::structure::make_candles(&data)
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
