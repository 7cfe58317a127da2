//! Candle and Series: the fundamental market data units.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Index;
use std::sync::Arc;
use thiserror::Error;

/// OHLCV candle for a single symbol on a single timeframe.
///
/// `timestamp` is the candle's open time as reported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Returns true if every price and volume field is finite.
    pub fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
    }

    /// OHLC consistency: the body sits inside the wick range.
    pub fn is_sane(&self) -> bool {
        self.is_finite()
            && self.low <= self.high
            && self.low <= self.open
            && self.low <= self.close
            && self.open <= self.high
            && self.close <= self.high
    }

    /// Down candle (`close < open`).
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Up candle (`close > open`).
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Unix timestamp in seconds.
    pub fn unix_secs(&self) -> i64 {
        self.timestamp.timestamp()
    }
}

/// Input contract violations found while building a [`Series`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("timestamps must be strictly increasing (index {index})")]
    NonIncreasingTimestamp { index: usize },

    #[error("candle {index} has non-finite fields")]
    NonFinite { index: usize },

    #[error("candle {index} violates low <= open,close <= high")]
    Inconsistent { index: usize },
}

/// Chronologically ordered, index-addressable candle sequence.
///
/// Immutable once built and cheap to clone; every analysis pass borrows the
/// same allocation.
#[derive(Debug, Clone)]
pub struct Series {
    candles: Arc<[Candle]>,
}

impl Series {
    /// Validate and wrap a candle vector.
    pub fn new(candles: Vec<Candle>) -> Result<Self, SeriesError> {
        for (index, candle) in candles.iter().enumerate() {
            if !candle.is_finite() {
                return Err(SeriesError::NonFinite { index });
            }
            if !candle.is_sane() {
                return Err(SeriesError::Inconsistent { index });
            }
            if index > 0 && candle.timestamp <= candles[index - 1].timestamp {
                return Err(SeriesError::NonIncreasingTimestamp { index });
            }
        }
        Ok(Self {
            candles: candles.into(),
        })
    }

    pub fn empty() -> Self {
        Self {
            candles: Arc::from(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    pub fn first(&self) -> Option<&Candle> {
        self.candles.first()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Timestamp of the candle at `index`.
    pub fn timestamp(&self, index: usize) -> Option<DateTime<Utc>> {
        self.candles.get(index).map(|c| c.timestamp)
    }

    /// The most recent `n` candles as a new series (all of them if shorter).
    pub fn tail(&self, n: usize) -> Series {
        let start = self.candles.len().saturating_sub(n);
        Self {
            candles: Arc::from(&self.candles[start..]),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.candles.iter()
    }
}

impl Index<usize> for Series {
    type Output = Candle;

    fn index(&self, index: usize) -> &Candle {
        &self.candles[index]
    }
}

impl Serialize for Series {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.candles.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candle(minute: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp: Utc.timestamp_opt(1_700_000_000 + minute * 60, 0).unwrap(),
            open,
            high,
            low,
            close,
            volume: 10.0,
        }
    }

    #[test]
    fn accepts_well_formed_candles() {
        let series = Series::new(vec![
            candle(0, 100.0, 105.0, 98.0, 103.0),
            candle(1, 103.0, 104.0, 101.0, 102.0),
        ])
        .unwrap();
        assert_eq!(series.len(), 2);
        assert!(series[1].is_bearish());
        assert!(series[0].is_bullish());
    }

    #[test]
    fn rejects_duplicate_timestamp() {
        let err = Series::new(vec![
            candle(0, 100.0, 105.0, 98.0, 103.0),
            candle(0, 103.0, 104.0, 101.0, 102.0),
        ])
        .unwrap_err();
        assert_eq!(err, SeriesError::NonIncreasingTimestamp { index: 1 });
    }

    #[test]
    fn rejects_high_below_low() {
        let err = Series::new(vec![candle(0, 100.0, 97.0, 98.0, 99.0)]).unwrap_err();
        assert_eq!(err, SeriesError::Inconsistent { index: 0 });
    }

    #[test]
    fn rejects_nan() {
        let err = Series::new(vec![candle(0, f64::NAN, 105.0, 98.0, 103.0)]).unwrap_err();
        assert_eq!(err, SeriesError::NonFinite { index: 0 });
    }

    #[test]
    fn tail_keeps_most_recent() {
        let series = Series::new(
            (0..10)
                .map(|i| candle(i, 100.0, 101.0, 99.0, 100.0 + i as f64 * 0.1))
                .collect(),
        )
        .unwrap();
        let tail = series.tail(3);
        assert_eq!(tail.len(), 3);
        assert_eq!(tail[0].timestamp, series[7].timestamp);
        assert_eq!(series.tail(50).len(), 10);
    }
}
