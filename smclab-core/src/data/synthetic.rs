//! Deterministic synthetic candles for offline runs and tests.
//!
//! A random walk from 60 000 with per-candle moves in ±5 %. The seed is the
//! BLAKE3 hash of `symbol` and timeframe, so the same request always yields the
//! same series. The last candle opens one period before a fixed anchor, which
//! keeps every timeframe of one symbol on a shared time axis.

use super::provider::{DataError, DataSource, MarketDataProvider};
use crate::domain::{Candle, Series, Timeframe};
use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const BASE_PRICE: f64 = 60_000.0;
const MAX_MOVE: f64 = 0.05;
const MAX_WICK: f64 = 0.02;

#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    anchor: DateTime<Utc>,
}

impl Default for SyntheticProvider {
    fn default() -> Self {
        Self {
            anchor: Utc.timestamp_opt(1_704_067_200, 0).single().unwrap_or_default(), // 2024-01-01
        }
    }
}

impl SyntheticProvider {
    pub fn with_anchor(anchor: DateTime<Utc>) -> Self {
        Self { anchor }
    }

    pub fn generate(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Vec<Candle> {
        let seed_bytes = blake3::hash(format!("{symbol}:{timeframe}").as_bytes());
        let mut rng = StdRng::from_seed(*seed_bytes.as_bytes());

        let step = timeframe.duration();
        let start = self.anchor - step * limit as i32;
        let mut price = BASE_PRICE;

        (0..limit)
            .map(|i| {
                let change: f64 = rng.gen_range(-MAX_MOVE..MAX_MOVE);
                let open = price;
                let close = open * (1.0 + change);
                let high = open * (1.0 + change.abs() + rng.gen_range(0.0..MAX_WICK));
                let low = open * (1.0 - change.abs() - rng.gen_range(0.0..MAX_WICK));
                price = close;
                Candle {
                    timestamp: start + step * i as i32,
                    open,
                    high,
                    low,
                    close,
                    volume: rng.gen_range(100.0..1000.0),
                }
            })
            .collect()
    }
}

impl MarketDataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn source(&self) -> DataSource {
        DataSource::Synthetic
    }

    fn fetch(
        &self,
        _exchange: &str,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Series, DataError> {
        Ok(Series::new(self.generate(symbol, timeframe, limit))?)
    }
}
