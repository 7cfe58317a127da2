//! Binance spot klines provider.
//!
//! Fetches candles from the public `/api/v3/klines` endpoint. No API key is
//! needed. Each row is `[open_time_ms, open, high, low, close, volume, ...]`
//! with prices encoded as strings.

use super::provider::{DataError, DataSource, MarketDataProvider, RetryPolicy};
use crate::domain::{Candle, Series, Timeframe};
use chrono::DateTime;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.binance.com";
/// Largest page the endpoint serves.
pub const MAX_KLINES: usize = 1000;

pub struct BinanceProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl BinanceProvider {
    pub fn new(retry: RetryPolicy) -> Result<Self, DataError> {
        Self::with_base_url(DEFAULT_BASE_URL, retry)
    }

    pub fn with_base_url(base_url: &str, retry: RetryPolicy) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    /// `BTC/USDT` → `BTCUSDT`.
    pub fn market_id(symbol: &str) -> String {
        symbol
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase()
    }

    fn klines_url(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> String {
        format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url,
            Self::market_id(symbol),
            timeframe.as_str(),
            limit.clamp(1, MAX_KLINES)
        )
    }

    fn fetch_once(&self, url: &str, symbol: &str) -> Result<Series, DataError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 418 {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(DataError::RateLimited {
                retry_after_secs: retry_after,
            });
        }
        if status == reqwest::StatusCode::BAD_REQUEST {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        if !status.is_success() {
            return Err(DataError::Other(format!("HTTP {status} for {symbol}")));
        }

        let rows: Vec<Vec<Value>> = resp.json().map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse klines for {symbol}: {e}"))
        })?;
        parse_klines(&rows)
    }
}

impl MarketDataProvider for BinanceProvider {
    fn name(&self) -> &str {
        "binance"
    }

    fn source(&self) -> DataSource {
        DataSource::Exchange
    }

    fn fetch(
        &self,
        exchange: &str,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Series, DataError> {
        if !exchange.eq_ignore_ascii_case("binance") {
            return Err(DataError::UnsupportedExchange(exchange.to_string()));
        }
        let url = self.klines_url(symbol, timeframe, limit);
        let series = self
            .retry
            .run(&format!("{symbol} {timeframe}"), |_| self.fetch_once(&url, symbol))?;
        debug!(%symbol, %timeframe, candles = series.len(), "fetched klines");
        Ok(series)
    }
}

/// Parse kline rows into a validated series.
pub fn parse_klines(rows: &[Vec<Value>]) -> Result<Series, DataError> {
    let candles = rows
        .iter()
        .enumerate()
        .map(|(i, row)| parse_row(row).ok_or_else(|| malformed(i)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Series::new(candles)?)
}

fn parse_row(row: &[Value]) -> Option<Candle> {
    let num = |idx: usize| -> Option<f64> {
        match row.get(idx)? {
            Value::String(s) => s.parse().ok(),
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    };
    let open_time = row.first()?.as_i64()?;
    Some(Candle {
        timestamp: DateTime::from_timestamp_millis(open_time)?,
        open: num(1)?,
        high: num(2)?,
        low: num(3)?,
        close: num(4)?,
        volume: num(5)?,
    })
}

fn malformed(index: usize) -> DataError {
    DataError::ResponseFormatChanged(format!("malformed kline row {index}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn market_id_strips_separator() {
        assert_eq!(BinanceProvider::market_id("BTC/USDT"), "BTCUSDT");
        assert_eq!(BinanceProvider::market_id("eth/usdt"), "ETHUSDT");
    }

    #[test]
    fn url_uses_interval_and_clamps_limit() {
        let provider = BinanceProvider::with_base_url("http://localhost/", RetryPolicy::default()).unwrap();
        assert_eq!(
            provider.klines_url("BTC/USDT", Timeframe::H4, 5000),
            "http://localhost/api/v3/klines?symbol=BTCUSDT&interval=4h&limit=1000"
        );
    }

    #[test]
    fn parses_string_prices() {
        let rows: Vec<Vec<Value>> = vec![
            vec![json!(1_700_000_000_000i64), json!("100.0"), json!("105.5"), json!("99.0"), json!("104.0"), json!("12.5"), json!(1_700_000_059_999i64)],
            vec![json!(1_700_000_060_000i64), json!("104.0"), json!("106.0"), json!("103.0"), json!("103.5"), json!("8.0"), json!(1_700_000_119_999i64)],
        ];
        let series = parse_klines(&rows).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].high, 105.5);
        assert_eq!(series[1].timestamp.timestamp(), 1_700_000_060);
    }

    #[test]
    fn malformed_row_is_format_error() {
        let rows = vec![vec![json!(1_700_000_000_000i64), json!("abc")]];
        assert!(matches!(
            parse_klines(&rows),
            Err(DataError::ResponseFormatChanged(_))
        ));
    }

    #[test]
    fn inconsistent_candle_is_validation_error() {
        // high below close
        let rows = vec![vec![json!(1_700_000_000_000i64), json!("100"), json!("101"), json!("99"), json!("102"), json!("1")]];
        assert!(matches!(parse_klines(&rows), Err(DataError::Validation(_))));
    }

    #[test]
    fn other_exchanges_rejected() {
        let provider = BinanceProvider::new(RetryPolicy::default()).unwrap();
        assert!(matches!(
            provider.fetch("kraken", "BTC/USDT", Timeframe::H1, 10),
            Err(DataError::UnsupportedExchange(_))
        ));
    }
}
