//! Candle loading and data resolution for the runner.
//!
//! Implements the fallback policy:
//! 1. If a CSV path is given and has data for the timeframe → use it
//! 2. Otherwise, if a provider is available → fetch from it
//! 3. If nothing was obtained and synthetic data is enabled → generate it (tagged)
//! 4. Otherwise → fail with `LoadError::Unavailable`
//!
//! A CSV path may be a file (used for any timeframe) or a directory holding
//! one `<timeframe>.csv` per timeframe, e.g. `4h.csv`.

use chrono::{TimeZone, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use smclab_core::data::{DataError, DataSource, MarketDataProvider, SyntheticProvider};
use smclab_core::domain::{Candle, DatasetHash, Series, SeriesError, Timeframe};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("read {path}: {source}")]
    Csv {
        path: PathBuf,
        source: csv::Error,
    },

    #[error("{path} line {line}: {reason}")]
    InvalidRow {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("invalid series: {0}")]
    Series(#[from] SeriesError),

    #[error("provider error: {0}")]
    Data(#[from] DataError),

    #[error("no candles for {symbol} {timeframe}: {reason} (use --synthetic for synthetic data)")]
    Unavailable {
        symbol: String,
        timeframe: Timeframe,
        reason: String,
    },
}

/// Options controlling where candles come from.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// CSV file, or directory of `<timeframe>.csv` files.
    pub csv: Option<PathBuf>,
    /// Generate synthetic candles when nothing else is available.
    pub synthetic: bool,
}

impl LoadOptions {
    fn csv_for(&self, timeframe: Timeframe) -> Option<PathBuf> {
        let path = self.csv.as_ref()?;
        if path.is_dir() {
            let file = path.join(format!("{timeframe}.csv"));
            file.is_file().then_some(file)
        } else {
            Some(path.clone())
        }
    }
}

/// A loaded series with its provenance.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub series: Series,
    pub source: DataSource,
    pub dataset_hash: DatasetHash,
}

/// Load the most recent `limit` candles for one symbol and timeframe.
pub fn load_series(
    exchange: &str,
    symbol: &str,
    timeframe: Timeframe,
    limit: usize,
    provider: Option<&dyn MarketDataProvider>,
    opts: &LoadOptions,
) -> Result<LoadedSeries, LoadError> {
    let loaded = |series: Series, source| {
        let series = series.tail(limit);
        let dataset_hash = dataset_hash(symbol, timeframe, &series);
        debug!(%symbol, %timeframe, candles = series.len(), ?source, "series loaded");
        LoadedSeries {
            series,
            source,
            dataset_hash,
        }
    };

    // Step 1: CSV
    if let Some(path) = opts.csv_for(timeframe) {
        let series = read_csv(&path)?;
        if !series.is_empty() {
            return Ok(loaded(series, DataSource::CsvImport));
        }
        warn!(path = %path.display(), "CSV file has no candles");
    }

    // Step 2: provider
    let mut reason = String::from("no provider configured");
    if let Some(p) = provider {
        match p.fetch(exchange, symbol, timeframe, limit) {
            Ok(series) if !series.is_empty() => return Ok(loaded(series, p.source())),
            Ok(_) => reason = format!("{} returned no candles", p.name()),
            Err(e) => {
                warn!(provider = p.name(), %symbol, %timeframe, error = %e, "fetch failed");
                reason = e.to_string();
            }
        }
    }

    // Step 3: synthetic fallback
    if opts.synthetic {
        warn!(%symbol, %timeframe, "generating synthetic candles; results are tagged synthetic");
        let series = SyntheticProvider::default().fetch(exchange, symbol, timeframe, limit)?;
        return Ok(loaded(series, DataSource::Synthetic));
    }

    // Step 4: fail
    Err(LoadError::Unavailable {
        symbol: symbol.to_string(),
        timeframe,
        reason,
    })
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Read `timestamp,open,high,low,close,volume` rows (header required,
/// timestamps in unix milliseconds).
pub fn read_csv(path: &Path) -> Result<Series, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    let mut candles = Vec::new();
    for row in reader.deserialize::<CsvRow>() {
        let row = row.map_err(csv_err)?;
        let line = candles.len() as u64 + 2;
        let timestamp = Utc
            .timestamp_millis_opt(row.timestamp)
            .single()
            .ok_or_else(|| LoadError::InvalidRow {
                path: path.to_path_buf(),
                line,
                reason: format!("timestamp {} out of range", row.timestamp),
            })?;
        candles.push(Candle {
            timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }

    Ok(Series::new(candles)?)
}

/// Deterministic BLAKE3 hash over symbol, timeframe and every candle.
pub fn dataset_hash(symbol: &str, timeframe: Timeframe, series: &Series) -> DatasetHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(symbol.as_bytes());
    hasher.update(timeframe.as_str().as_bytes());
    for c in series.iter() {
        hasher.update(&c.timestamp.timestamp_millis().to_le_bytes());
        hasher.update(&c.open.to_le_bytes());
        hasher.update(&c.high.to_le_bytes());
        hasher.update(&c.low.to_le_bytes());
        hasher.update(&c.close.to_le_bytes());
        hasher.update(&c.volume.to_le_bytes());
    }
    DatasetHash(hasher.finalize().to_hex().to_string())
}
