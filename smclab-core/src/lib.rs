//! smclab core: Smart-Money-Concepts structure detection and signal composition.
//!
//! This crate contains the analysis engine:
//! - Domain types (candles, series, timeframes)
//! - Structure detectors: swings, BOS/CHoCH, order blocks, fair value gaps, sweeps
//! - Per-index structure timeline and zone activity
//! - Single-timeframe and multi-timeframe signal composition
//! - Output contract, decoration indicators and the summary layer
//! - Market data provider trait with Binance and synthetic implementations

pub mod analysis;
pub mod data;
pub mod diagnostics;
pub mod domain;
pub mod indicators;
pub mod mtf;
pub mod output;
pub mod signals;
pub mod structure;
pub mod summary;

pub use analysis::{analyze, StructuralResult, StructureSet, MIN_HISTORY};
pub use diagnostics::Diagnostic;
pub use domain::{Candle, Direction, Series, Timeframe};
pub use mtf::{compose_multi_timeframe, MergedResult, MtfConfig};
pub use output::AnalysisOutput;
