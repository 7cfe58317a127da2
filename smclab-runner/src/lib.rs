//! smclab runner: configuration, data loading and analysis orchestration.
//!
//! This crate builds on `smclab-core` to provide:
//! - TOML configuration with validation and a deterministic config hash
//! - Candle loading with CSV/provider/synthetic fallback
//! - Single-timeframe reports and summaries
//! - Multi-timeframe fan-out with cooperative cancellation
//! - Tracing subscriber setup

pub mod config;
pub mod data_loader;
pub mod logging;
pub mod runner;

pub use config::{AnalyzerConfig, ConfigError, LoggingConfig, MtfSettings, RetryConfig};
pub use data_loader::{load_series, read_csv, LoadError, LoadOptions, LoadedSeries};
pub use logging::init_tracing;
pub use runner::{
    analyze_multi_timeframe, analyze_symbol, summarize_symbol, AnalysisReport, Provenance,
    RunError, SmcAnalysis,
};
