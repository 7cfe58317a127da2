//! smclab CLI: Smart-Money-Concepts analysis from the command line.
//!
//! Commands:
//! - `analyze`: single-timeframe structure, zones and signals
//! - `mtf`: multi-timeframe analysis composed on the base timeframe
//! - `summary`: trend, signal strength, key levels and a recommendation
//!
//! Results are printed to stdout as JSON. When no candles can be obtained the
//! output is `null`. Logs go to stderr.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::warn;

use smclab_core::data::{BinanceProvider, MarketDataProvider};
use smclab_core::domain::Timeframe;
use smclab_runner::{
    analyze_multi_timeframe, analyze_symbol, init_tracing, summarize_symbol, AnalyzerConfig,
    LoadOptions, RunError,
};

#[derive(Parser)]
#[command(
    name = "smclab",
    about = "smclab CLI: Smart-Money-Concepts market structure analysis"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one symbol on one timeframe.
    Analyze {
        #[command(flatten)]
        common: CommonArgs,

        /// Timeframe (1m, 5m, 15m, 30m, 1h, 2h, 4h, 6h, 8h, 12h, 1d, 3d, 1w). Defaults to the config's.
        #[arg(long)]
        timeframe: Option<Timeframe>,
    },
    /// Multi-timeframe analysis on the configured base timeframe.
    Mtf {
        #[command(flatten)]
        common: CommonArgs,

        /// Base timeframe. Defaults to the config's.
        #[arg(long)]
        base: Option<Timeframe>,
    },
    /// Condensed summary of a single-timeframe analysis.
    Summary {
        #[command(flatten)]
        common: CommonArgs,

        /// Timeframe. Defaults to the config's.
        #[arg(long)]
        timeframe: Option<Timeframe>,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Symbol, e.g. BTC/USDT. Defaults to the config's.
    #[arg(long)]
    symbol: Option<String>,

    /// Read candles from a CSV file, or a directory of <timeframe>.csv files.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Offline mode: never contact the exchange.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Use synthetic candles when no other data is available.
    #[arg(long, default_value_t = false)]
    synthetic: bool,
}

impl CommonArgs {
    fn load_config(&self) -> Result<AnalyzerConfig> {
        let mut config = match &self.config {
            Some(path) => AnalyzerConfig::load(path)?,
            None => AnalyzerConfig::default(),
        };
        if let Some(symbol) = &self.symbol {
            config.symbol = symbol.clone();
        }
        Ok(config)
    }

    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            csv: self.csv.clone(),
            synthetic: self.synthetic,
        }
    }

    fn provider(&self, config: &AnalyzerConfig) -> Result<Option<BinanceProvider>> {
        if self.offline {
            return Ok(None);
        }
        Ok(Some(BinanceProvider::new(config.retry.policy())?))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { common, timeframe } => {
            let mut config = common.load_config()?;
            if let Some(tf) = timeframe {
                config.timeframe = tf;
            }
            run(&common, config, |config, provider, opts| {
                analyze_symbol(config, provider, opts)
            })
        }
        Commands::Mtf { common, base } => {
            let mut config = common.load_config()?;
            if let Some(tf) = base {
                config.mtf.base_timeframe = tf;
            }
            run(&common, config, |config, provider, opts| {
                analyze_multi_timeframe(config, provider, opts, None)
            })
        }
        Commands::Summary { common, timeframe } => {
            let mut config = common.load_config()?;
            if let Some(tf) = timeframe {
                config.timeframe = tf;
            }
            run(&common, config, |config, provider, opts| {
                summarize_symbol(config, provider, opts)
            })
        }
    }
}

/// Validate, set up logging and the provider, then print the result as JSON.
fn run<T: Serialize>(
    common: &CommonArgs,
    config: AnalyzerConfig,
    op: impl FnOnce(
        &AnalyzerConfig,
        Option<&dyn MarketDataProvider>,
        &LoadOptions,
    ) -> Result<T, RunError>,
) -> Result<()> {
    config.validate()?;
    init_tracing(&config.logging)?;

    let provider = common.provider(&config)?;
    let provider = provider.as_ref().map(|p| p as &dyn MarketDataProvider);

    let value = match op(&config, provider, &common.load_options()) {
        Ok(result) => serde_json::to_value(result)?,
        Err(RunError::DataUnavailable {
            symbol,
            timeframe,
            source,
        }) => {
            warn!(%symbol, %timeframe, error = %source, "no data; printing null");
            serde_json::Value::Null
        }
        Err(e) => return Err(e.into()),
    };

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
