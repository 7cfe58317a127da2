//! Analysis runner: wires data loading, the structural engine and reporting.
//!
//! Three entry points:
//! - `analyze_symbol()`: one timeframe, full report.
//! - `analyze_multi_timeframe()`: fans out over the configured timeframes with
//!   rayon, waits for all of them, then composes on the base timeframe.
//! - `summarize_symbol()`: condensed view over a single-timeframe analysis.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use smclab_core::data::{DataSource, MarketDataProvider};
use smclab_core::diagnostics::Diagnostic;
use smclab_core::domain::{ConfigId, DatasetHash, Timeframe};
use smclab_core::indicators::IndicatorSnapshot;
use smclab_core::mtf::TimeframeStatus;
use smclab_core::output::Stamped;
use smclab_core::signals::{Signal, SignalBook};
use smclab_core::structure::{FairValueGap, LiquidityZone, OrderBlock, StructureEvent};
use smclab_core::summary::{summarize, EventCountScorer, Summary};
use smclab_core::{analyze, compose_multi_timeframe, AnalysisOutput, StructuralResult};

use crate::config::{AnalyzerConfig, ConfigError};
use crate::data_loader::{load_series, LoadError, LoadOptions, LoadedSeries};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("data unavailable for {symbol} {timeframe}: {source}")]
    DataUnavailable {
        symbol: String,
        timeframe: Timeframe,
        source: LoadError,
    },

    #[error("run cancelled")]
    Cancelled,

    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The structural lists of a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmcAnalysis {
    pub order_blocks: Vec<Stamped<OrderBlock>>,
    pub liquidity_zones: Vec<Stamped<LiquidityZone>>,
    pub fair_value_gaps: Vec<Stamped<FairValueGap>>,
    pub break_of_structure: Vec<Stamped<StructureEvent>>,
}

impl From<&AnalysisOutput> for SmcAnalysis {
    fn from(output: &AnalysisOutput) -> Self {
        Self {
            order_blocks: output.order_blocks.clone(),
            liquidity_zones: output.liquidity_zones.clone(),
            fair_value_gaps: output.fair_value_gaps.clone(),
            break_of_structure: output.break_of_structure.clone(),
        }
    }
}

/// Where a report's inputs came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub source: DataSource,
    pub dataset_hash: DatasetHash,
    pub config_id: ConfigId,
}

impl Provenance {
    pub fn is_synthetic(&self) -> bool {
        self.source == DataSource::Synthetic
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Unix seconds of the last candle.
    pub timestamp: i64,
    pub current_price: f64,
    pub smc_analysis: SmcAnalysis,
    pub trading_signals: SignalBook<Stamped<Signal>>,
    pub indicators: Option<IndicatorSnapshot>,
    /// Per-timeframe status, multi-timeframe reports only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframes: Option<BTreeMap<Timeframe, TimeframeStatus>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
    pub provenance: Provenance,
}

/// Analyze one symbol on `config.timeframe`.
pub fn analyze_symbol(
    config: &AnalyzerConfig,
    provider: Option<&dyn MarketDataProvider>,
    opts: &LoadOptions,
) -> Result<AnalysisReport, RunError> {
    let (report, _) = analyze_single(config, provider, opts)?;
    Ok(report)
}

/// Summarize one symbol on `config.timeframe` with the default scorer.
pub fn summarize_symbol(
    config: &AnalyzerConfig,
    provider: Option<&dyn MarketDataProvider>,
    opts: &LoadOptions,
) -> Result<Summary, RunError> {
    let (report, output) = analyze_single(config, provider, opts)?;
    Ok(summarize(
        &config.symbol,
        &output,
        report.indicators.as_ref(),
        &EventCountScorer::default(),
    ))
}

fn analyze_single(
    config: &AnalyzerConfig,
    provider: Option<&dyn MarketDataProvider>,
    opts: &LoadOptions,
) -> Result<(AnalysisReport, AnalysisOutput), RunError> {
    config.validate()?;
    let config_id = config.config_hash()?;
    let loaded = load(config, config.timeframe, config.candle_limit, provider, opts)?;

    let result = analyze(&loaded.series, config.swing_lookback);
    let output = result.output();
    info!(
        symbol = %config.symbol,
        timeframe = %config.timeframe,
        candles = loaded.series.len(),
        events = result.structure().events.len(),
        signals = result.signals().len(),
        "analysis complete"
    );

    let report = build_report(
        config,
        config.timeframe,
        &loaded,
        &output,
        output.trading_signals.clone(),
        output.diagnostics.clone(),
        config_id,
    )?;
    Ok((report, output))
}

/// Analyze every configured timeframe in parallel and compose on the base.
///
/// `cancel` is checked before each fetch, before each analysis and before
/// composition; once set, the run returns `RunError::Cancelled` and all
/// per-timeframe results are dropped.
pub fn analyze_multi_timeframe(
    config: &AnalyzerConfig,
    provider: Option<&dyn MarketDataProvider>,
    opts: &LoadOptions,
    cancel: Option<&AtomicBool>,
) -> Result<AnalysisReport, RunError> {
    config.validate()?;
    let config_id = config.config_hash()?;
    let settings = &config.mtf;
    let cancelled = || cancel.is_some_and(|f| f.load(Ordering::Relaxed));

    let outcomes: Vec<(Timeframe, Option<Result<(LoadedSeries, StructuralResult), RunError>>)> =
        settings
            .timeframes()
            .into_par_iter()
            .map(|timeframe| {
                if cancelled() {
                    return (timeframe, None);
                }
                let loaded = match load(config, timeframe, settings.candle_limit, provider, opts) {
                    Ok(loaded) => loaded,
                    Err(e) => return (timeframe, Some(Err(e))),
                };
                if cancelled() {
                    return (timeframe, None);
                }
                let result = analyze(&loaded.series, config.swing_lookback);
                (timeframe, Some(Ok((loaded, result))))
            })
            .collect();

    if cancelled() || outcomes.iter().any(|(_, o)| o.is_none()) {
        warn!(symbol = %config.symbol, "multi-timeframe run cancelled");
        return Err(RunError::Cancelled);
    }

    let mut diagnostics = Vec::new();
    let mut base = None;
    let mut higher = BTreeMap::new();
    for (timeframe, outcome) in outcomes {
        match outcome {
            Some(Ok((loaded, result))) => {
                if timeframe == settings.base_timeframe {
                    base = Some((loaded, result.clone()));
                }
                if settings.informative_timeframes.contains(&timeframe) {
                    higher.insert(timeframe, result);
                }
            }
            Some(Err(e)) if timeframe == settings.base_timeframe => return Err(e),
            Some(Err(e)) => {
                warn!(%timeframe, error = %e, "timeframe unavailable");
                diagnostics.push(Diagnostic::TimeframeUnavailable {
                    timeframe,
                    reason: e.to_string(),
                });
            }
            None => return Err(RunError::Cancelled),
        }
    }
    let Some((base_loaded, base_result)) = base else {
        return Err(RunError::Cancelled);
    };

    let merged = compose_multi_timeframe(&base_result, &higher, &settings.compose_config());
    let merged_output = merged.output();
    for diagnostic in &merged_output.diagnostics {
        if !already_unavailable(&diagnostics, diagnostic) {
            diagnostics.push(diagnostic.clone());
        }
    }
    info!(
        symbol = %config.symbol,
        base = %settings.base_timeframe,
        timeframes = higher.len(),
        signals = merged.signals().len(),
        "multi-timeframe analysis complete"
    );

    let mut report = build_report(
        config,
        settings.base_timeframe,
        &base_loaded,
        &base_result.output(),
        merged_output.trading_signals,
        diagnostics,
        config_id,
    )?;
    report.timeframes = Some(merged_output.timeframes);
    Ok(report)
}

/// A load failure already reported for the same timeframe.
fn already_unavailable(reported: &[Diagnostic], diagnostic: &Diagnostic) -> bool {
    let Diagnostic::TimeframeUnavailable { timeframe, .. } = diagnostic else {
        return false;
    };
    reported.iter().any(|d| {
        matches!(d, Diagnostic::TimeframeUnavailable { timeframe: t, .. } if t == timeframe)
    })
}

fn load(
    config: &AnalyzerConfig,
    timeframe: Timeframe,
    limit: usize,
    provider: Option<&dyn MarketDataProvider>,
    opts: &LoadOptions,
) -> Result<LoadedSeries, RunError> {
    load_series(&config.exchange, &config.symbol, timeframe, limit, provider, opts).map_err(
        |source| RunError::DataUnavailable {
            symbol: config.symbol.clone(),
            timeframe,
            source,
        },
    )
}

fn build_report(
    config: &AnalyzerConfig,
    timeframe: Timeframe,
    loaded: &LoadedSeries,
    output: &AnalysisOutput,
    trading_signals: SignalBook<Stamped<Signal>>,
    diagnostics: Vec<Diagnostic>,
    config_id: ConfigId,
) -> Result<AnalysisReport, RunError> {
    let last = loaded.series.last().ok_or_else(|| RunError::DataUnavailable {
        symbol: config.symbol.clone(),
        timeframe,
        source: LoadError::Unavailable {
            symbol: config.symbol.clone(),
            timeframe,
            reason: "empty series".into(),
        },
    })?;

    Ok(AnalysisReport {
        symbol: config.symbol.clone(),
        timeframe,
        timestamp: last.unix_secs(),
        current_price: last.close,
        smc_analysis: SmcAnalysis::from(output),
        trading_signals,
        indicators: IndicatorSnapshot::compute(&loaded.series, config.indicator_window),
        timeframes: None,
        diagnostics,
        provenance: Provenance {
            source: loaded.source,
            dataset_hash: loaded.dataset_hash.clone(),
            config_id,
        },
    })
}
