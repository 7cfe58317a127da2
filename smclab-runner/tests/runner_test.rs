//! End-to-end runner tests over synthetic and CSV data.

use std::sync::atomic::AtomicBool;

use smclab_core::data::{DataError, DataSource, MarketDataProvider, SyntheticProvider};
use smclab_core::diagnostics::Diagnostic;
use smclab_core::domain::{Series, Timeframe};
use smclab_core::signals::SignalTag;
use smclab_core::summary::Trend;
use smclab_runner::{
    analyze_multi_timeframe, analyze_symbol, summarize_symbol, AnalyzerConfig, LoadOptions,
    RunError,
};

fn config() -> AnalyzerConfig {
    AnalyzerConfig {
        swing_lookback: 5,
        ..Default::default()
    }
}

/// Synthetic data, except for one timeframe that always fails.
struct FlakyProvider {
    broken: Timeframe,
}

impl MarketDataProvider for FlakyProvider {
    fn name(&self) -> &str {
        "flaky"
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
        if timeframe == self.broken {
            return Err(DataError::NetworkUnreachable("connection reset".into()));
        }
        SyntheticProvider::default().fetch(exchange, symbol, timeframe, limit)
    }
}

// ── Single timeframe ─────────────────────────────────────────────────

#[test]
fn single_timeframe_report_is_deterministic() {
    let provider = SyntheticProvider::default();
    let a = analyze_symbol(&config(), Some(&provider), &LoadOptions::default()).unwrap();
    let b = analyze_symbol(&config(), Some(&provider), &LoadOptions::default()).unwrap();
    assert_eq!(
        serde_json::to_vec(&a).unwrap(),
        serde_json::to_vec(&b).unwrap()
    );
    assert_eq!(a.provenance, b.provenance);
}

#[test]
fn report_lists_respect_output_limits() {
    let provider = SyntheticProvider::default();
    let report = analyze_symbol(&config(), Some(&provider), &LoadOptions::default()).unwrap();
    let smc = &report.smc_analysis;
    assert!(smc.order_blocks.len() <= 10);
    assert!(smc.fair_value_gaps.len() <= 20);
    assert!(smc.break_of_structure.len() <= 10);
    assert!(smc.liquidity_zones.len() <= 10);
    assert!(report.trading_signals.entry_long.len() <= 50);
    assert!(report
        .trading_signals
        .entry_long
        .iter()
        .all(|s| s.item.tag == SignalTag::LongSmcSimple));
}

#[test]
fn report_json_has_expected_shape() {
    let provider = SyntheticProvider::default();
    let report = analyze_symbol(&config(), Some(&provider), &LoadOptions::default()).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    for key in [
        "symbol",
        "timeframe",
        "timestamp",
        "current_price",
        "smc_analysis",
        "trading_signals",
        "indicators",
        "provenance",
    ] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
    assert_eq!(json["timeframe"], "4h");
    for key in ["entry_long", "entry_short", "exit_long", "exit_short"] {
        assert!(json["trading_signals"][key].is_array(), "missing {key}");
    }
    assert!(json.get("timeframes").is_none());
}

#[test]
fn short_history_gives_empty_lists_not_an_error() {
    let mut cfg = config();
    cfg.candle_limit = 30;
    let provider = SyntheticProvider::default();
    let report = analyze_symbol(&cfg, Some(&provider), &LoadOptions::default()).unwrap();
    assert!(report.smc_analysis.break_of_structure.is_empty());
    assert!(report.trading_signals.is_empty());
    assert!(report
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::InsufficientHistory { candles: 30, .. })));
}

#[test]
fn unavailable_data_propagates() {
    let provider = FlakyProvider {
        broken: Timeframe::H4,
    };
    let err = analyze_symbol(&config(), Some(&provider), &LoadOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        RunError::DataUnavailable {
            timeframe: Timeframe::H4,
            ..
        }
    ));
}

#[test]
fn summary_reflects_report() {
    let provider = SyntheticProvider::default();
    let summary = summarize_symbol(&config(), Some(&provider), &LoadOptions::default()).unwrap();
    let report = analyze_symbol(&config(), Some(&provider), &LoadOptions::default()).unwrap();
    assert_eq!(summary.symbol, "BTC/USDT");
    assert_eq!(summary.price, Some(report.current_price));
    assert!((0.0..=10.0).contains(&summary.signal_strength));
    let expected = match report.smc_analysis.break_of_structure.last() {
        Some(e) if e.item.direction.is_bull() => Trend::Bullish,
        Some(_) => Trend::Bearish,
        None => Trend::Neutral,
    };
    assert_eq!(summary.trend, expected);
}

// ── Multi-timeframe ──────────────────────────────────────────────────

#[test]
fn multi_timeframe_report_covers_every_timeframe() {
    let provider = SyntheticProvider::default();
    let report =
        analyze_multi_timeframe(&config(), Some(&provider), &LoadOptions::default(), None)
            .unwrap();
    assert_eq!(report.timeframe, Timeframe::M15);
    let timeframes = report.timeframes.as_ref().unwrap();
    assert_eq!(
        timeframes.keys().copied().collect::<Vec<_>>(),
        vec![Timeframe::M15, Timeframe::H1, Timeframe::H4, Timeframe::D1]
    );
    assert!(timeframes.values().all(|s| s.aligned && s.candles == 200));
    assert!(report
        .trading_signals
        .entry_long
        .iter()
        .chain(&report.trading_signals.entry_short)
        .all(|s| matches!(s.item.tag, SignalTag::LongSmcMtf | SignalTag::ShortSmcMtf)));
}

#[test]
fn failed_higher_timeframe_degrades_instead_of_failing() {
    let provider = FlakyProvider {
        broken: Timeframe::D1,
    };
    let report =
        analyze_multi_timeframe(&config(), Some(&provider), &LoadOptions::default(), None)
            .unwrap();
    let timeframes = report.timeframes.as_ref().unwrap();
    assert!(!timeframes.contains_key(&Timeframe::D1));
    assert!(report.diagnostics.iter().any(|d| matches!(
        d,
        Diagnostic::TimeframeUnavailable {
            timeframe: Timeframe::D1,
            ..
        }
    )));
}

#[test]
fn failed_auxiliary_is_reported_once() {
    let provider = FlakyProvider {
        broken: Timeframe::M15,
    };
    let mut config = config();
    config.mtf.base_timeframe = Timeframe::H1;
    let report =
        analyze_multi_timeframe(&config, Some(&provider), &LoadOptions::default(), None).unwrap();
    let m15_unavailable = report
        .diagnostics
        .iter()
        .filter(|d| {
            matches!(
                d,
                Diagnostic::TimeframeUnavailable {
                    timeframe: Timeframe::M15,
                    ..
                }
            )
        })
        .count();
    assert_eq!(m15_unavailable, 1);
    assert!(report
        .trading_signals
        .entry_long
        .iter()
        .chain(&report.trading_signals.entry_short)
        .all(|s| matches!(s.item.tag, SignalTag::LongSmcMtf | SignalTag::ShortSmcMtf)));
}

#[test]
fn failed_base_timeframe_is_data_unavailable() {
    let provider = FlakyProvider {
        broken: Timeframe::M15,
    };
    let err = analyze_multi_timeframe(&config(), Some(&provider), &LoadOptions::default(), None)
        .unwrap_err();
    assert!(matches!(err, RunError::DataUnavailable { .. }));
}

#[test]
fn multi_timeframe_is_deterministic_despite_parallelism() {
    let provider = SyntheticProvider::default();
    let run = || {
        let report =
            analyze_multi_timeframe(&config(), Some(&provider), &LoadOptions::default(), None)
                .unwrap();
        serde_json::to_string(&report).unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn unset_cancel_flag_lets_run_complete() {
    let provider = SyntheticProvider::default();
    let cancel = AtomicBool::new(false);
    assert!(analyze_multi_timeframe(
        &config(),
        Some(&provider),
        &LoadOptions::default(),
        Some(&cancel)
    )
    .is_ok());
}
