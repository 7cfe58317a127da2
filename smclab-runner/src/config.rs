//! Analyzer configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file is a valid config. The value
//! is immutable once loaded and is passed explicitly into every run.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use smclab_core::data::RetryPolicy;
use smclab_core::domain::{ConfigId, Timeframe};
use smclab_core::structure::DEFAULT_SWING_LOOKBACK;
use smclab_core::MtfConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub exchange: String,
    pub symbol: String,
    /// Timeframe for single-timeframe analysis.
    pub timeframe: Timeframe,
    pub candle_limit: usize,
    pub swing_lookback: usize,
    /// Candles fed to the decoration indicators.
    pub indicator_window: usize,
    pub mtf: MtfSettings,
    pub retry: RetryConfig,
    pub logging: LoggingConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            exchange: "binance".into(),
            symbol: "BTC/USDT".into(),
            timeframe: Timeframe::H4,
            candle_limit: 500,
            swing_lookback: DEFAULT_SWING_LOOKBACK,
            indicator_window: 200,
            mtf: MtfSettings::default(),
            retry: RetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MtfSettings {
    pub base_timeframe: Timeframe,
    pub informative_timeframes: Vec<Timeframe>,
    /// Fastest informative timeframe, used only to veto entries.
    pub auxiliary_timeframe: Option<Timeframe>,
    pub candle_limit: usize,
}

impl Default for MtfSettings {
    fn default() -> Self {
        Self {
            base_timeframe: Timeframe::M15,
            informative_timeframes: vec![Timeframe::M15, Timeframe::H1, Timeframe::H4, Timeframe::D1],
            auxiliary_timeframe: Some(Timeframe::M15),
            candle_limit: 200,
        }
    }
}

impl MtfSettings {
    pub fn compose_config(&self) -> MtfConfig {
        MtfConfig {
            base_timeframe: self.base_timeframe,
            auxiliary: self.auxiliary_timeframe,
        }
    }

    /// Base plus informative timeframes, sorted and deduplicated.
    pub fn timeframes(&self) -> Vec<Timeframe> {
        let mut all = self.informative_timeframes.clone();
        all.push(self.base_timeframe);
        all.sort();
        all.dedup();
        all
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of the compact formatter.
    pub json: bool,
    /// Filter directives used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

impl AnalyzerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.symbol.trim().is_empty() {
            return invalid("symbol must not be empty");
        }
        if self.swing_lookback == 0 {
            return invalid("swing_lookback must be at least 1");
        }
        if self.candle_limit == 0 || self.mtf.candle_limit == 0 {
            return invalid("candle limits must be positive");
        }
        if self.indicator_window == 0 {
            return invalid("indicator_window must be positive");
        }
        if self.retry.max_attempts == 0 {
            return invalid("retry.max_attempts must be at least 1");
        }
        if self.mtf.informative_timeframes.is_empty() {
            return invalid("mtf.informative_timeframes must not be empty");
        }
        if let Some(aux) = self.mtf.auxiliary_timeframe {
            if !self.mtf.informative_timeframes.contains(&aux) {
                return Err(ConfigError::Invalid(format!(
                    "mtf.auxiliary_timeframe {aux} is not an informative timeframe"
                )));
            }
        }
        Ok(())
    }

    /// BLAKE3 of the canonical JSON encoding.
    pub fn config_hash(&self) -> Result<ConfigId, serde_json::Error> {
        let bytes = serde_json::to_vec(self)?;
        Ok(ConfigId::from_bytes(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AnalyzerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.timeframe, Timeframe::H4);
        assert_eq!(config.mtf.base_timeframe, Timeframe::M15);
        assert_eq!(config.swing_lookback, 20);
        assert_eq!(config.retry.policy().base_delay, Duration::from_secs(2));
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(AnalyzerConfig::from_toml("").unwrap(), AnalyzerConfig::default());
    }

    #[test]
    fn partial_toml_overrides() {
        let config = AnalyzerConfig::from_toml(
            r#"
            symbol = "ETH/USDT"
            timeframe = "1h"

            [mtf]
            informative_timeframes = ["15m", "4h"]
            "#,
        )
        .unwrap();
        assert_eq!(config.symbol, "ETH/USDT");
        assert_eq!(config.timeframe, Timeframe::H1);
        assert_eq!(config.mtf.candle_limit, 200);
        assert_eq!(
            config.mtf.timeframes(),
            vec![Timeframe::M15, Timeframe::H4]
        );
    }

    #[test]
    fn unknown_timeframe_fails_to_parse() {
        assert!(matches!(
            AnalyzerConfig::from_toml("timeframe = \"7m\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = AnalyzerConfig::default();
        config.swing_lookback = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AnalyzerConfig::default();
        config.mtf.informative_timeframes.clear();
        assert!(config.validate().is_err());

        let mut config = AnalyzerConfig::default();
        config.mtf.auxiliary_timeframe = Some(Timeframe::M1);
        assert!(config.validate().is_err());

        let mut config = AnalyzerConfig::default();
        config.candle_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_hash_is_deterministic() {
        let a = AnalyzerConfig::default();
        let mut b = a.clone();
        assert_eq!(a.config_hash().unwrap(), b.config_hash().unwrap());
        b.swing_lookback = 10;
        assert_ne!(a.config_hash().unwrap(), b.config_hash().unwrap());
    }

    #[test]
    fn timeframes_include_base() {
        let settings = MtfSettings {
            base_timeframe: Timeframe::M5,
            ..Default::default()
        };
        assert_eq!(settings.timeframes()[0], Timeframe::M5);
        assert_eq!(settings.compose_config().base_timeframe, Timeframe::M5);
    }
}
