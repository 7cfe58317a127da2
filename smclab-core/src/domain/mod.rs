//! Domain types for smclab

pub mod candle;
pub mod ids;
pub mod timeframe;

pub use candle::{Candle, Series, SeriesError};
pub use ids::{ConfigId, DatasetHash, Fingerprint};
pub use timeframe::{Timeframe, TimeframeParseError};

use serde::{Deserialize, Serialize};

/// Directional bias shared by structure events, zones, sweeps and signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Bull,
    Bear,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Self::Bull => Self::Bear,
            Self::Bear => Self::Bull,
        }
    }

    pub fn is_bull(self) -> bool {
        matches!(self, Self::Bull)
    }
}
