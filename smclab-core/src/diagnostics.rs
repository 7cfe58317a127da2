//! Non-fatal conditions reported alongside analysis results.
//!
//! None of these abort an analysis. A diagnostic records what was skipped or
//! dropped so callers can tell an empty result from a degraded one.

use crate::domain::Timeframe;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    OrderBlock,
    FairValueGap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Series too short for structural analysis; the result is empty.
    InsufficientHistory { candles: usize, required: usize },
    /// A derived entity failed its invariant (`top > bottom`) and was dropped.
    InvalidEntity {
        entity: EntityKind,
        index: usize,
        top: f64,
        bottom: f64,
    },
    /// A higher timeframe could not be related to the base series.
    AlignmentMismatch { timeframe: Timeframe, reason: String },
    /// A timeframe's data or analysis was missing when composing.
    TimeframeUnavailable { timeframe: Timeframe, reason: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientHistory { candles, required } => {
                write!(f, "insufficient history: {candles} candles, need {required}")
            }
            Self::InvalidEntity {
                entity,
                index,
                top,
                bottom,
            } => write!(
                f,
                "dropped {entity:?} at {index}: top {top} is not above bottom {bottom}"
            ),
            Self::AlignmentMismatch { timeframe, reason } => {
                write!(f, "{timeframe} not aligned to base: {reason}")
            }
            Self::TimeframeUnavailable { timeframe, reason } => {
                write!(f, "{timeframe} unavailable: {reason}")
            }
        }
    }
}
