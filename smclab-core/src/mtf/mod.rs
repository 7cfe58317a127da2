//! Multi-timeframe alignment and composition.

pub mod align;
pub mod compose;

pub use align::{align_to_base, Alignment, AlignmentError};
pub use compose::{
    compose_multi_timeframe, MergedOutput, MergedResult, MtfConfig, TimeframeContribution,
    TimeframeStatus,
};
