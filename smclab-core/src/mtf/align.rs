//! Timestamp alignment of a higher timeframe onto a base series.
//!
//! For each base timestamp `t` the visible higher-timeframe index is the last
//! `j` with `higher[j] <= t` (carry-forward of the last known value). Base
//! indices before the first higher timestamp see nothing. A higher bar dated
//! after `t` can never be attached to `t`.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlignmentError {
    #[error("empty {0} series")]
    Empty(&'static str),

    #[error("higher timeframe timestamps not increasing at index {index}")]
    NonMonotonic { index: usize },

    #[error("higher timeframe range [{higher_start}, {higher_end}] does not overlap base range [{base_start}, {base_end}]")]
    Disjoint {
        base_start: DateTime<Utc>,
        base_end: DateTime<Utc>,
        higher_start: DateTime<Utc>,
        higher_end: DateTime<Utc>,
    },
}

/// Base index → visible higher-timeframe index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    visible: Vec<Option<usize>>,
}

impl Alignment {
    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    /// Higher-timeframe index visible at base index `base_index`.
    pub fn get(&self, base_index: usize) -> Option<usize> {
        self.visible.get(base_index).copied().flatten()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<usize>> + '_ {
        self.visible.iter().copied()
    }
}

/// Join `higher` onto `base` with "last value at or before" semantics.
///
/// Both slices must be strictly increasing. The ranges must overlap: a higher
/// series that starts after the base ends, or ends before the base starts,
/// cannot be related to it.
pub fn align_to_base(
    base: &[DateTime<Utc>],
    higher: &[DateTime<Utc>],
) -> Result<Alignment, AlignmentError> {
    let (Some(&base_start), Some(&base_end)) = (base.first(), base.last()) else {
        return Err(AlignmentError::Empty("base"));
    };
    let (Some(&higher_start), Some(&higher_end)) = (higher.first(), higher.last()) else {
        return Err(AlignmentError::Empty("higher timeframe"));
    };

    if let Some(index) = higher.windows(2).position(|w| w[1] <= w[0]) {
        return Err(AlignmentError::NonMonotonic { index: index + 1 });
    }
    if higher_start > base_end || higher_end < base_start {
        return Err(AlignmentError::Disjoint {
            base_start,
            base_end,
            higher_start,
            higher_end,
        });
    }

    let mut visible = Vec::with_capacity(base.len());
    let mut next = 0;
    let mut current = None;
    for &t in base {
        while next < higher.len() && higher[next] <= t {
            current = Some(next);
            next += 1;
        }
        visible.push(current);
    }

    Ok(Alignment { visible })
}
