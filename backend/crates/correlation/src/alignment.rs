//! Direction alignment pre-filter.
//!
//! A deliberately coarse heuristic: a positive deviation can only be explained
//! by campaign activity, a negative one only by news. Its job is to keep the
//! semantic classifier away from anomalies with no plausible context at all,
//! not to decide anything on its own.

use serde::Serialize;

use crate::index::ContextIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Positive,
    Negative,
}

impl Direction {
    /// Zero (and NaN) count as negative.
    pub fn of(deviation_pct: f64) -> Self {
        if deviation_pct > 0.0 {
            Direction::Positive
        } else {
            Direction::Negative
        }
    }
}

pub fn is_eligible(direction: Direction, has_campaign: bool, has_news: bool) -> bool {
    match direction {
        Direction::Positive => has_campaign,
        Direction::Negative => has_news,
    }
}

/// Convenience wrapper used by the runner.
pub fn eligible_for(deviation_pct: f64, index: &ContextIndex) -> bool {
    is_eligible(
        Direction::of(deviation_pct),
        index.has_campaign(),
        index.has_news(),
    )
}
