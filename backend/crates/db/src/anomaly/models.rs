use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use ctxwatch_common::types::Severity;

/// One scored event for a day, as read from the anomaly feed.
///
/// `payload` carries every column of the upstream row untouched so it can be
/// written back next to the decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyEvent {
    pub event_date: NaiveDate,
    pub event_name: String,
    pub deviation_pct: f64,
    pub severity: Severity,
    #[serde(default)]
    pub payload: Map<String, Value>,
}
