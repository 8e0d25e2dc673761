use std::fmt;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::anomaly::models::{AnomalyEvent, Severity};
use ctxwatch_common::error::{CtxError, CtxResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContextSource {
    None,
    Campaign,
    News,
}

impl ContextSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextSource::None => "NONE",
            ContextSource::Campaign => "CAMPAIGN",
            ContextSource::News => "NEWS",
        }
    }
}

impl fmt::Display for ContextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final outcome for one anomaly in one run.
///
/// Built only through [`DecisionRecord::unexplained`] and
/// [`DecisionRecord::explained`], so `context_override` is never true while
/// `context_source` is `None`. There are no setters.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionRecord {
    event_date: NaiveDate,
    event_name: String,
    deviation_pct: f64,
    severity: Severity,
    context_override: bool,
    context_source: ContextSource,
    context_summary: Option<String>,
    decision_time: DateTime<Utc>,
    payload: Map<String, Value>,
}

impl DecisionRecord {
    pub fn unexplained(anomaly: &AnomalyEvent, decision_time: DateTime<Utc>) -> Self {
        Self {
            event_date: anomaly.event_date,
            event_name: anomaly.event_name.clone(),
            deviation_pct: anomaly.deviation_pct,
            severity: anomaly.severity,
            context_override: false,
            context_source: ContextSource::None,
            context_summary: None,
            decision_time,
            payload: anomaly.payload.clone(),
        }
    }

    pub fn explained(
        anomaly: &AnomalyEvent,
        source: ContextSource,
        summary: impl Into<String>,
        decision_time: DateTime<Utc>,
    ) -> CtxResult<Self> {
        if source == ContextSource::None {
            return Err(CtxError::Validation(format!(
                "context override for {} requires a context source",
                anomaly.event_name
            )));
        }

        Ok(Self {
            context_override: true,
            context_source: source,
            context_summary: Some(summary.into()),
            ..Self::unexplained(anomaly, decision_time)
        })
    }

    pub fn event_date(&self) -> NaiveDate {
        self.event_date
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    pub fn deviation_pct(&self) -> f64 {
        self.deviation_pct
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn context_override(&self) -> bool {
        self.context_override
    }

    pub fn context_source(&self) -> ContextSource {
        self.context_source
    }

    pub fn context_summary(&self) -> Option<&str> {
        self.context_summary.as_deref()
    }

    pub fn decision_time(&self) -> DateTime<Utc> {
        self.decision_time
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Persisted shape: every pass-through column of the anomaly, then the
    /// decision fields on top (decision fields win on a name clash).
    pub fn to_row(&self) -> Map<String, Value> {
        let mut row = self.payload.clone();
        row.insert("event_date".into(), Value::String(self.event_date.to_string()));
        row.insert("event_name".into(), Value::String(self.event_name.clone()));
        row.insert("deviation_pct".into(), Value::from(self.deviation_pct));
        row.insert("severity_level".into(), Value::String(self.severity.to_string()));
        row.insert("context_override".into(), Value::Bool(self.context_override));
        row.insert(
            "context_source".into(),
            Value::String(self.context_source.to_string()),
        );
        row.insert(
            "context_summary".into(),
            self.context_summary
                .clone()
                .map_or(Value::Null, Value::String),
        );
        row.insert(
            "context_decision_time".into(),
            Value::String(
                self.decision_time
                    .to_rfc3339_opts(SecondsFormat::Micros, true),
            ),
        );
        row
    }
}

impl Serialize for DecisionRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_row().serialize(serializer)
    }
}
