use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use sqlx::{PgPool, Row};

use crate::anomaly::models::{AnomalyEvent, Severity};
use crate::anomaly::repositories::AnomalyRepository;
use ctxwatch_common::error::{CtxError, CtxResult};

#[derive(Clone)]
pub struct PgAnomalyRepository {
    pool: PgPool,
    min_severity: Severity,
}

impl PgAnomalyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            min_severity: Severity::Low,
        }
    }

    /// Only load anomalies at or above `min_severity`.
    pub fn with_min_severity(mut self, min_severity: Severity) -> Self {
        self.min_severity = min_severity;
        self
    }

    fn map_row(row: &sqlx::postgres::PgRow) -> CtxResult<AnomalyEvent> {
        let severity_label: String = row
            .try_get("severity_level")
            .map_err(|e| CtxError::Database(e.to_string()))?;
        let severity = severity_label.parse::<Severity>().map_err(CtxError::Database)?;

        let payload = match row
            .try_get::<Value, _>("payload")
            .map_err(|e| CtxError::Database(e.to_string()))?
        {
            Value::Object(map) => map,
            other => {
                return Err(CtxError::Database(format!(
                    "anomaly payload is not an object: {other}"
                )))
            }
        };

        Ok(AnomalyEvent {
            event_date: row
                .try_get("event_date")
                .map_err(|e| CtxError::Database(e.to_string()))?,
            event_name: row
                .try_get("event_name")
                .map_err(|e| CtxError::Database(e.to_string()))?,
            deviation_pct: row
                .try_get("deviation_pct")
                .map_err(|e| CtxError::Database(e.to_string()))?,
            severity,
            payload,
        })
    }
}

#[async_trait]
impl AnomalyRepository for PgAnomalyRepository {
    async fn fetch_anomalies(&self, day: NaiveDate) -> CtxResult<Vec<AnomalyEvent>> {
        let severities: Vec<String> = self
            .min_severity
            .at_or_above()
            .into_iter()
            .map(str::to_owned)
            .collect();

        let rows = sqlx::query(
            "select to_jsonb(t) as payload,
                    t.event_date,
                    t.event_name,
                    t.deviation_pct::float8 as deviation_pct,
                    t.severity_level
             from anomaly_scored_events t
             where t.event_date = $1
               and t.is_anomaly = true
               and upper(t.severity_level) = any($2)
             order by t.event_name",
        )
        .bind(day)
        .bind(&severities)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CtxError::Database(e.to_string()))?;

        rows.iter().map(Self::map_row).collect()
    }
}
