use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::decision::models::DecisionRecord;
use crate::decision::repositories::DecisionRepository;
use ctxwatch_common::error::{CtxError, CtxResult};

#[derive(Clone)]
pub struct PgDecisionRepository {
    pool: PgPool,
}

impl PgDecisionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DecisionRepository for PgDecisionRepository {
    async fn commit_records(&self, records: &[DecisionRecord]) -> CtxResult<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CtxError::Database(e.to_string()))?;

        let mut written = 0u64;
        for record in records {
            let result = sqlx::query(
                "insert into anomaly_contextualized_events
                 (id, event_date, event_name, deviation_pct, severity_level,
                  context_override, context_source, context_summary,
                  context_decision_time, payload)
                 values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(Uuid::new_v4())
            .bind(record.event_date())
            .bind(record.event_name())
            .bind(record.deviation_pct())
            .bind(record.severity().as_str())
            .bind(record.context_override())
            .bind(record.context_source().as_str())
            .bind(record.context_summary())
            .bind(record.decision_time())
            .bind(Json(Value::Object(record.to_row())))
            .execute(&mut *tx)
            .await
            .map_err(|e| CtxError::Database(e.to_string()))?;

            written += result.rows_affected();
        }

        // Dropping `tx` on the error paths above rolls everything back.
        tx.commit()
            .await
            .map_err(|e| CtxError::Database(e.to_string()))?;

        tracing::info!(rows = written, "decision records committed");
        Ok(written)
    }
}
