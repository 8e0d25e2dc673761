use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::context::models::ContextSignal;
use crate::context::repositories::ContextRepository;
use ctxwatch_common::error::{CtxError, CtxResult};

#[derive(Clone)]
pub struct PgContextRepository {
    pool: PgPool,
}

impl PgContextRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_rows(
        rows: &[PgRow],
        name_column: &str,
        make: fn(String, Option<String>) -> ContextSignal,
    ) -> CtxResult<Vec<ContextSignal>> {
        rows.iter()
            .map(|row| {
                let name: String = row
                    .try_get(name_column)
                    .map_err(|e| CtxError::Database(e.to_string()))?;
                let description: Option<String> = row
                    .try_get("description")
                    .map_err(|e| CtxError::Database(e.to_string()))?;
                Ok(make(name, description))
            })
            .collect()
    }
}

#[async_trait]
impl ContextRepository for PgContextRepository {
    async fn fetch_campaigns(&self, day: NaiveDate) -> CtxResult<Vec<ContextSignal>> {
        let rows = sqlx::query(
            "select campaign_name, description
             from campaign_context
             where campaign_date = $1
             order by campaign_name",
        )
        .bind(day)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CtxError::Database(e.to_string()))?;

        Self::map_rows(&rows, "campaign_name", |name, description| {
            ContextSignal::campaign(name, description)
        })
    }

    async fn fetch_news(&self, day: NaiveDate) -> CtxResult<Vec<ContextSignal>> {
        let rows = sqlx::query(
            "select headline, description
             from news_context
             where news_date = $1
             order by headline",
        )
        .bind(day)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CtxError::Database(e.to_string()))?;

        Self::map_rows(&rows, "headline", |name, description| {
            ContextSignal::news(name, description)
        })
    }
}
