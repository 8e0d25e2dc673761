use async_trait::async_trait;
use chrono::NaiveDate;

use crate::context::models::ContextSignal;
use ctxwatch_common::error::CtxResult;

#[async_trait]
pub trait ContextRepository: Send + Sync {
    async fn fetch_campaigns(&self, day: NaiveDate) -> CtxResult<Vec<ContextSignal>>;
    async fn fetch_news(&self, day: NaiveDate) -> CtxResult<Vec<ContextSignal>>;
}
