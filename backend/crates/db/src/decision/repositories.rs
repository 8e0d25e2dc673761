use async_trait::async_trait;

use crate::decision::models::DecisionRecord;
use ctxwatch_common::error::CtxResult;

/// Append-only sink for decision records.
#[async_trait]
pub trait DecisionRepository: Send + Sync {
    /// Append every record in one all-or-nothing operation and report how many
    /// rows were written. Implementations must either write all rows or return
    /// an error; a short count is treated as a failed commit by the caller.
    async fn commit_records(&self, records: &[DecisionRecord]) -> CtxResult<u64>;
}
