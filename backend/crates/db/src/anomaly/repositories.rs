use async_trait::async_trait;
use chrono::NaiveDate;

use crate::anomaly::models::AnomalyEvent;
use ctxwatch_common::error::CtxResult;

/// Read side of the upstream anomaly feed.
#[async_trait]
pub trait AnomalyRepository: Send + Sync {
    /// Every flagged anomaly for `day`, in a stable order.
    async fn fetch_anomalies(&self, day: NaiveDate) -> CtxResult<Vec<AnomalyEvent>>;
}
