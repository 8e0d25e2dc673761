use chrono::{DateTime, Utc};

use ctxwatch_db::anomaly::models::AnomalyEvent;
use ctxwatch_db::decision::models::{ContextSource, DecisionRecord};

use crate::classifier::Verdict;
use crate::index::ContextIndex;

pub const CAMPAIGN_SUMMARY: &str = "Anomaly aligns with active campaign activity.";
pub const NEWS_SUMMARY: &str = "Anomaly coincides with relevant external news.";

/// Combine eligibility, verdict and the day's context into the final record,
/// stamped with the current UTC time.
pub fn merge(
    anomaly: &AnomalyEvent,
    eligible: bool,
    verdict: Verdict,
    index: &ContextIndex,
) -> DecisionRecord {
    merge_at(anomaly, eligible, verdict, index, Utc::now())
}

/// Same as [`merge`] with an explicit decision time.
///
/// Campaign beats news when both are present.
pub fn merge_at(
    anomaly: &AnomalyEvent,
    eligible: bool,
    verdict: Verdict,
    index: &ContextIndex,
    decision_time: DateTime<Utc>,
) -> DecisionRecord {
    if !eligible || verdict != Verdict::Influenced {
        return DecisionRecord::unexplained(anomaly, decision_time);
    }

    let attribution = if index.has_campaign() {
        Some((ContextSource::Campaign, CAMPAIGN_SUMMARY))
    } else if index.has_news() {
        Some((ContextSource::News, NEWS_SUMMARY))
    } else {
        None
    };

    attribution
        .and_then(|(source, summary)| {
            DecisionRecord::explained(anomaly, source, summary, decision_time).ok()
        })
        .unwrap_or_else(|| DecisionRecord::unexplained(anomaly, decision_time))
}
