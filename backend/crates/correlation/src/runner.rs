use std::fmt;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use ctxwatch_db::anomaly::models::AnomalyEvent;
use ctxwatch_db::anomaly::repositories::AnomalyRepository;
use ctxwatch_db::context::repositories::ContextRepository;
use ctxwatch_db::decision::models::DecisionRecord;
use ctxwatch_db::decision::repositories::DecisionRepository;

use crate::alignment::eligible_for;
use crate::classifier::{Classifier, Verdict};
use crate::index::ContextIndex;
use crate::merger::merge;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Loading,
    Indexing,
    Classifying,
    Committing,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunState::Loading => "loading",
            RunState::Indexing => "indexing",
            RunState::Classifying => "classifying",
            RunState::Committing => "committing",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failed,
    Cancelled,
}

/// Batch-scoped failures. Anomaly-scoped failures never reach this type.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("upstream unavailable during {stage}: {message}")]
    Upstream { stage: RunState, message: String },

    #[error("commit wrote {written} of {submitted} records")]
    CommitPartialFailure { submitted: usize, written: u64 },

    #[error("run cancelled during {stage}")]
    Cancelled { stage: RunState },
}

impl RunError {
    pub fn stage(&self) -> RunState {
        match self {
            RunError::Upstream { stage, .. } | RunError::Cancelled { stage } => *stage,
            RunError::CommitPartialFailure { .. } => RunState::Committing,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Evaluate without ever calling the commit collaborator.
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Upper bound on classifier calls in flight at once.
    pub concurrency: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self { concurrency: 8 }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub status: RunStatus,
    pub day: NaiveDate,
    pub anomalies_found: usize,
    pub eligible: usize,
    pub overridden: usize,
    pub classifier_calls: usize,
    pub rows_committed: u64,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<RunState>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub preview: Vec<DecisionRecord>,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

#[derive(Debug, Default)]
struct Progress {
    anomalies_found: usize,
    eligible: usize,
    overridden: usize,
    classifier_calls: usize,
    rows_committed: u64,
    preview: Vec<DecisionRecord>,
}

/// Outcome of the alignment + classification step for one anomaly.
struct Classified {
    position: usize,
    eligible: bool,
    record: DecisionRecord,
}

/// Orchestrates one run: load, index, classify, commit.
///
/// Collaborators are injected at construction and reused across runs; the
/// runner itself holds no per-run state.
pub struct BatchRunner<A, C, D, K> {
    anomalies: A,
    context: C,
    decisions: D,
    classifier: K,
    config: RunnerConfig,
}

impl<A, C, D, K> BatchRunner<A, C, D, K>
where
    A: AnomalyRepository,
    C: ContextRepository,
    D: DecisionRepository,
    K: Classifier,
{
    pub fn new(anomalies: A, context: C, decisions: D, classifier: K, config: RunnerConfig) -> Self {
        Self {
            anomalies,
            context,
            decisions,
            classifier,
            config,
        }
    }

    /// Run the pipeline for `day`. Always returns a definite result; batch
    /// failures are reported in it, never raised.
    pub async fn run_for_day(
        &self,
        day: NaiveDate,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> RunResult {
        let mut progress = Progress::default();
        let outcome = self.execute(day, options, cancel, &mut progress).await;

        let (status, error, failed_stage) = match outcome {
            Ok(()) => {
                Self::enter(day, RunState::Done);
                (RunStatus::Success, None, None)
            }
            Err(err) => {
                let stage = err.stage();
                let status = if matches!(err, RunError::Cancelled { .. }) {
                    tracing::warn!(%day, %stage, "run cancelled");
                    RunStatus::Cancelled
                } else {
                    tracing::error!(%day, %stage, error = %err, "run failed");
                    Self::enter(day, RunState::Failed);
                    RunStatus::Failed
                };
                (status, Some(err.to_string()), Some(stage))
            }
        };

        RunResult {
            status,
            day,
            anomalies_found: progress.anomalies_found,
            eligible: progress.eligible,
            overridden: progress.overridden,
            classifier_calls: progress.classifier_calls,
            rows_committed: progress.rows_committed,
            dry_run: options.dry_run,
            error,
            failed_stage,
            preview: progress.preview,
        }
    }

    fn enter(day: NaiveDate, state: RunState) {
        tracing::info!(%day, %state, "run state");
    }

    fn check_cancelled(cancel: &CancellationToken, stage: RunState) -> Result<(), RunError> {
        if cancel.is_cancelled() {
            return Err(RunError::Cancelled { stage });
        }
        Ok(())
    }

    async fn execute(
        &self,
        day: NaiveDate,
        options: &RunOptions,
        cancel: &CancellationToken,
        progress: &mut Progress,
    ) -> Result<(), RunError> {
        // ── LOADING ─────────────────────────────────────────────────
        Self::check_cancelled(cancel, RunState::Loading)?;
        Self::enter(day, RunState::Loading);
        let anomalies = self
            .anomalies
            .fetch_anomalies(day)
            .await
            .map_err(|e| RunError::Upstream {
                stage: RunState::Loading,
                message: e.to_string(),
            })?;
        progress.anomalies_found = anomalies.len();

        if anomalies.is_empty() {
            tracing::info!(%day, "no anomalies for day, nothing to do");
            return Ok(());
        }
        tracing::info!(%day, count = anomalies.len(), "anomalies loaded");

        // ── INDEXING ────────────────────────────────────────────────
        Self::check_cancelled(cancel, RunState::Indexing)?;
        Self::enter(day, RunState::Indexing);
        let index = self.build_index(day).await?;
        tracing::info!(
            %day,
            campaigns = index.campaigns().len(),
            news = index.news().len(),
            "context indexed"
        );

        // ── CLASSIFYING ─────────────────────────────────────────────
        Self::check_cancelled(cancel, RunState::Classifying)?;
        Self::enter(day, RunState::Classifying);
        let classified = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(RunError::Cancelled { stage: RunState::Classifying });
            }
            classified = self.classify_all(&anomalies, &index) => classified,
        };

        let mut records = Vec::with_capacity(classified.len());
        for item in classified {
            if item.eligible {
                progress.eligible += 1;
                progress.classifier_calls += 1;
            }
            if item.record.context_override() {
                progress.overridden += 1;
            }
            records.push(item.record);
        }
        tracing::info!(
            %day,
            eligible = progress.eligible,
            overridden = progress.overridden,
            "classification finished"
        );

        if options.dry_run {
            tracing::info!(%day, records = records.len(), "dry run, skipping commit");
            progress.preview = records;
            return Ok(());
        }

        // ── COMMITTING ──────────────────────────────────────────────
        Self::check_cancelled(cancel, RunState::Committing)?;
        Self::enter(day, RunState::Committing);
        let submitted = records.len();
        let written = self
            .decisions
            .commit_records(&records)
            .await
            .map_err(|e| RunError::Upstream {
                stage: RunState::Committing,
                message: e.to_string(),
            })?;

        if written != submitted as u64 {
            return Err(RunError::CommitPartialFailure { submitted, written });
        }
        progress.rows_committed = written;

        Ok(())
    }

    async fn build_index(&self, day: NaiveDate) -> Result<ContextIndex, RunError> {
        let upstream = |e: ctxwatch_common::error::CtxError| RunError::Upstream {
            stage: RunState::Indexing,
            message: e.to_string(),
        };

        let campaigns = self.context.fetch_campaigns(day).await.map_err(upstream)?;
        let news = self.context.fetch_news(day).await.map_err(upstream)?;

        Ok(ContextIndex::new(campaigns, news))
    }

    /// Fan out over anomalies with bounded concurrency, then put results back
    /// in input order so output never depends on completion order.
    async fn classify_all(&self, anomalies: &[AnomalyEvent], index: &ContextIndex) -> Vec<Classified> {
        // Built eagerly so the run future stays `Send` when boxed.
        let jobs: Vec<_> = anomalies
            .iter()
            .enumerate()
            .map(|(position, anomaly)| self.classify_one(position, anomaly, index))
            .collect();

        let mut classified: Vec<Classified> = stream::iter(jobs)
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        classified.sort_by_key(|c| c.position);
        classified
    }

    async fn classify_one(
        &self,
        position: usize,
        anomaly: &AnomalyEvent,
        index: &ContextIndex,
    ) -> Classified {
        let eligible = eligible_for(anomaly.deviation_pct, index);

        let verdict = if eligible {
            self.classifier
                .classify(
                    &anomaly.event_name,
                    anomaly.deviation_pct,
                    anomaly.severity,
                    index.campaigns(),
                    index.news(),
                )
                .await
        } else {
            Verdict::NotInfluenced
        };

        tracing::debug!(
            event_name = %anomaly.event_name,
            deviation_pct = anomaly.deviation_pct,
            eligible,
            ?verdict,
            "anomaly evaluated"
        );

        Classified {
            position,
            eligible,
            record: merge(anomaly, eligible, verdict, index),
        }
    }
}
