//! Pipeline orchestrator.
//!
//! Drives one document through its remaining stages in order, resuming
//! from the current status rather than restarting. A stage result and
//! the matching status advance commit in one transaction; losing the
//! status race discards the result instead of corrupting state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::models::{
    sources, LogStatus, NewLogEntry, ProcessingStatus, Stage, StageOutput, StandardClause,
};
use crate::repository::{DieselError, DocumentRepository};

use super::extract::{ExtractionError, Extractor};
use super::observer::ProcessingObserver;

/// Default bound on a single stage's external call.
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(300);

/// Options for one pipeline run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Reference clauses handed to the analysis stage.
    pub standard_clauses: Vec<StandardClause>,
    /// Per-stage timeout override.
    pub stage_timeout: Option<Duration>,
    /// Origin tag recorded on ledger entries for this run.
    pub source: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            standard_clauses: Vec::new(),
            stage_timeout: None,
            source: sources::BACKGROUND.to_string(),
        }
    }
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every remaining stage completed; the document is `COMPLETED`.
    Completed,
    /// The document was already `COMPLETED`; nothing ran.
    AlreadyCompleted,
    /// No document with the given id exists.
    NotFound,
    /// The document sits in `ERROR`; an explicit reset must precede a
    /// re-run.
    Faulted { reason: Option<String> },
    /// A stage attempt failed and the document was moved to `ERROR`.
    StageFailed { stage: Stage, reason: String },
    /// A concurrent run moved the document first; this run stopped
    /// without writing anything.
    Conflict { stage: Stage },
}

/// Report returned by [`PipelineService::run`].
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub document_id: String,
    #[serde(flatten)]
    pub outcome: RunOutcome,
}

/// Service that executes pipeline runs.
#[derive(Clone)]
pub struct PipelineService {
    documents: DocumentRepository,
    extractor: Arc<dyn Extractor>,
    observer: Arc<dyn ProcessingObserver>,
    stage_timeout: Duration,
}

impl PipelineService {
    pub fn new(
        documents: DocumentRepository,
        extractor: Arc<dyn Extractor>,
        observer: Arc<dyn ProcessingObserver>,
        stage_timeout: Duration,
    ) -> Self {
        Self {
            documents,
            extractor,
            observer,
            stage_timeout,
        }
    }

    /// Run every stage the document still owes.
    ///
    /// Stage failures and concurrency conflicts are reported in the
    /// outcome; only infrastructure failures surface as `Err`.
    pub async fn run(
        &self,
        document_id: &str,
        options: &RunOptions,
    ) -> Result<RunReport, DieselError> {
        let report = |outcome| RunReport {
            document_id: document_id.to_string(),
            outcome,
        };

        let Some(document) = self.documents.get(document_id).await? else {
            return Ok(report(RunOutcome::NotFound));
        };

        match document.status {
            ProcessingStatus::Completed => {
                return Ok(report(RunOutcome::AlreadyCompleted));
            }
            ProcessingStatus::Error => {
                return Ok(report(RunOutcome::Faulted {
                    reason: document.processing_error,
                }));
            }
            _ => {}
        }

        let text = document.text_content.unwrap_or_default();
        let timeout = options.stage_timeout.unwrap_or(self.stage_timeout);
        let mut status = document.status;

        for &stage in Stage::remaining_from(status) {
            if status != stage.marker() {
                // Claim the stage; a concurrent run may have won already.
                if !self.documents.advance(document_id, status).await? {
                    debug!(document_id, stage = stage.display_name(), "lost claim race");
                    return Ok(report(RunOutcome::Conflict { stage }));
                }
                status = stage.marker();
            }

            let started = Instant::now();
            let attempt =
                tokio::time::timeout(timeout, self.execute_stage(stage, &text, options)).await;
            let duration_ms = started.elapsed().as_millis() as i64;

            let output = match attempt {
                Ok(Ok(output)) => output,
                Ok(Err(e)) => {
                    let outcome = self
                        .fail_stage(document_id, stage, e.to_string(), duration_ms, options)
                        .await?;
                    return Ok(report(outcome));
                }
                Err(_) => {
                    let reason = format!(
                        "{} timed out after {}s",
                        stage.display_name(),
                        timeout.as_secs()
                    );
                    let outcome = self
                        .fail_stage(document_id, stage, reason, duration_ms, options)
                        .await?;
                    return Ok(report(outcome));
                }
            };

            if !self
                .documents
                .save_stage_output(document_id, &output, status)
                .await?
            {
                self.observer
                    .record(
                        NewLogEntry::new(stage.action(), LogStatus::Skipped)
                            .document(document_id)
                            .description(format!(
                                "{} result discarded after concurrent status change",
                                stage.display_name()
                            ))
                            .source(options.source.clone())
                            .duration_ms(duration_ms),
                    )
                    .await;
                return Ok(report(RunOutcome::Conflict { stage }));
            }

            self.observer
                .record(
                    NewLogEntry::new(stage.action(), LogStatus::Success)
                        .document(document_id)
                        .description(format!("{} completed", stage.display_name()))
                        .source(options.source.clone())
                        .duration_ms(duration_ms),
                )
                .await;
            info!(
                document_id,
                stage = stage.display_name(),
                duration_ms,
                "stage completed"
            );

            status = match status.successor() {
                Some(next) => next,
                None => break,
            };
        }

        Ok(report(RunOutcome::Completed))
    }

    /// Reset a document out of `ERROR` so it can be re-run from scratch.
    pub async fn reset_failed(&self, document_id: &str) -> Result<bool, DieselError> {
        self.documents
            .reset_from(document_id, ProcessingStatus::Error)
            .await
    }

    async fn execute_stage(
        &self,
        stage: Stage,
        text: &str,
        options: &RunOptions,
    ) -> Result<StageOutput, ExtractionError> {
        match stage {
            Stage::BasicInfo => {
                let info = self.extractor.basic_info(text).await?;
                Ok(StageOutput::BasicInfo(info.normalized()))
            }
            Stage::Analysis => {
                let result = self
                    .extractor
                    .analyze_clauses(text, &options.standard_clauses)
                    .await?;
                Ok(StageOutput::Analysis {
                    result,
                    standard_clauses: options.standard_clauses.clone(),
                })
            }
            Stage::ServiceInfo => {
                let info = self.extractor.service_info(text).await?;
                Ok(StageOutput::ServiceInfo(info))
            }
        }
    }

    async fn fail_stage(
        &self,
        document_id: &str,
        stage: Stage,
        reason: String,
        duration_ms: i64,
        options: &RunOptions,
    ) -> Result<RunOutcome, DieselError> {
        warn!(
            document_id,
            stage = stage.display_name(),
            reason = %reason,
            "stage failed"
        );
        self.documents.mark_failed(document_id, &reason).await?;
        self.observer
            .record(
                NewLogEntry::new(stage.action(), LogStatus::Error)
                    .document(document_id)
                    .description(reason.clone())
                    .source(options.source.clone())
                    .duration_ms(duration_ms),
            )
            .await;
        Ok(RunOutcome::StageFailed { stage, reason })
    }
}
