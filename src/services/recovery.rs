//! Stuck-task detection and recovery.
//!
//! An independent control loop over the document store: find in-flight
//! documents whose `updated_at` has gone stale, reset each to `PENDING`,
//! and restart its pipeline run. Candidates are handled in isolation so
//! one failure never aborts the sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::models::{actions, sources, Document, LogStatus, NewLogEntry, StandardClause};
use crate::repository::{DieselError, DocumentRepository};

use super::observer::ProcessingObserver;
use super::pipeline::{PipelineService, RunOptions};

/// Default staleness window before an in-flight document counts as stuck.
pub const DEFAULT_STALENESS: Duration = Duration::from_secs(300);

/// Default cap on documents restarted per sweep.
pub const DEFAULT_RECOVERY_LIMIT: i64 = 10;

/// Options for one recovery sweep.
#[derive(Debug, Clone)]
pub struct RecoveryOptions {
    /// How long `updated_at` must be untouched before a document counts
    /// as stuck.
    pub staleness: Duration,
    /// Maximum documents restarted in one sweep, oldest first.
    pub limit: i64,
    /// Per-stage timeout override for restarted runs.
    pub stage_timeout: Option<Duration>,
    /// Reference clauses for restarted analysis stages.
    pub standard_clauses: Vec<StandardClause>,
}

impl Default for RecoveryOptions {
    fn default() -> Self {
        Self {
            staleness: DEFAULT_STALENESS,
            limit: DEFAULT_RECOVERY_LIMIT,
            stage_timeout: None,
            standard_clauses: Vec::new(),
        }
    }
}

/// Per-document result of a recovery sweep.
#[derive(Debug, Clone, Serialize)]
pub struct RecoveryOutcome {
    pub document_id: String,
    pub disposition: RecoveryDisposition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryDisposition {
    /// Reset succeeded and a fresh run was started.
    Recovered,
    /// The document changed status before the reset landed.
    Failed,
    /// The store rejected the reset outright.
    Error,
}

/// Report returned by [`RecoveryService::recover`].
#[derive(Debug, Clone, Serialize)]
pub struct RecoveryReport {
    pub count: usize,
    pub outcomes: Vec<RecoveryOutcome>,
}

/// Service that detects and restarts stuck documents.
#[derive(Clone)]
pub struct RecoveryService {
    documents: DocumentRepository,
    pipeline: PipelineService,
    observer: Arc<dyn ProcessingObserver>,
}

impl RecoveryService {
    pub fn new(
        documents: DocumentRepository,
        pipeline: PipelineService,
        observer: Arc<dyn ProcessingObserver>,
    ) -> Self {
        Self {
            documents,
            pipeline,
            observer,
        }
    }

    /// Run one recovery sweep.
    ///
    /// Finding nothing stale is the normal case and yields `{count: 0}`.
    pub async fn recover(&self, options: &RecoveryOptions) -> Result<RecoveryReport, DieselError> {
        let cutoff = Utc::now() - chrono::Duration::seconds(options.staleness.as_secs() as i64);
        let stale = self.documents.find_stale(cutoff, options.limit).await?;

        if stale.is_empty() {
            debug!("no stale documents found");
            return Ok(RecoveryReport {
                count: 0,
                outcomes: Vec::new(),
            });
        }

        info!(count = stale.len(), "recovering stale documents");
        let mut outcomes = Vec::with_capacity(stale.len());
        for document in stale {
            outcomes.push(self.recover_one(document, options).await);
        }

        Ok(RecoveryReport {
            count: outcomes.len(),
            outcomes,
        })
    }

    /// All in-flight documents regardless of staleness, newest first.
    pub async fn list_in_flight(&self) -> Result<Vec<Document>, DieselError> {
        self.documents.list_in_flight().await
    }

    async fn recover_one(&self, document: Document, options: &RecoveryOptions) -> RecoveryOutcome {
        let stalled_status = document.status;

        match self.documents.reset_from(&document.id, stalled_status).await {
            Ok(true) => {}
            Ok(false) => {
                // The document moved on its own between scan and reset.
                self.observer
                    .record(
                        NewLogEntry::new(actions::RECOVERY, LogStatus::Skipped)
                            .document(&document.id)
                            .description(format!(
                                "status changed before reset from {}",
                                stalled_status.as_str()
                            ))
                            .source(sources::RECOVERY),
                    )
                    .await;
                return RecoveryOutcome {
                    document_id: document.id,
                    disposition: RecoveryDisposition::Failed,
                    detail: Some("status changed before reset".to_string()),
                };
            }
            Err(e) => {
                warn!(document_id = %document.id, error = %e, "recovery reset failed");
                self.observer
                    .record(
                        NewLogEntry::new(actions::RECOVERY, LogStatus::Error)
                            .document(&document.id)
                            .description(format!("reset failed: {}", e))
                            .source(sources::RECOVERY),
                    )
                    .await;
                return RecoveryOutcome {
                    document_id: document.id,
                    disposition: RecoveryDisposition::Error,
                    detail: Some(e.to_string()),
                };
            }
        }

        self.observer
            .record(
                NewLogEntry::new(actions::RECOVERY, LogStatus::Success)
                    .document(&document.id)
                    .description(format!(
                        "restarted document stalled in {}",
                        stalled_status.as_str()
                    ))
                    .source(sources::RECOVERY)
                    .metadata(serde_json::json!({
                        "stalled_status": stalled_status.as_str(),
                        "stalled_updated_at": document.updated_at.to_rfc3339(),
                    })),
            )
            .await;
        info!(
            document_id = %document.id,
            stalled = stalled_status.as_str(),
            "restarting stale document"
        );

        let pipeline = self.pipeline.clone();
        let document_id = document.id.clone();
        let run_options = RunOptions {
            standard_clauses: options.standard_clauses.clone(),
            stage_timeout: options.stage_timeout,
            source: sources::RECOVERY.to_string(),
        };
        tokio::spawn(async move {
            match pipeline.run(&document_id, &run_options).await {
                Ok(report) => debug!(
                    document_id = %report.document_id,
                    outcome = ?report.outcome,
                    "recovery run finished"
                ),
                Err(e) => warn!(document_id = %document_id, error = %e, "recovery run failed"),
            }
        });

        RecoveryOutcome {
            document_id: document.id,
            disposition: RecoveryDisposition::Recovered,
            detail: None,
        }
    }
}
