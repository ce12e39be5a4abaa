//! Document ingestion service.
//!
//! Handles upload intake: fingerprint deduplication, text conversion via
//! the extraction service, content-addressed byte storage, and document
//! row creation. Duplicate uploads short-circuit before any external call.

use std::sync::Arc;
use std::time::Instant;

use diesel::result::DatabaseErrorKind;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{actions, sources, Document, LogStatus, NewLogEntry};
use crate::repository::{DieselError, DocumentRepository};
use crate::storage::ContentStore;

use super::extract::{ExtractionError, Extractor};
use super::observer::ProcessingObserver;

/// Errors that can occur during ingestion.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("uploaded file is empty")]
    EmptyFile,

    #[error("file conversion failed: {0}")]
    Conversion(#[from] ExtractionError),

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Db(#[from] DieselError),
}

/// Result of ingesting an upload.
#[derive(Debug, Clone, Serialize)]
pub struct IngestResult {
    pub document_id: String,
    /// True when identical bytes were ingested before; the existing
    /// document is returned and nothing is re-processed.
    pub duplicate: bool,
}

/// Result of the read-only duplicate preflight.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateCheck {
    pub duplicate: bool,
    pub document_id: Option<String>,
    pub has_analysis: bool,
}

/// Service for ingesting uploaded documents.
#[derive(Clone)]
pub struct IngestService {
    documents: DocumentRepository,
    store: ContentStore,
    extractor: Arc<dyn Extractor>,
    observer: Arc<dyn ProcessingObserver>,
}

impl IngestService {
    pub fn new(
        documents: DocumentRepository,
        store: ContentStore,
        extractor: Arc<dyn Extractor>,
        observer: Arc<dyn ProcessingObserver>,
    ) -> Self {
        Self {
            documents,
            store,
            extractor,
            observer,
        }
    }

    /// Ingest an uploaded file.
    ///
    /// Computes the content fingerprint, short-circuits on a duplicate,
    /// converts the bytes to text through the extraction service, stores
    /// the bytes, and creates the document row in `PENDING`.
    pub async fn ingest(
        &self,
        content: &[u8],
        file_name: &str,
        media_type: Option<&str>,
    ) -> Result<IngestResult, IngestError> {
        if content.is_empty() {
            return Err(IngestError::EmptyFile);
        }

        let fingerprint = Document::compute_fingerprint(content);
        if let Some(existing) = self.documents.find_by_fingerprint(&fingerprint).await? {
            info!(
                document_id = %existing.id,
                file_name,
                "duplicate upload short-circuited"
            );
            return Ok(IngestResult {
                document_id: existing.id,
                duplicate: true,
            });
        }

        let media_type = media_type
            .filter(|m| !m.is_empty() && *m != "application/octet-stream")
            .map(|m| m.to_string())
            .or_else(|| infer::get(content).map(|t| t.mime_type().to_string()))
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let started = Instant::now();
        let text = match self.extractor.convert(file_name, &media_type, content).await {
            Ok(text) => text,
            Err(e) => {
                // No document row exists yet, so the entry carries no id.
                self.observer
                    .record(
                        NewLogEntry::new(actions::CONVERSION, LogStatus::Error)
                            .description(format!("conversion failed for {}: {}", file_name, e))
                            .source(sources::USER)
                            .duration_ms(started.elapsed().as_millis() as i64),
                    )
                    .await;
                return Err(e.into());
            }
        };
        let conversion_ms = started.elapsed().as_millis() as i64;

        self.store.save(&fingerprint, &media_type, content)?;

        let mut document = Document::new(
            fingerprint,
            file_name.to_string(),
            media_type,
            content.len() as i64,
        );
        document.text_content = Some(text);

        if let Err(e) = self.documents.insert(&document).await {
            if let DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) = e {
                // Lost an ingest race on identical bytes; surface the winner.
                if let Some(existing) =
                    self.documents.find_by_fingerprint(&document.fingerprint).await?
                {
                    return Ok(IngestResult {
                        document_id: existing.id,
                        duplicate: true,
                    });
                }
            }
            return Err(e.into());
        }

        self.observer
            .record(
                NewLogEntry::new(actions::CONVERSION, LogStatus::Success)
                    .document(&document.id)
                    .description(format!("converted {} to text", file_name))
                    .source(sources::USER)
                    .duration_ms(conversion_ms),
            )
            .await;
        self.observer
            .record(
                NewLogEntry::new(actions::UPLOAD, LogStatus::Success)
                    .document(&document.id)
                    .description(format!("uploaded {}", file_name))
                    .source(sources::USER)
                    .metadata(serde_json::json!({
                        "file_name": file_name,
                        "media_type": document.media_type,
                        "file_size": document.file_size,
                        "fingerprint": document.fingerprint,
                    })),
            )
            .await;

        info!(document_id = %document.id, file_name, "document ingested");
        Ok(IngestResult {
            document_id: document.id,
            duplicate: false,
        })
    }

    /// Read-only preflight: would these bytes be a duplicate upload?
    pub async fn check_duplicate(&self, content: &[u8]) -> Result<DuplicateCheck, IngestError> {
        let fingerprint = Document::compute_fingerprint(content);
        match self.documents.find_by_fingerprint(&fingerprint).await? {
            Some(existing) => {
                let has_analysis = self.documents.has_analysis(&existing.id).await?;
                Ok(DuplicateCheck {
                    duplicate: true,
                    document_id: Some(existing.id),
                    has_analysis,
                })
            }
            None => Ok(DuplicateCheck {
                duplicate: false,
                document_id: None,
                has_analysis: false,
            }),
        }
    }

    /// Delete a document, its stage results, and its stored bytes.
    ///
    /// Ledger entries referencing the document are kept. The stored file
    /// is removed best-effort after the database delete.
    pub async fn delete(&self, document_id: &str) -> Result<bool, IngestError> {
        let Some(document) = self.documents.get(document_id).await? else {
            return Ok(false);
        };

        if !self.documents.delete(document_id).await? {
            return Ok(false);
        }

        if let Err(e) = self.store.remove(&document.fingerprint, &document.media_type) {
            warn!(document_id, error = %e, "failed to remove stored content");
        }

        info!(document_id, "document deleted");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::models::{
        BasicInfo, ClauseAnalysis, LogQuery, ProcessingStatus, ServiceInfo, StageOutput,
        StandardClause,
    };
    use crate::repository::DbContext;
    use crate::services::observer::LedgerObserver;

    struct StubExtractor {
        fail_convert: bool,
        convert_calls: AtomicUsize,
    }

    impl StubExtractor {
        fn new() -> Self {
            Self {
                fail_convert: false,
                convert_calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                fail_convert: true,
                convert_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl Extractor for StubExtractor {
        async fn convert(
            &self,
            _file_name: &str,
            _media_type: &str,
            _content: &[u8],
        ) -> Result<String, ExtractionError> {
            self.convert_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_convert {
                Err(ExtractionError::Unavailable("connection refused".to_string()))
            } else {
                Ok("converted text".to_string())
            }
        }

        async fn basic_info(&self, _text: &str) -> Result<BasicInfo, ExtractionError> {
            Ok(BasicInfo::default())
        }

        async fn analyze_clauses(
            &self,
            _text: &str,
            _standard_clauses: &[StandardClause],
        ) -> Result<ClauseAnalysis, ExtractionError> {
            Ok(ClauseAnalysis::default())
        }

        async fn service_info(&self, _text: &str) -> Result<ServiceInfo, ExtractionError> {
            Ok(ServiceInfo::default())
        }
    }

    async fn setup_with(
        extractor: StubExtractor,
    ) -> (IngestService, DbContext, Arc<StubExtractor>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = DbContext::new(&dir.path().join("redline.db"), &dir.path().join("documents"));
        ctx.init_schema().await.unwrap();

        let extractor = Arc::new(extractor);
        let observer = Arc::new(LedgerObserver::new(ctx.logs()));
        let service = IngestService::new(
            ctx.documents(),
            ctx.content_store(),
            extractor.clone(),
            observer,
        );
        (service, ctx, extractor, dir)
    }

    async fn setup() -> (IngestService, DbContext, Arc<StubExtractor>, tempfile::TempDir) {
        setup_with(StubExtractor::new()).await
    }

    #[tokio::test]
    async fn test_ingest_creates_pending_document() {
        let (service, ctx, _extractor, _dir) = setup().await;

        let result = service
            .ingest(b"contract body", "contract.pdf", Some("application/pdf"))
            .await
            .unwrap();
        assert!(!result.duplicate);

        let doc = ctx
            .documents()
            .get(&result.document_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.status, ProcessingStatus::Pending);
        assert_eq!(doc.text_content.as_deref(), Some("converted text"));
        assert_eq!(doc.file_size, 13);
        assert!(ctx.content_store().exists(&doc.fingerprint, &doc.media_type));

        let page = ctx.logs().query(&LogQuery::default()).await.unwrap();
        assert_eq!(page.total, 2);
        let actions: Vec<&str> = page.entries.iter().map(|e| e.action.as_str()).collect();
        assert!(actions.contains(&"CONVERSION"));
        assert!(actions.contains(&"UPLOAD"));
    }

    #[tokio::test]
    async fn test_duplicate_upload_short_circuits() {
        let (service, _ctx, extractor, _dir) = setup().await;

        let first = service
            .ingest(b"identical bytes", "original.pdf", Some("application/pdf"))
            .await
            .unwrap();
        // Same bytes under a different name and media type still dedup.
        let second = service
            .ingest(b"identical bytes", "renamed.docx", Some("text/plain"))
            .await
            .unwrap();

        assert!(!first.duplicate);
        assert!(second.duplicate);
        assert_eq!(first.document_id, second.document_id);
        assert_eq!(extractor.convert_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_conversion_failure_creates_no_document() {
        let (service, ctx, _extractor, _dir) = setup_with(StubExtractor::failing()).await;

        let err = service
            .ingest(b"unreadable", "contract.pdf", Some("application/pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Conversion(_)));
        assert_eq!(ctx.documents().count(None).await.unwrap(), 0);

        let page = ctx.logs().query(&LogQuery::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.entries[0].action, "CONVERSION");
        assert_eq!(page.entries[0].status, LogStatus::Error);
        assert_eq!(page.entries[0].document_id, None);
    }

    #[tokio::test]
    async fn test_empty_upload_rejected() {
        let (service, ctx, _extractor, _dir) = setup().await;

        let err = service
            .ingest(b"", "empty.pdf", Some("application/pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::EmptyFile));
        assert_eq!(ctx.documents().count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_media_type_sniffed_when_missing() {
        let (service, ctx, _extractor, _dir) = setup().await;

        let result = service
            .ingest(b"%PDF-1.4 fake pdf content", "upload.bin", None)
            .await
            .unwrap();
        let doc = ctx
            .documents()
            .get(&result.document_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.media_type, "application/pdf");
    }

    #[tokio::test]
    async fn test_check_duplicate_reports_analysis_state() {
        let (service, ctx, _extractor, _dir) = setup().await;

        let check = service.check_duplicate(b"contract body").await.unwrap();
        assert!(!check.duplicate);
        assert_eq!(check.document_id, None);

        let result = service
            .ingest(b"contract body", "contract.pdf", Some("application/pdf"))
            .await
            .unwrap();

        let check = service.check_duplicate(b"contract body").await.unwrap();
        assert!(check.duplicate);
        assert_eq!(check.document_id.as_deref(), Some(result.document_id.as_str()));
        assert!(!check.has_analysis);

        // Walk the document up to a committed analysis result.
        let documents = ctx.documents();
        let id = result.document_id.as_str();
        assert!(documents.advance(id, ProcessingStatus::Pending).await.unwrap());
        assert!(documents
            .save_stage_output(
                id,
                &StageOutput::BasicInfo(BasicInfo::default()),
                ProcessingStatus::ProcessingBasicInfo,
            )
            .await
            .unwrap());
        assert!(documents
            .save_stage_output(
                id,
                &StageOutput::Analysis {
                    result: ClauseAnalysis::default(),
                    standard_clauses: Vec::new(),
                },
                ProcessingStatus::ProcessingAnalysis,
            )
            .await
            .unwrap());

        let check = service.check_duplicate(b"contract body").await.unwrap();
        assert!(check.has_analysis);
    }

    #[tokio::test]
    async fn test_delete_removes_row_and_content() {
        let (service, ctx, _extractor, _dir) = setup().await;

        let result = service
            .ingest(b"contract body", "contract.pdf", Some("application/pdf"))
            .await
            .unwrap();
        let doc = ctx
            .documents()
            .get(&result.document_id)
            .await
            .unwrap()
            .unwrap();

        assert!(service.delete(&result.document_id).await.unwrap());
        assert!(ctx
            .documents()
            .get(&result.document_id)
            .await
            .unwrap()
            .is_none());
        assert!(!ctx.content_store().exists(&doc.fingerprint, &doc.media_type));

        assert!(!service.delete(&result.document_id).await.unwrap());
    }
}
