//! HTTP request handlers for the pipeline API.

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::models::{sources, LogQuery, LogStatus, ProcessingStatus, StandardClause};
use crate::repository::DieselError;
use crate::services::{ExtractionError, IngestError, RecoveryOptions, RunOptions};

fn default_limit() -> i64 {
    50
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

fn not_found(message: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
}

fn db_error(e: DieselError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": format!("Database error: {}", e) })),
    )
        .into_response()
}

fn ingest_error_response(e: IngestError) -> Response {
    let status = match &e {
        IngestError::EmptyFile => StatusCode::BAD_REQUEST,
        IngestError::Conversion(ExtractionError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        IngestError::Conversion(ExtractionError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
        IngestError::Conversion(_) => StatusCode::BAD_GATEWAY,
        IngestError::Io(_) | IngestError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": e.to_string() }))).into_response()
}

/// Service health probe.
/// GET /api/health
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Ingest an uploaded file.
/// POST /api/documents
///
/// The raw bytes form the request body; the original filename arrives in
/// the `x-file-name` header and the media type in `content-type`.
pub async fn upload_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let file_name = headers
        .get("x-file-name")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("upload")
        .to_string();
    let media_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    match state
        .ingest
        .ingest(&body, &file_name, media_type.as_deref())
        .await
    {
        Ok(result) => {
            let status = if result.duplicate {
                StatusCode::OK
            } else {
                StatusCode::CREATED
            };
            (status, Json(result)).into_response()
        }
        Err(e) => ingest_error_response(e),
    }
}

/// Read-only duplicate preflight.
/// POST /api/documents/check-duplicate
pub async fn check_duplicate(State(state): State<AppState>, body: Bytes) -> Response {
    match state.ingest.check_duplicate(&body).await {
        Ok(check) => Json(check).into_response(),
        Err(e) => ingest_error_response(e),
    }
}

/// Query params for document listings.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

/// List documents, newest uploads first.
/// GET /api/documents
pub async fn list_documents(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Response {
    let status = match params.status.as_deref() {
        Some(s) => match ProcessingStatus::from_str(s) {
            Some(status) => Some(status),
            None => return bad_request(format!("unknown status {:?}", s)),
        },
        None => None,
    };
    let limit = params.limit.clamp(1, 200);
    let offset = params.offset.max(0);

    let documents = match state.documents.list(status, limit, offset).await {
        Ok(docs) => docs,
        Err(e) => return db_error(e),
    };
    let total = match state.documents.count(status).await {
        Ok(total) => total,
        Err(e) => return db_error(e),
    };

    Json(json!({
        "documents": documents,
        "total": total,
        "limit": limit,
        "offset": offset,
    }))
    .into_response()
}

/// Fetch one document together with its stage results.
/// GET /api/documents/{id}
pub async fn document_detail(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Response {
    let document = match state.documents.get(&document_id).await {
        Ok(Some(doc)) => doc,
        Ok(None) => return not_found("Document not found"),
        Err(e) => return db_error(e),
    };

    let basic_info = match state.documents.get_basic_info(&document_id).await {
        Ok(info) => info,
        Err(e) => return db_error(e),
    };
    let analysis = match state.documents.get_analysis(&document_id).await {
        Ok(analysis) => analysis,
        Err(e) => return db_error(e),
    };
    let service_info = match state.documents.get_service_info(&document_id).await {
        Ok(info) => info,
        Err(e) => return db_error(e),
    };

    let analysis = analysis.map(|(result, standard_clauses)| {
        json!({
            "result": result,
            "standard_clauses": standard_clauses,
        })
    });

    Json(json!({
        "document": document,
        "basic_info": basic_info,
        "analysis": analysis,
        "service_info": service_info,
    }))
    .into_response()
}

/// Delete a document, its stage results, and its stored bytes.
/// DELETE /api/documents/{id}
pub async fn delete_document(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Response {
    match state.ingest.delete(&document_id).await {
        Ok(true) => Json(json!({ "deleted": true, "document_id": document_id })).into_response(),
        Ok(false) => not_found("Document not found"),
        Err(e) => ingest_error_response(e),
    }
}

/// Request body for triggering a pipeline run.
#[derive(Debug, Default, Deserialize)]
pub struct ProcessRequest {
    /// Reference clauses handed to the analysis stage.
    #[serde(default)]
    pub standard_clauses: Vec<StandardClause>,
    /// Per-stage timeout override in seconds.
    pub stage_timeout_secs: Option<u64>,
}

/// Start a pipeline run for a document.
/// POST /api/documents/{id}/process
///
/// The run executes as a background task; this returns 202 immediately.
/// A document already being processed gets a 200 with a notice instead.
pub async fn process_document(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
    body: Option<Json<ProcessRequest>>,
) -> Response {
    let Json(request) = body.unwrap_or_default();

    let document = match state.documents.get(&document_id).await {
        Ok(Some(doc)) => doc,
        Ok(None) => return not_found("Document not found"),
        Err(e) => return db_error(e),
    };

    if document.status.is_processing() {
        return Json(json!({
            "document_id": document_id,
            "status": document.status,
            "message": "document is already being processed",
        }))
        .into_response();
    }
    if document.status == ProcessingStatus::Completed {
        return Json(json!({
            "document_id": document_id,
            "status": document.status,
            "message": "document is already completed",
        }))
        .into_response();
    }
    if document.status == ProcessingStatus::Error {
        return (
            StatusCode::CONFLICT,
            Json(json!({
                "document_id": document_id,
                "status": document.status,
                "error": document.processing_error,
                "message": "document is in ERROR and must be reset before re-running",
            })),
        )
            .into_response();
    }

    let options = RunOptions {
        standard_clauses: request.standard_clauses,
        stage_timeout: request.stage_timeout_secs.map(Duration::from_secs),
        source: sources::USER.to_string(),
    };
    let pipeline = state.pipeline.clone();
    let id = document_id.clone();
    tokio::spawn(async move {
        match pipeline.run(&id, &options).await {
            Ok(report) => tracing::debug!(
                document_id = %report.document_id,
                outcome = ?report.outcome,
                "pipeline run finished"
            ),
            Err(e) => tracing::warn!(document_id = %id, error = %e, "pipeline run failed"),
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(json!({
            "document_id": document_id,
            "status": "accepted",
        })),
    )
        .into_response()
}

/// Request body for a recovery sweep.
#[derive(Debug, Default, Deserialize)]
pub struct RecoverRequest {
    /// Staleness threshold override in seconds.
    pub staleness_secs: Option<u64>,
    /// Batch size override.
    pub limit: Option<i64>,
}

/// Detect and restart stalled documents.
/// POST /api/documents/recover
pub async fn recover_documents(
    State(state): State<AppState>,
    body: Option<Json<RecoverRequest>>,
) -> Response {
    let Json(request) = body.unwrap_or_default();

    let mut options = RecoveryOptions::default();
    if let Some(staleness) = request.staleness_secs {
        options.staleness = Duration::from_secs(staleness);
    }
    if let Some(limit) = request.limit {
        options.limit = limit;
    }

    match state.recovery.recover(&options).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => db_error(e),
    }
}

/// List all in-flight documents regardless of staleness.
/// GET /api/documents/in-flight
pub async fn list_in_flight(State(state): State<AppState>) -> Response {
    match state.recovery.list_in_flight().await {
        Ok(documents) => Json(json!({
            "count": documents.len(),
            "documents": documents,
        }))
        .into_response(),
        Err(e) => db_error(e),
    }
}

/// Query params for ledger queries.
#[derive(Debug, Deserialize)]
pub struct LogParams {
    pub document_id: Option<String>,
    pub action: Option<String>,
    pub source: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

/// Query the processing ledger.
/// GET /api/logs
pub async fn list_logs(State(state): State<AppState>, Query(params): Query<LogParams>) -> Response {
    let status = match params.status.as_deref() {
        Some(s) => match LogStatus::from_str(s) {
            Some(status) => Some(status),
            None => return bad_request(format!("unknown log status {:?}", s)),
        },
        None => None,
    };

    let query = LogQuery {
        document_id: params.document_id,
        action: params.action,
        source: params.source,
        status,
        search: params.search,
        limit: params.limit,
        offset: params.offset,
    };

    match state.logs.query(&query).await {
        Ok(page) => Json(page).into_response(),
        Err(e) => db_error(e),
    }
}
