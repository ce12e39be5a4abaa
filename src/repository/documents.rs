//! Diesel-based document repository for SQLite.
//!
//! Owns every mutation of the document state machine: guarded status
//! transitions, failure capture, recovery resets, and the transactional
//! write that commits a stage result together with its status advance.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use uuid::Uuid;

use super::pool::{AsyncSqlitePool, DieselError};
use super::records::{
    BasicInfoRecord, ClauseAnalysisRecord, DocumentRecord, NewBasicInfoRecord,
    NewClauseAnalysisRecord, NewDocumentRecord, NewServiceInfoRecord, ServiceInfoRecord,
};
use super::{deserialize_error, parse_datetime, serialize_error};
use crate::models::{
    BasicInfo, ClauseAnalysis, Document, ProcessingStatus, ServiceInfo, StageOutput,
    StandardClause,
};
use crate::schema::{basic_infos, clause_analyses, documents, service_infos};

/// Diesel-based document repository with compile-time query checking.
#[derive(Clone)]
pub struct DocumentRepository {
    pool: AsyncSqlitePool,
}

impl DocumentRepository {
    /// Create a new document repository.
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    // ========================================================================
    // Core CRUD Operations
    // ========================================================================

    /// Insert a freshly ingested document.
    ///
    /// The fingerprint column is unique, so inserting content that already
    /// exists fails with a `UniqueViolation` database error.
    pub async fn insert(&self, doc: &Document) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        let created_at = doc.created_at.to_rfc3339();
        let updated_at = doc.updated_at.to_rfc3339();
        let record = NewDocumentRecord {
            id: &doc.id,
            fingerprint: &doc.fingerprint,
            file_name: &doc.file_name,
            media_type: &doc.media_type,
            file_size: doc.file_size,
            text_content: doc.text_content.as_deref(),
            status: doc.status.as_str(),
            processing_error: doc.processing_error.as_deref(),
            created_at: &created_at,
            updated_at: &updated_at,
        };

        diesel::insert_into(documents::table)
            .values(&record)
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Get a document by ID.
    pub async fn get(&self, id: &str) -> Result<Option<Document>, DieselError> {
        let mut conn = self.pool.get().await?;

        let record: Option<DocumentRecord> = documents::table
            .find(id)
            .first(&mut conn)
            .await
            .optional()?;

        record.map(record_to_document).transpose()
    }

    /// Look up a document by its content fingerprint.
    pub async fn find_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<Document>, DieselError> {
        let mut conn = self.pool.get().await?;

        let record: Option<DocumentRecord> = documents::table
            .filter(documents::fingerprint.eq(fingerprint))
            .first(&mut conn)
            .await
            .optional()?;

        record.map(record_to_document).transpose()
    }

    /// List documents, newest uploads first.
    pub async fn list(
        &self,
        status: Option<ProcessingStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Document>, DieselError> {
        let mut conn = self.pool.get().await?;

        let mut query = documents::table
            .order(documents::created_at.desc())
            .limit(limit)
            .offset(offset)
            .into_boxed();

        if let Some(status) = status {
            query = query.filter(documents::status.eq(status.as_str()));
        }

        let records: Vec<DocumentRecord> = query.load(&mut conn).await?;
        records.into_iter().map(record_to_document).collect()
    }

    /// Count documents, optionally restricted to one status.
    pub async fn count(&self, status: Option<ProcessingStatus>) -> Result<u64, DieselError> {
        let mut conn = self.pool.get().await?;

        use diesel::dsl::count_star;
        let mut query = documents::table.select(count_star()).into_boxed();

        if let Some(status) = status {
            query = query.filter(documents::status.eq(status.as_str()));
        }

        let count: i64 = query.first(&mut conn).await?;
        Ok(count as u64)
    }

    /// Count documents grouped by status.
    pub async fn count_by_status(&self) -> Result<HashMap<String, u64>, DieselError> {
        let mut conn = self.pool.get().await?;

        let rows: Vec<StatusCount> =
            diesel::sql_query("SELECT status, COUNT(*) as count FROM documents GROUP BY status")
                .load(&mut conn)
                .await?;

        let mut counts = HashMap::new();
        for StatusCount { status, count } in rows {
            counts.insert(status, count as u64);
        }
        Ok(counts)
    }

    /// Delete a document and its stage results.
    ///
    /// Ledger entries are left in place: the audit trail outlives the
    /// document it describes.
    pub async fn delete(&self, id: &str) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;

        conn.transaction(|conn| {
            Box::pin(async move {
                diesel::delete(basic_infos::table.filter(basic_infos::document_id.eq(id)))
                    .execute(conn)
                    .await?;

                diesel::delete(
                    clause_analyses::table.filter(clause_analyses::document_id.eq(id)),
                )
                .execute(conn)
                .await?;

                diesel::delete(service_infos::table.filter(service_infos::document_id.eq(id)))
                    .execute(conn)
                    .await?;

                let rows = diesel::delete(documents::table.find(id))
                    .execute(conn)
                    .await?;

                Ok(rows > 0)
            })
        })
        .await
    }

    // ========================================================================
    // State Machine Transitions
    // ========================================================================

    /// Advance a document from `from` to its successor status.
    ///
    /// The update is guarded on the observed status, so a writer working
    /// from a stale snapshot cannot clobber a transition that already
    /// happened. Returns false when the guard misses or `from` is terminal.
    pub async fn advance(&self, id: &str, from: ProcessingStatus) -> Result<bool, DieselError> {
        let next = match from.successor() {
            Some(next) => next,
            None => return Ok(false),
        };
        let mut conn = self.pool.get().await?;

        let updated_at = Utc::now().to_rfc3339();
        let rows = diesel::update(
            documents::table
                .filter(documents::id.eq(id))
                .filter(documents::status.eq(from.as_str())),
        )
        .set((
            documents::status.eq(next.as_str()),
            documents::updated_at.eq(&updated_at),
        ))
        .execute(&mut conn)
        .await?;

        Ok(rows > 0)
    }

    /// Mark a document as failed with a human-readable reason.
    ///
    /// Applies from any in-flight status; a document that already reached
    /// a terminal status is left untouched and false is returned.
    pub async fn mark_failed(&self, id: &str, reason: &str) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;

        let in_flight: Vec<&str> = ProcessingStatus::IN_FLIGHT
            .iter()
            .map(|status| status.as_str())
            .collect();
        let updated_at = Utc::now().to_rfc3339();
        let rows = diesel::update(
            documents::table
                .filter(documents::id.eq(id))
                .filter(documents::status.eq_any(in_flight)),
        )
        .set((
            documents::status.eq(ProcessingStatus::Error.as_str()),
            documents::processing_error.eq(reason),
            documents::updated_at.eq(&updated_at),
        ))
        .execute(&mut conn)
        .await?;

        Ok(rows > 0)
    }

    /// Reset a document to `PENDING` and clear its recorded failure.
    ///
    /// Guarded on the status the caller observed, so a document that moved
    /// on since the observation is not pulled back. Returns false when the
    /// guard misses.
    pub async fn reset_from(
        &self,
        id: &str,
        expected: ProcessingStatus,
    ) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;

        let updated_at = Utc::now().to_rfc3339();
        let rows = diesel::update(
            documents::table
                .filter(documents::id.eq(id))
                .filter(documents::status.eq(expected.as_str())),
        )
        .set((
            documents::status.eq(ProcessingStatus::Pending.as_str()),
            documents::processing_error.eq(None::<&str>),
            documents::updated_at.eq(&updated_at),
        ))
        .execute(&mut conn)
        .await?;

        Ok(rows > 0)
    }

    // ========================================================================
    // Recovery Queries
    // ========================================================================

    /// List all in-flight documents, most recently touched first.
    pub async fn list_in_flight(&self) -> Result<Vec<Document>, DieselError> {
        let mut conn = self.pool.get().await?;

        let in_flight: Vec<&str> = ProcessingStatus::IN_FLIGHT
            .iter()
            .map(|status| status.as_str())
            .collect();
        let records: Vec<DocumentRecord> = documents::table
            .filter(documents::status.eq_any(in_flight))
            .order(documents::updated_at.desc())
            .load(&mut conn)
            .await?;

        records.into_iter().map(record_to_document).collect()
    }

    /// Find in-flight documents whose updated-at is older than `cutoff`,
    /// oldest created first, capped at `limit`.
    pub async fn find_stale(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Document>, DieselError> {
        let mut conn = self.pool.get().await?;

        // RFC3339 strings in UTC compare lexicographically in time order.
        let cutoff = cutoff.to_rfc3339();
        let in_flight: Vec<&str> = ProcessingStatus::IN_FLIGHT
            .iter()
            .map(|status| status.as_str())
            .collect();
        let records: Vec<DocumentRecord> = documents::table
            .filter(documents::status.eq_any(in_flight))
            .filter(documents::updated_at.lt(&cutoff))
            .order(documents::created_at.asc())
            .limit(limit)
            .load(&mut conn)
            .await?;

        records.into_iter().map(record_to_document).collect()
    }

    // ========================================================================
    // Stage Results
    // ========================================================================

    /// Persist a stage result and advance the document status, atomically.
    ///
    /// The result row is upserted (re-running a stage overwrites rather than
    /// duplicates) and the status advance is guarded on `expected`. When the
    /// guard misses the whole transaction is rolled back, so a lost status
    /// race never leaves an orphaned result behind. Returns false in that
    /// case.
    pub async fn save_stage_output(
        &self,
        document_id: &str,
        output: &StageOutput,
        expected: ProcessingStatus,
    ) -> Result<bool, DieselError> {
        let next = match expected.successor() {
            Some(next) => next,
            None => return Ok(false),
        };
        let mut conn = self.pool.get().await?;

        let now = Utc::now().to_rfc3339();
        let row_id = Uuid::new_v4().to_string();

        let result = conn
            .transaction(|conn| {
                Box::pin(async move {
                    match output {
                        StageOutput::BasicInfo(info) => {
                            upsert_basic_info(conn, document_id, info, &row_id, &now).await?;
                        }
                        StageOutput::Analysis {
                            result,
                            standard_clauses,
                        } => {
                            let result_json =
                                serde_json::to_string(result).map_err(serialize_error)?;
                            let clauses_json = if standard_clauses.is_empty() {
                                None
                            } else {
                                Some(
                                    serde_json::to_string(standard_clauses)
                                        .map_err(serialize_error)?,
                                )
                            };
                            upsert_analysis(
                                conn,
                                document_id,
                                &result_json,
                                clauses_json.as_deref(),
                                &row_id,
                                &now,
                            )
                            .await?;
                        }
                        StageOutput::ServiceInfo(info) => {
                            let devices =
                                serde_json::to_string(&info.devices).map_err(serialize_error)?;
                            let maintenance = serde_json::to_string(&info.maintenance)
                                .map_err(serialize_error)?;
                            let trainings =
                                serde_json::to_string(&info.trainings).map_err(serialize_error)?;
                            upsert_service_info(
                                conn,
                                document_id,
                                &devices,
                                &maintenance,
                                &trainings,
                                &row_id,
                                &now,
                            )
                            .await?;
                        }
                    }

                    let advanced = diesel::update(
                        documents::table
                            .filter(documents::id.eq(document_id))
                            .filter(documents::status.eq(expected.as_str())),
                    )
                    .set((
                        documents::status.eq(next.as_str()),
                        documents::updated_at.eq(&now),
                    ))
                    .execute(conn)
                    .await?;

                    if advanced == 0 {
                        // Lost the status race; discard the stage write.
                        return Err(DieselError::RollbackTransaction);
                    }
                    Ok(())
                })
            })
            .await;

        match result {
            Ok(()) => Ok(true),
            Err(DieselError::RollbackTransaction) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Get the basic info extracted for a document.
    pub async fn get_basic_info(
        &self,
        document_id: &str,
    ) -> Result<Option<BasicInfo>, DieselError> {
        let mut conn = self.pool.get().await?;

        let record: Option<BasicInfoRecord> = basic_infos::table
            .filter(basic_infos::document_id.eq(document_id))
            .first(&mut conn)
            .await
            .optional()?;

        Ok(record.map(|record| BasicInfo {
            contract_number: record.contract_number,
            contract_name: record.contract_name,
            party_a: record.party_a,
            party_b: record.party_b,
            contract_start_date: record.contract_start_date,
            contract_end_date: record.contract_end_date,
            contract_total_amount: record.contract_total_amount,
            contract_payment_method: record.contract_payment_method,
            contract_currency: record.contract_currency,
        }))
    }

    /// Get the clause analysis stored for a document, along with the
    /// standard clause set it was checked against.
    pub async fn get_analysis(
        &self,
        document_id: &str,
    ) -> Result<Option<(ClauseAnalysis, Vec<StandardClause>)>, DieselError> {
        let mut conn = self.pool.get().await?;

        let record: Option<ClauseAnalysisRecord> = clause_analyses::table
            .filter(clause_analyses::document_id.eq(document_id))
            .first(&mut conn)
            .await
            .optional()?;

        match record {
            Some(record) => {
                let result: ClauseAnalysis =
                    serde_json::from_str(&record.result).map_err(deserialize_error)?;
                let standard_clauses = match record.standard_clauses.as_deref() {
                    Some(raw) => serde_json::from_str(raw).map_err(deserialize_error)?,
                    None => Vec::new(),
                };
                Ok(Some((result, standard_clauses)))
            }
            None => Ok(None),
        }
    }

    /// Check whether a clause analysis exists for a document.
    pub async fn has_analysis(&self, document_id: &str) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;

        use diesel::dsl::count_star;
        let count: i64 = clause_analyses::table
            .filter(clause_analyses::document_id.eq(document_id))
            .select(count_star())
            .first(&mut conn)
            .await?;

        Ok(count > 0)
    }

    /// Get the service info snapshot stored for a document.
    pub async fn get_service_info(
        &self,
        document_id: &str,
    ) -> Result<Option<ServiceInfo>, DieselError> {
        let mut conn = self.pool.get().await?;

        let record: Option<ServiceInfoRecord> = service_infos::table
            .filter(service_infos::document_id.eq(document_id))
            .first(&mut conn)
            .await
            .optional()?;

        match record {
            Some(record) => {
                let devices = serde_json::from_str(&record.devices).map_err(deserialize_error)?;
                let maintenance =
                    serde_json::from_str(&record.maintenance).map_err(deserialize_error)?;
                let trainings =
                    serde_json::from_str(&record.trainings).map_err(deserialize_error)?;
                Ok(Some(ServiceInfo {
                    devices,
                    maintenance,
                    trainings,
                }))
            }
            None => Ok(None),
        }
    }
}

async fn upsert_basic_info(
    conn: &mut super::pool::AsyncSqliteConnection,
    document_id: &str,
    info: &BasicInfo,
    row_id: &str,
    now: &str,
) -> Result<(), DieselError> {
    let rows = diesel::update(basic_infos::table.filter(basic_infos::document_id.eq(document_id)))
        .set((
            basic_infos::contract_number.eq(info.contract_number.as_deref()),
            basic_infos::contract_name.eq(info.contract_name.as_deref()),
            basic_infos::party_a.eq(info.party_a.as_deref()),
            basic_infos::party_b.eq(info.party_b.as_deref()),
            basic_infos::contract_start_date.eq(info.contract_start_date.as_deref()),
            basic_infos::contract_end_date.eq(info.contract_end_date.as_deref()),
            basic_infos::contract_total_amount.eq(info.contract_total_amount),
            basic_infos::contract_payment_method.eq(info.contract_payment_method.as_deref()),
            basic_infos::contract_currency.eq(info.contract_currency.as_deref()),
            basic_infos::updated_at.eq(now),
        ))
        .execute(conn)
        .await?;

    if rows == 0 {
        let record = NewBasicInfoRecord {
            id: row_id,
            document_id,
            contract_number: info.contract_number.as_deref(),
            contract_name: info.contract_name.as_deref(),
            party_a: info.party_a.as_deref(),
            party_b: info.party_b.as_deref(),
            contract_start_date: info.contract_start_date.as_deref(),
            contract_end_date: info.contract_end_date.as_deref(),
            contract_total_amount: info.contract_total_amount,
            contract_payment_method: info.contract_payment_method.as_deref(),
            contract_currency: info.contract_currency.as_deref(),
            created_at: now,
            updated_at: now,
        };
        diesel::insert_into(basic_infos::table)
            .values(&record)
            .execute(conn)
            .await?;
    }
    Ok(())
}

async fn upsert_analysis(
    conn: &mut super::pool::AsyncSqliteConnection,
    document_id: &str,
    result_json: &str,
    clauses_json: Option<&str>,
    row_id: &str,
    now: &str,
) -> Result<(), DieselError> {
    let rows = diesel::update(
        clause_analyses::table.filter(clause_analyses::document_id.eq(document_id)),
    )
    .set((
        clause_analyses::result.eq(result_json),
        clause_analyses::standard_clauses.eq(clauses_json),
        clause_analyses::updated_at.eq(now),
    ))
    .execute(conn)
    .await?;

    if rows == 0 {
        let record = NewClauseAnalysisRecord {
            id: row_id,
            document_id,
            result: result_json,
            standard_clauses: clauses_json,
            created_at: now,
            updated_at: now,
        };
        diesel::insert_into(clause_analyses::table)
            .values(&record)
            .execute(conn)
            .await?;
    }
    Ok(())
}

async fn upsert_service_info(
    conn: &mut super::pool::AsyncSqliteConnection,
    document_id: &str,
    devices: &str,
    maintenance: &str,
    trainings: &str,
    row_id: &str,
    now: &str,
) -> Result<(), DieselError> {
    let rows =
        diesel::update(service_infos::table.filter(service_infos::document_id.eq(document_id)))
            .set((
                service_infos::devices.eq(devices),
                service_infos::maintenance.eq(maintenance),
                service_infos::trainings.eq(trainings),
                service_infos::updated_at.eq(now),
            ))
            .execute(conn)
            .await?;

    if rows == 0 {
        let record = NewServiceInfoRecord {
            id: row_id,
            document_id,
            devices,
            maintenance,
            trainings,
            created_at: now,
            updated_at: now,
        };
        diesel::insert_into(service_infos::table)
            .values(&record)
            .execute(conn)
            .await?;
    }
    Ok(())
}

fn record_to_document(record: DocumentRecord) -> Result<Document, DieselError> {
    let status = ProcessingStatus::from_str(&record.status).ok_or_else(|| {
        deserialize_error(format!("unknown document status {:?}", record.status))
    })?;

    Ok(Document {
        id: record.id,
        fingerprint: record.fingerprint,
        file_name: record.file_name,
        media_type: record.media_type,
        file_size: record.file_size,
        text_content: record.text_content,
        status,
        processing_error: record.processing_error,
        created_at: parse_datetime(&record.created_at),
        updated_at: parse_datetime(&record.updated_at),
    })
}

// Helper structs for SQL queries
#[derive(diesel::QueryableByName)]
struct StatusCount {
    #[diesel(sql_type = diesel::sql_types::Text)]
    status: String,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    count: i64,
}
