//! Diesel-based repository for the append-only processing ledger.
//!
//! Entries are written once and never updated or deleted. `record` is the
//! fire-and-forget surface the pipeline uses: a failed write is logged and
//! swallowed so a lost audit entry cannot fail the operation it describes.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::warn;
use uuid::Uuid;

use super::pool::{AsyncSqlitePool, DieselError};
use super::records::{NewProcessingLogRecord, ProcessingLogRecord};
use super::{deserialize_error, parse_datetime};
use crate::models::{LogPage, LogQuery, LogStatus, NewLogEntry, ProcessingLogEntry};
use crate::schema::processing_logs;

/// Diesel-based ledger repository.
#[derive(Clone)]
pub struct LogRepository {
    pool: AsyncSqlitePool,
}

impl LogRepository {
    /// Create a new ledger repository.
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Append one entry to the ledger.
    pub async fn append(&self, entry: &NewLogEntry) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now().to_rfc3339();
        let metadata = entry.metadata_string();
        let record = NewProcessingLogRecord {
            id: &id,
            document_id: entry.document_id.as_deref(),
            action: &entry.action,
            description: entry.description.as_deref(),
            source: entry.source.as_deref(),
            status: entry.status.as_str(),
            duration_ms: entry.duration_ms,
            metadata: metadata.as_deref(),
            created_at: &created_at,
        };

        diesel::insert_into(processing_logs::table)
            .values(&record)
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Append an entry, swallowing any persistence failure.
    pub async fn record(&self, entry: NewLogEntry) {
        if let Err(e) = self.append(&entry).await {
            warn!(action = %entry.action, error = %e, "failed to append ledger entry");
        }
    }

    /// Query the ledger, newest entries first, with a total count for
    /// pagination.
    pub async fn query(&self, query: &LogQuery) -> Result<LogPage, DieselError> {
        let mut conn = self.pool.get().await?;
        let query = query.clone().clamped();

        let mut entries_query = processing_logs::table
            .order(processing_logs::created_at.desc())
            .limit(query.limit)
            .offset(query.offset)
            .into_boxed();

        use diesel::dsl::count_star;
        let mut count_query = processing_logs::table.select(count_star()).into_boxed();

        if let Some(document_id) = &query.document_id {
            entries_query =
                entries_query.filter(processing_logs::document_id.eq(document_id.clone()));
            count_query = count_query.filter(processing_logs::document_id.eq(document_id.clone()));
        }
        if let Some(action) = &query.action {
            entries_query = entries_query.filter(processing_logs::action.eq(action.clone()));
            count_query = count_query.filter(processing_logs::action.eq(action.clone()));
        }
        if let Some(source) = &query.source {
            entries_query = entries_query.filter(processing_logs::source.eq(source.clone()));
            count_query = count_query.filter(processing_logs::source.eq(source.clone()));
        }
        if let Some(status) = query.status {
            entries_query = entries_query.filter(processing_logs::status.eq(status.as_str()));
            count_query = count_query.filter(processing_logs::status.eq(status.as_str()));
        }
        if let Some(search) = &query.search {
            let pattern = format!("%{}%", search);
            entries_query = entries_query.filter(
                processing_logs::description
                    .like(pattern.clone())
                    .or(processing_logs::metadata.like(pattern.clone()))
                    .or(processing_logs::action.like(pattern.clone()))
                    .or(processing_logs::source.like(pattern.clone())),
            );
            count_query = count_query.filter(
                processing_logs::description
                    .like(pattern.clone())
                    .or(processing_logs::metadata.like(pattern.clone()))
                    .or(processing_logs::action.like(pattern.clone()))
                    .or(processing_logs::source.like(pattern)),
            );
        }

        let total: i64 = count_query.first(&mut conn).await?;
        let records: Vec<ProcessingLogRecord> = entries_query.load(&mut conn).await?;
        let entries = records
            .into_iter()
            .map(record_to_entry)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LogPage {
            entries,
            total,
            limit: query.limit,
            offset: query.offset,
        })
    }
}

fn record_to_entry(record: ProcessingLogRecord) -> Result<ProcessingLogEntry, DieselError> {
    let status = LogStatus::from_str(&record.status)
        .ok_or_else(|| deserialize_error(format!("unknown log status {:?}", record.status)))?;
    let metadata = record
        .metadata
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        // Metadata may have been truncated at the size cap; keep it readable
        // instead of failing the whole query.
        .unwrap_or_else(|_| record.metadata.clone().map(serde_json::Value::String));

    Ok(ProcessingLogEntry {
        id: record.id,
        document_id: record.document_id,
        action: record.action,
        description: record.description,
        source: record.source,
        status,
        duration_ms: record.duration_ms,
        metadata,
        created_at: parse_datetime(&record.created_at),
    })
}
