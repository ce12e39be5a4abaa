//! Append-only ledger of processing attempts.
//!
//! One entry per stage-attempt (plus ingest-time actions). Entries are
//! write-once facts: nothing updates or deletes them, and failing to write
//! one never fails the operation it describes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest metadata string the ledger will store; longer payloads are
/// truncated, never rejected.
pub const METADATA_MAX_CHARS: usize = 65535;

/// Ledger actions recorded outside the pipeline stages.
///
/// Stage attempts use [`crate::models::Stage::action`] instead.
pub mod actions {
    pub const CONVERSION: &str = "CONVERSION";
    pub const UPLOAD: &str = "UPLOAD";
    pub const RECOVERY: &str = "RECOVERY";
}

/// Origin tags for ledger entries.
pub mod sources {
    pub const USER: &str = "USER";
    pub const BACKGROUND: &str = "BACKGROUND";
    pub const RECOVERY: &str = "RECOVERY";
}

/// Default page size for ledger queries.
pub const DEFAULT_QUERY_LIMIT: i64 = 50;

/// Hard ceiling on ledger query page size.
pub const MAX_QUERY_LIMIT: i64 = 200;

/// Outcome of one logged attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogStatus {
    Success,
    Error,
    Skipped,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
            Self::Skipped => "SKIPPED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "SUCCESS" => Some(Self::Success),
            "ERROR" => Some(Self::Error),
            "SKIPPED" => Some(Self::Skipped),
            _ => None,
        }
    }
}

/// A stored ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingLogEntry {
    pub id: String,
    /// Nullable: conversion attempts at ingest time happen before a
    /// document row exists.
    pub document_id: Option<String>,
    /// Categorical tag, e.g. `CONVERSION` or `CONTRACT_ANALYSIS`.
    pub action: String,
    pub description: Option<String>,
    /// Origin of the attempt, e.g. `USER`, `BACKGROUND`, `RECOVERY`.
    pub source: Option<String>,
    pub status: LogStatus,
    pub duration_ms: Option<i64>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// A ledger entry waiting to be appended.
#[derive(Debug, Clone)]
pub struct NewLogEntry {
    pub document_id: Option<String>,
    pub action: String,
    pub description: Option<String>,
    pub source: Option<String>,
    pub status: LogStatus,
    pub duration_ms: Option<i64>,
    pub metadata: Option<serde_json::Value>,
}

impl NewLogEntry {
    pub fn new(action: impl Into<String>, status: LogStatus) -> Self {
        Self {
            document_id: None,
            action: action.into(),
            description: None,
            source: None,
            status,
            duration_ms: None,
            metadata: None,
        }
    }

    pub fn document(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn duration_ms(mut self, duration_ms: i64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Serialize metadata for storage, enforcing the size cap.
    pub fn metadata_string(&self) -> Option<String> {
        self.metadata.as_ref().map(|value| {
            let serialized = value.to_string();
            if serialized.chars().count() > METADATA_MAX_CHARS {
                serialized.chars().take(METADATA_MAX_CHARS).collect()
            } else {
                serialized
            }
        })
    }
}

/// Filters and pagination for ledger queries.
#[derive(Debug, Clone)]
pub struct LogQuery {
    pub document_id: Option<String>,
    pub action: Option<String>,
    pub source: Option<String>,
    pub status: Option<LogStatus>,
    /// Substring match across description, metadata, action, and source.
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            document_id: None,
            action: None,
            source: None,
            status: None,
            search: None,
            limit: DEFAULT_QUERY_LIMIT,
            offset: 0,
        }
    }
}

impl LogQuery {
    /// Clamp limit and offset into their allowed ranges.
    pub fn clamped(mut self) -> Self {
        self.limit = self.limit.clamp(1, MAX_QUERY_LIMIT);
        self.offset = self.offset.max(0);
        self
    }
}

/// One page of ledger entries plus the total match count.
#[derive(Debug, Clone, Serialize)]
pub struct LogPage {
    pub entries: Vec<ProcessingLogEntry>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_status_roundtrip() {
        for status in [LogStatus::Success, LogStatus::Error, LogStatus::Skipped] {
            assert_eq!(LogStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(LogStatus::from_str("PARTIAL"), None);
    }

    #[test]
    fn test_metadata_is_capped() {
        let huge = "x".repeat(METADATA_MAX_CHARS * 2);
        let entry = NewLogEntry::new("CONVERSION", LogStatus::Error)
            .metadata(serde_json::json!({ "error": huge }));
        let stored = entry.metadata_string().unwrap();
        assert_eq!(stored.chars().count(), METADATA_MAX_CHARS);
    }

    #[test]
    fn test_small_metadata_kept_verbatim() {
        let entry = NewLogEntry::new("UPLOAD", LogStatus::Success)
            .metadata(serde_json::json!({ "size": 42 }));
        assert_eq!(entry.metadata_string().as_deref(), Some(r#"{"size":42}"#));
    }

    #[test]
    fn test_query_clamps_limit_and_offset() {
        let query = LogQuery {
            limit: 9999,
            offset: -5,
            ..Default::default()
        }
        .clamped();
        assert_eq!(query.limit, MAX_QUERY_LIMIT);
        assert_eq!(query.offset, 0);

        let query = LogQuery {
            limit: 0,
            ..Default::default()
        }
        .clamped();
        assert_eq!(query.limit, 1);
    }

    #[test]
    fn test_builder_collects_fields() {
        let entry = NewLogEntry::new("CONTRACT_ANALYSIS", LogStatus::Success)
            .document("doc-1")
            .source("BACKGROUND")
            .description("analysis finished")
            .duration_ms(1250);
        assert_eq!(entry.document_id.as_deref(), Some("doc-1"));
        assert_eq!(entry.duration_ms, Some(1250));
    }
}
