//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM with compile-time query checking,
//! backed by SQLite through diesel-async's SyncConnectionWrapper.

pub mod context;
pub mod documents;
pub mod logs;
pub mod migrations;
pub mod pool;
pub mod records;

pub use context::DbContext;
pub use documents::DocumentRepository;
pub use logs::LogRepository;
pub use pool::{AsyncSqliteConnection, AsyncSqlitePool, DieselError};

use chrono::{DateTime, Utc};

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Wrap a JSON encoding failure as a diesel serialization error.
pub(crate) fn serialize_error(e: serde_json::Error) -> DieselError {
    DieselError::SerializationError(Box::new(e))
}

/// Wrap a JSON or enum decoding failure as a diesel deserialization error.
pub(crate) fn deserialize_error(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> DieselError {
    DieselError::DeserializationError(e.into())
}
