//! Database context for managing connections and repository access.
//!
//! The DbContext is the primary entry point for all persistence: it holds
//! the connection pool, knows where document binaries live on disk, and
//! hands out repositories.

use std::path::{Path, PathBuf};

use diesel_async::SimpleAsyncConnection;

use super::documents::DocumentRepository;
use super::logs::LogRepository;
use super::pool::{AsyncSqlitePool, DieselError};
use crate::storage::ContentStore;

/// Database context that manages the connection pool and provides
/// repository access.
///
/// # Example
/// ```ignore
/// let ctx = DbContext::new(&db_path, &documents_dir);
/// ctx.init_schema().await?;
/// let doc = ctx.documents().get("some-id").await?;
/// ```
#[derive(Clone)]
pub struct DbContext {
    pool: AsyncSqlitePool,
    documents_dir: PathBuf,
}

impl DbContext {
    /// Create a context from a database file path.
    pub fn new(db_path: &Path, documents_dir: &Path) -> Self {
        Self {
            pool: AsyncSqlitePool::from_path(db_path, 5),
            documents_dir: documents_dir.to_path_buf(),
        }
    }

    /// Create a context from a database URL (`sqlite:` prefix or plain path).
    pub fn from_url(url: &str, documents_dir: &Path) -> Self {
        Self {
            pool: AsyncSqlitePool::new(url, 5),
            documents_dir: documents_dir.to_path_buf(),
        }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &AsyncSqlitePool {
        &self.pool
    }

    /// Directory where uploaded binaries are stored.
    pub fn documents_dir(&self) -> &Path {
        &self.documents_dir
    }

    /// Get a document repository.
    pub fn documents(&self) -> DocumentRepository {
        DocumentRepository::new(self.pool.clone())
    }

    /// Get a ledger repository.
    pub fn logs(&self) -> LogRepository {
        LogRepository::new(self.pool.clone())
    }

    /// Get the content-addressed store for uploaded binaries.
    pub fn content_store(&self) -> ContentStore {
        ContentStore::new(&self.documents_dir)
    }

    /// Initialize the database schema.
    pub async fn init_schema(&self) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;
        conn.batch_execute(include_str!("schema.sql")).await
    }

    /// Get the list of all tables in the database.
    pub async fn list_tables(&self) -> Result<Vec<String>, DieselError> {
        let mut conn = self.pool.get().await?;

        let rows: Vec<TableName> = diesel_async::RunQueryDsl::load(
            diesel::sql_query(
                "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            ),
            &mut conn,
        )
        .await?;
        Ok(rows.into_iter().map(|r| r.name).collect())
    }
}

#[derive(diesel::QueryableByName)]
struct TableName {
    #[diesel(sql_type = diesel::sql_types::Text)]
    name: String,
}
