//! Database migrations using cetane.
//!
//! Runs migrations via blocking tasks to work with async connections.

use cetane::migrator::MigrationStateStore;
use tracing::info;

use super::pool::DieselError;

fn migration_error(msg: impl std::fmt::Display) -> DieselError {
    DieselError::QueryBuilderError(msg.to_string().into())
}

/// Run pending migrations for a database URL.
pub async fn run_migrations(database_url: &str) -> Result<(), DieselError> {
    use cetane::backend::Sqlite;
    use cetane::migrator::Migrator;

    let url = database_url
        .strip_prefix("sqlite:")
        .unwrap_or(database_url)
        .to_string();

    tokio::task::spawn_blocking(move || {
        let conn = rusqlite::Connection::open(&url).map_err(migration_error)?;
        let backend = Sqlite;
        let registry = crate::migrations::registry();

        let mut state = SqliteState::new(&conn)?;

        // One-time transition: databases created by `init` predate the
        // migration chain. When cetane has no entries yet but the schema
        // is already present, mark the chain as applied instead of
        // re-running it.
        let already_applied = state.applied_migrations().map_err(migration_error)?;
        if already_applied.is_empty() && has_initialized_schema(&conn)? {
            mark_existing_as_applied(&registry, &mut state)?;
        }

        let mut migrator = Migrator::new(&registry, &backend, state);
        let applied = migrator
            .migrate_forward(|sql| conn.execute_batch(sql).map_err(|e| e.to_string()))
            .map_err(migration_error)?;

        for name in &applied {
            info!("Applied migration: {}", name);
        }

        if applied.is_empty() {
            info!("No pending migrations");
        }

        Ok(())
    })
    .await
    .map_err(|e| DieselError::QueryBuilderError(Box::new(e)))?
}

/// Check whether the schema was already created outside the migration chain.
fn has_initialized_schema(conn: &rusqlite::Connection) -> Result<bool, DieselError> {
    let exists: bool = conn
        .query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='documents'",
            [],
            |row| row.get(0),
        )
        .map_err(migration_error)?;

    Ok(exists)
}

/// Mark all migrations as applied for an existing database.
fn mark_existing_as_applied<S: MigrationStateStore>(
    registry: &cetane::migration::MigrationRegistry,
    state: &mut S,
) -> Result<(), DieselError> {
    let order = registry.resolve_order().map_err(migration_error)?;
    let applied = state.applied_migrations().map_err(migration_error)?;

    for name in order {
        if !applied.contains(&name.to_string()) {
            info!("Marking existing migration as applied: {}", name);
            state.mark_applied(name).map_err(migration_error)?;
        }
    }

    Ok(())
}

// -- SQLite state store --

struct SqliteState<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> SqliteState<'a> {
    fn new(conn: &'a rusqlite::Connection) -> Result<Self, DieselError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS __cetane_migrations (
                name TEXT PRIMARY KEY NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .map_err(migration_error)?;

        Ok(Self { conn })
    }
}

impl cetane::migrator::MigrationStateStore for SqliteState<'_> {
    fn applied_migrations(&mut self) -> Result<Vec<String>, String> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM __cetane_migrations ORDER BY name")
            .map_err(|e| e.to_string())?;

        let names = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| e.to_string())?
            .collect::<Result<Vec<String>, _>>()
            .map_err(|e| e.to_string())?;

        Ok(names)
    }

    fn mark_applied(&mut self, name: &str) -> Result<(), String> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO __cetane_migrations (name) VALUES (?1)",
                [name],
            )
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    fn mark_unapplied(&mut self, name: &str) -> Result<(), String> {
        self.conn
            .execute("DELETE FROM __cetane_migrations WHERE name = ?1", [name])
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_run_migrations_fresh_database() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("fresh.db");

        run_migrations(&db_path.display().to_string()).await.unwrap();

        let conn = rusqlite::Connection::open(&db_path).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN \
                 ('documents', 'basic_infos', 'clause_analyses', 'service_infos', 'processing_logs')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 5);

        // Running again is a no-op.
        run_migrations(&db_path.display().to_string()).await.unwrap();
    }

    #[tokio::test]
    async fn test_run_migrations_adopts_init_schema_database() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("adopted.db");

        {
            let conn = rusqlite::Connection::open(&db_path).unwrap();
            conn.execute_batch(include_str!("schema.sql")).unwrap();
        }

        // The chain must not re-run CREATE TABLE against the existing schema.
        run_migrations(&db_path.display().to_string()).await.unwrap();

        let conn = rusqlite::Connection::open(&db_path).unwrap();
        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM __cetane_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(applied, 2);
    }
}
