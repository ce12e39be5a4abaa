use cetane::prelude::*;

pub fn migration() -> Migration {
    Migration::new("0001_initial_schema")
        // documents - raw SQL for the inline UNIQUE fingerprint constraint
        .operation(RunSql::portable().for_backend(
            "sqlite",
            r#"CREATE TABLE documents (
    id TEXT PRIMARY KEY,
    fingerprint TEXT NOT NULL UNIQUE,
    file_name TEXT NOT NULL,
    media_type TEXT NOT NULL,
    file_size INTEGER NOT NULL,
    text_content TEXT,
    status TEXT NOT NULL DEFAULT 'PENDING',
    processing_error TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)"#,
        ))
        // Stage output tables - raw SQL for the one-row-per-document UNIQUE
        .operation(RunSql::portable().for_backend(
            "sqlite",
            r#"CREATE TABLE basic_infos (
    id TEXT PRIMARY KEY,
    document_id TEXT NOT NULL UNIQUE,
    contract_number TEXT,
    contract_name TEXT,
    party_a TEXT,
    party_b TEXT,
    contract_start_date TEXT,
    contract_end_date TEXT,
    contract_total_amount DOUBLE,
    contract_payment_method TEXT,
    contract_currency TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (document_id) REFERENCES documents(id)
)"#,
        ))
        .operation(RunSql::portable().for_backend(
            "sqlite",
            r#"CREATE TABLE clause_analyses (
    id TEXT PRIMARY KEY,
    document_id TEXT NOT NULL UNIQUE,
    result TEXT NOT NULL,
    standard_clauses TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (document_id) REFERENCES documents(id)
)"#,
        ))
        .operation(RunSql::portable().for_backend(
            "sqlite",
            r#"CREATE TABLE service_infos (
    id TEXT PRIMARY KEY,
    document_id TEXT NOT NULL UNIQUE,
    devices TEXT NOT NULL,
    maintenance TEXT NOT NULL,
    trainings TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (document_id) REFERENCES documents(id)
)"#,
        ))
        // processing_logs - document_id is a soft reference: entries may
        // precede document creation and must survive document deletion
        .operation(
            CreateTable::new("processing_logs")
                .add_field(Field::new("id", FieldType::Text).primary_key())
                .add_field(Field::new("document_id", FieldType::Text))
                .add_field(Field::new("action", FieldType::Text).not_null())
                .add_field(Field::new("description", FieldType::Text))
                .add_field(Field::new("source", FieldType::Text))
                .add_field(Field::new("status", FieldType::Text).not_null())
                .add_field(Field::new("duration_ms", FieldType::Integer))
                .add_field(Field::new("metadata", FieldType::Text))
                .add_field(Field::new("created_at", FieldType::Text).not_null()),
        )
        .operation(AddIndex::new(
            "documents",
            Index::new("idx_documents_status_updated")
                .column("status")
                .column("updated_at"),
        ))
}
