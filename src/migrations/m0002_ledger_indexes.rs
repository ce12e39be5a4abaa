use cetane::prelude::*;

pub fn migration() -> Migration {
    Migration::new("0002_ledger_indexes")
        .depends_on(&["0001_initial_schema"])
        .operation(AddIndex::new(
            "processing_logs",
            Index::new("idx_processing_logs_document").column("document_id"),
        ))
        .operation(AddIndex::new(
            "processing_logs",
            Index::new("idx_processing_logs_created").column("created_at"),
        ))
}
