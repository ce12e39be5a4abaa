//! Diesel ORM records for database tables.
//!
//! These records provide compile-time type checking for database operations.
//! Timestamps are stored as RFC3339 strings and stage payloads as JSON text;
//! the repositories convert them to the typed models at the boundary.

use diesel::prelude::*;

use crate::schema;

/// Document record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::documents)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DocumentRecord {
    pub id: String,
    pub fingerprint: String,
    pub file_name: String,
    pub media_type: String,
    pub file_size: i64,
    pub text_content: Option<String>,
    pub status: String,
    pub processing_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// New document for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::documents)]
pub struct NewDocumentRecord<'a> {
    pub id: &'a str,
    pub fingerprint: &'a str,
    pub file_name: &'a str,
    pub media_type: &'a str,
    pub file_size: i64,
    pub text_content: Option<&'a str>,
    pub status: &'a str,
    pub processing_error: Option<&'a str>,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Basic info record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::basic_infos)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BasicInfoRecord {
    pub id: String,
    pub document_id: String,
    pub contract_number: Option<String>,
    pub contract_name: Option<String>,
    pub party_a: Option<String>,
    pub party_b: Option<String>,
    pub contract_start_date: Option<String>,
    pub contract_end_date: Option<String>,
    pub contract_total_amount: Option<f64>,
    pub contract_payment_method: Option<String>,
    pub contract_currency: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// New basic info row for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::basic_infos)]
pub struct NewBasicInfoRecord<'a> {
    pub id: &'a str,
    pub document_id: &'a str,
    pub contract_number: Option<&'a str>,
    pub contract_name: Option<&'a str>,
    pub party_a: Option<&'a str>,
    pub party_b: Option<&'a str>,
    pub contract_start_date: Option<&'a str>,
    pub contract_end_date: Option<&'a str>,
    pub contract_total_amount: Option<f64>,
    pub contract_payment_method: Option<&'a str>,
    pub contract_currency: Option<&'a str>,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Clause analysis record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::clause_analyses)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ClauseAnalysisRecord {
    pub id: String,
    pub document_id: String,
    pub result: String,
    pub standard_clauses: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// New clause analysis row for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::clause_analyses)]
pub struct NewClauseAnalysisRecord<'a> {
    pub id: &'a str,
    pub document_id: &'a str,
    pub result: &'a str,
    pub standard_clauses: Option<&'a str>,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Service info record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::service_infos)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ServiceInfoRecord {
    pub id: String,
    pub document_id: String,
    pub devices: String,
    pub maintenance: String,
    pub trainings: String,
    pub created_at: String,
    pub updated_at: String,
}

/// New service info row for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::service_infos)]
pub struct NewServiceInfoRecord<'a> {
    pub id: &'a str,
    pub document_id: &'a str,
    pub devices: &'a str,
    pub maintenance: &'a str,
    pub trainings: &'a str,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Processing log record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::processing_logs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ProcessingLogRecord {
    pub id: String,
    pub document_id: Option<String>,
    pub action: String,
    pub description: Option<String>,
    pub source: Option<String>,
    pub status: String,
    pub duration_ms: Option<i64>,
    pub metadata: Option<String>,
    pub created_at: String,
}

/// New processing log entry for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::processing_logs)]
pub struct NewProcessingLogRecord<'a> {
    pub id: &'a str,
    pub document_id: Option<&'a str>,
    pub action: &'a str,
    pub description: Option<&'a str>,
    pub source: Option<&'a str>,
    pub status: &'a str,
    pub duration_ms: Option<i64>,
    pub metadata: Option<&'a str>,
    pub created_at: &'a str,
}
