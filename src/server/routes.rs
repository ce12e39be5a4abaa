//! Router configuration for the API server.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Upload and listing
        .route(
            "/api/documents",
            post(handlers::upload_document).get(handlers::list_documents),
        )
        .route(
            "/api/documents/check-duplicate",
            post(handlers::check_duplicate),
        )
        .route("/api/documents/in-flight", get(handlers::list_in_flight))
        .route("/api/documents/recover", post(handlers::recover_documents))
        // Single-document operations
        .route(
            "/api/documents/:doc_id",
            get(handlers::document_detail).delete(handlers::delete_document),
        )
        .route(
            "/api/documents/:doc_id/process",
            post(handlers::process_document),
        )
        // Ledger
        .route("/api/logs", get(handlers::list_logs))
        // Health
        .route("/api/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
