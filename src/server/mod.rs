//! HTTP API server for the contract processing pipeline.
//!
//! Exposes upload, duplicate preflight, document browsing, pipeline
//! triggering, recovery, and ledger queries as a JSON API.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::repository::{DbContext, DocumentRepository, LogRepository};
use crate::services::{
    Extractor, HttpExtractor, IngestService, LedgerObserver, PipelineService, ProcessingObserver,
    RecoveryService,
};

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub documents: DocumentRepository,
    pub logs: LogRepository,
    pub ingest: IngestService,
    pub pipeline: PipelineService,
    pub recovery: RecoveryService,
}

impl AppState {
    pub fn new(settings: &Settings) -> Self {
        let ctx = settings.create_db_context();
        let timeout = Duration::from_secs(settings.request_timeout);
        let extractor: Arc<dyn Extractor> =
            Arc::new(HttpExtractor::new(&settings.extractor_url, timeout));
        Self::from_parts(&ctx, extractor, timeout)
    }

    /// Build the state from an existing context and extractor.
    ///
    /// Tests use this to substitute a scripted extractor.
    pub fn from_parts(
        ctx: &DbContext,
        extractor: Arc<dyn Extractor>,
        stage_timeout: Duration,
    ) -> Self {
        let observer: Arc<dyn ProcessingObserver> = Arc::new(LedgerObserver::new(ctx.logs()));
        let pipeline = PipelineService::new(
            ctx.documents(),
            extractor.clone(),
            observer.clone(),
            stage_timeout,
        );
        let ingest = IngestService::new(
            ctx.documents(),
            ctx.content_store(),
            extractor,
            observer.clone(),
        );
        let recovery = RecoveryService::new(ctx.documents(), pipeline.clone(), observer);

        Self {
            documents: ctx.documents(),
            logs: ctx.logs(),
            ingest,
            pipeline,
            recovery,
        }
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(settings);
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
