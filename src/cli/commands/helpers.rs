//! Shared helper functions for CLI commands.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::repository::DbContext;
use crate::services::{
    HttpExtractor, IngestService, LedgerObserver, PipelineService, RecoveryService,
};

/// Open the database, creating directories and schema as needed.
pub async fn open_context(settings: &Settings) -> anyhow::Result<DbContext> {
    settings.ensure_directories()?;
    let ctx = settings.create_db_context();
    ctx.init_schema().await?;
    Ok(ctx)
}

/// The full service stack shared by the processing commands.
pub struct ServiceStack {
    pub ingest: IngestService,
    pub pipeline: PipelineService,
    pub recovery: RecoveryService,
}

/// Wire up services against one database context.
pub fn build_services(settings: &Settings, ctx: &DbContext) -> ServiceStack {
    let timeout = Duration::from_secs(settings.request_timeout);
    let extractor = Arc::new(HttpExtractor::new(&settings.extractor_url, timeout));
    let observer = Arc::new(LedgerObserver::new(ctx.logs()));

    let pipeline = PipelineService::new(
        ctx.documents(),
        extractor.clone(),
        observer.clone(),
        timeout,
    );
    let ingest = IngestService::new(
        ctx.documents(),
        ctx.content_store(),
        extractor,
        observer.clone(),
    );
    let recovery = RecoveryService::new(ctx.documents(), pipeline.clone(), observer);

    ServiceStack {
        ingest,
        pipeline,
        recovery,
    }
}
