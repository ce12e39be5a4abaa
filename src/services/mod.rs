//! Service layer for redline business logic.
//!
//! This module contains domain logic separated from transport concerns.
//! Services can be used by CLI, web server, or background tasks.

pub mod extract;
pub mod ingest;
pub mod observer;
pub mod pipeline;
pub mod recovery;

#[allow(unused_imports)]
pub use extract::{ExtractionError, Extractor, HttpExtractor};
#[allow(unused_imports)]
pub use ingest::{DuplicateCheck, IngestError, IngestResult, IngestService};
#[allow(unused_imports)]
pub use observer::{LedgerObserver, ProcessingObserver};
#[allow(unused_imports)]
pub use pipeline::{PipelineService, RunOptions, RunOutcome, RunReport, DEFAULT_STAGE_TIMEOUT};
#[allow(unused_imports)]
pub use recovery::{
    RecoveryDisposition, RecoveryOptions, RecoveryOutcome, RecoveryReport, RecoveryService,
    DEFAULT_RECOVERY_LIMIT, DEFAULT_STALENESS,
};
