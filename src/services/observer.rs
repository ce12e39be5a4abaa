//! Observer seam for processing ledger writes.

use async_trait::async_trait;

use crate::models::NewLogEntry;
use crate::repository::LogRepository;

/// Sink for ledger entries emitted by the pipeline and ingest services.
///
/// Implementations must swallow their own failures: recording an attempt
/// never blocks the operation it describes.
#[async_trait]
pub trait ProcessingObserver: Send + Sync {
    async fn record(&self, entry: NewLogEntry);
}

/// Production observer appending to the processing ledger.
pub struct LedgerObserver {
    logs: LogRepository,
}

impl LedgerObserver {
    pub fn new(logs: LogRepository) -> Self {
        Self { logs }
    }
}

#[async_trait]
impl ProcessingObserver for LedgerObserver {
    async fn record(&self, entry: NewLogEntry) {
        self.logs.record(entry).await;
    }
}
