//! Data models for Redline.

mod analysis;
mod basic_info;
mod document;
mod processing_log;
mod service_info;
mod stage;

pub use analysis::{AnalyzedClause, ClauseAnalysis, ClauseRisk, StandardClause};
pub use basic_info::BasicInfo;
pub use document::{Document, ProcessingStatus};
pub use processing_log::{
    actions, sources, LogPage, LogQuery, LogStatus, NewLogEntry, ProcessingLogEntry,
    DEFAULT_QUERY_LIMIT, MAX_QUERY_LIMIT, METADATA_MAX_CHARS,
};
pub use service_info::{DeviceInfo, MaintenanceItem, ServiceInfo, TrainingItem};
pub use stage::{Stage, StageOutput};
