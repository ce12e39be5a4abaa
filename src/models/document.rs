//! Contract document model and processing lifecycle.
//!
//! Documents are deduplicated by a SHA-256 fingerprint of their raw bytes
//! and carry an ordered processing status that the pipeline advances one
//! stage at a time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Processing status of a document.
///
/// Statuses form a fixed sequence; `Error` is reachable from any
/// non-terminal status and `Completed`/`Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    Pending,
    ProcessingBasicInfo,
    ProcessingAnalysis,
    ProcessingServiceInfo,
    Completed,
    Error,
}

impl ProcessingStatus {
    /// Every non-terminal status, in pipeline order.
    ///
    /// This is the set the recovery scan filters on.
    pub const IN_FLIGHT: [ProcessingStatus; 4] = [
        Self::Pending,
        Self::ProcessingBasicInfo,
        Self::ProcessingAnalysis,
        Self::ProcessingServiceInfo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::ProcessingBasicInfo => "PROCESSING_BASIC_INFO",
            Self::ProcessingAnalysis => "PROCESSING_ANALYSIS",
            Self::ProcessingServiceInfo => "PROCESSING_SERVICE_INFO",
            Self::Completed => "COMPLETED",
            Self::Error => "ERROR",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "PROCESSING_BASIC_INFO" => Some(Self::ProcessingBasicInfo),
            "PROCESSING_ANALYSIS" => Some(Self::ProcessingAnalysis),
            "PROCESSING_SERVICE_INFO" => Some(Self::ProcessingServiceInfo),
            "COMPLETED" => Some(Self::Completed),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }

    /// The next status in the pipeline sequence, if any.
    pub fn successor(&self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::ProcessingBasicInfo),
            Self::ProcessingBasicInfo => Some(Self::ProcessingAnalysis),
            Self::ProcessingAnalysis => Some(Self::ProcessingServiceInfo),
            Self::ProcessingServiceInfo => Some(Self::Completed),
            Self::Completed | Self::Error => None,
        }
    }

    /// Whether a forward transition to `next` is allowed.
    ///
    /// Only the immediate successor or `Error` is reachable; terminal
    /// statuses allow nothing. The recovery reset to `Pending` bypasses
    /// this check deliberately.
    pub fn can_transition_to(&self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == Self::Error || self.successor() == Some(next)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// In-flight means the pipeline still owes this document work.
    pub fn is_in_flight(&self) -> bool {
        !self.is_terminal()
    }

    /// Whether a stage is actively claimed (excludes `Pending`).
    pub fn is_processing(&self) -> bool {
        matches!(
            self,
            Self::ProcessingBasicInfo | Self::ProcessingAnalysis | Self::ProcessingServiceInfo
        )
    }
}

/// An uploaded contract document under review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier (UUID v4).
    pub id: String,
    /// SHA-256 hex digest of the raw bytes; unique across all documents.
    pub fingerprint: String,
    /// Original filename from the upload.
    pub file_name: String,
    /// Declared or sniffed media type.
    pub media_type: String,
    /// Size of the stored bytes.
    pub file_size: i64,
    /// Text extracted by the conversion call at ingest time; the payload
    /// every stage operates on.
    pub text_content: Option<String>,
    /// Current processing status.
    pub status: ProcessingStatus,
    /// Captured failure reason; present only when status is `Error`.
    pub processing_error: Option<String>,
    /// When the document was ingested.
    pub created_at: DateTime<Utc>,
    /// Bumped on every status transition; the staleness scan reads this.
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Compute the content fingerprint for a byte payload.
    ///
    /// Depends only on the bytes, never on upload metadata.
    pub fn compute_fingerprint(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        hex::encode(hasher.finalize())
    }

    /// Create a new document in the initial status.
    pub fn new(fingerprint: String, file_name: String, media_type: String, file_size: i64) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            fingerprint,
            file_name,
            media_type,
            file_size,
            text_content: None,
            status: ProcessingStatus::Pending,
            processing_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.status.is_in_flight()
    }
}
