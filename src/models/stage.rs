//! Pipeline stages and their typed outputs.

use serde::{Deserialize, Serialize};

use super::analysis::{ClauseAnalysis, StandardClause};
use super::basic_info::BasicInfo;
use super::document::ProcessingStatus;
use super::service_info::ServiceInfo;

/// One discrete unit of pipeline work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    BasicInfo,
    Analysis,
    ServiceInfo,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 3] = [Self::BasicInfo, Self::Analysis, Self::ServiceInfo];

    /// Status a document carries while this stage runs.
    pub fn marker(&self) -> ProcessingStatus {
        match self {
            Self::BasicInfo => ProcessingStatus::ProcessingBasicInfo,
            Self::Analysis => ProcessingStatus::ProcessingAnalysis,
            Self::ServiceInfo => ProcessingStatus::ProcessingServiceInfo,
        }
    }

    /// Ledger action tag for attempts of this stage.
    pub fn action(&self) -> &'static str {
        match self {
            Self::BasicInfo => "BASIC_INFO_EXTRACTION",
            Self::Analysis => "CONTRACT_ANALYSIS",
            Self::ServiceInfo => "SERVICE_INFO_EXTRACTION",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::BasicInfo => "basic info extraction",
            Self::Analysis => "clause analysis",
            Self::ServiceInfo => "service info extraction",
        }
    }

    /// The stage a document observed at `status` still owes.
    ///
    /// A document inside a stage marker owes that same stage again: the
    /// advance into the marker happens before the external call, so the
    /// stage may have been interrupted mid-flight. Terminal statuses owe
    /// nothing.
    pub fn current_for(status: ProcessingStatus) -> Option<Stage> {
        match status {
            ProcessingStatus::Pending | ProcessingStatus::ProcessingBasicInfo => {
                Some(Self::BasicInfo)
            }
            ProcessingStatus::ProcessingAnalysis => Some(Self::Analysis),
            ProcessingStatus::ProcessingServiceInfo => Some(Self::ServiceInfo),
            ProcessingStatus::Completed | ProcessingStatus::Error => None,
        }
    }

    /// Stages left to run for a document observed at `status`, in order.
    pub fn remaining_from(status: ProcessingStatus) -> &'static [Stage] {
        match Self::current_for(status) {
            Some(Self::BasicInfo) => &Self::ALL,
            Some(Self::Analysis) => &Self::ALL[1..],
            Some(Self::ServiceInfo) => &Self::ALL[2..],
            None => &[],
        }
    }
}

/// Typed result of one completed stage, the unit the orchestrator persists.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutput {
    BasicInfo(BasicInfo),
    Analysis {
        result: ClauseAnalysis,
        standard_clauses: Vec<StandardClause>,
    },
    ServiceInfo(ServiceInfo),
}

impl StageOutput {
    pub fn stage(&self) -> Stage {
        match self {
            Self::BasicInfo(_) => Stage::BasicInfo,
            Self::Analysis { .. } => Stage::Analysis,
            Self::ServiceInfo(_) => Stage::ServiceInfo,
        }
    }
}
