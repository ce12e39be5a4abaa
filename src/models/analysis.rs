//! Clause analysis results from the non-standard detection stage.

use serde::{Deserialize, Serialize};

/// A reference clause the analysis compares contract text against.
///
/// Supplied by the caller when triggering a run; echoed back into the
/// stored analysis so results stay interpretable after templates change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardClause {
    pub clause_category: String,
    pub clause_item: String,
    pub standard_text: String,
}

/// Risk assessment attached to a single analyzed clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseRisk {
    pub level: String,
    #[serde(default)]
    pub opinion: Option<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
}

/// One clause located in the contract with its compliance verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedClause {
    pub clause_category: String,
    pub clause_item: String,
    pub contract_text: String,
    #[serde(default)]
    pub standard_reference: Option<StandardClause>,
    #[serde(default)]
    pub compliance: Option<String>,
    #[serde(default)]
    pub risk: Option<ClauseRisk>,
}

/// Full result payload returned by the detection service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClauseAnalysis {
    #[serde(default)]
    pub extracted_clauses: Vec<AnalyzedClause>,
}

impl ClauseAnalysis {
    pub fn is_empty(&self) -> bool {
        self.extracted_clauses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_detection_payload() {
        let payload = r#"{
            "extracted_clauses": [
                {
                    "clause_category": "liability",
                    "clause_item": "limitation of liability",
                    "contract_text": "Liability is capped at the annual fee.",
                    "standard_reference": {
                        "clause_category": "liability",
                        "clause_item": "limitation of liability",
                        "standard_text": "Liability shall not exceed the total contract value."
                    },
                    "compliance": "non_standard",
                    "risk": { "level": "high", "opinion": "Cap is below standard." }
                }
            ]
        }"#;

        let analysis: ClauseAnalysis = serde_json::from_str(payload).unwrap();
        assert_eq!(analysis.extracted_clauses.len(), 1);
        let clause = &analysis.extracted_clauses[0];
        assert_eq!(clause.compliance.as_deref(), Some("non_standard"));
        assert_eq!(clause.risk.as_ref().unwrap().level, "high");
        assert!(clause.risk.as_ref().unwrap().recommendation.is_none());
    }

    #[test]
    fn test_empty_payload_parses() {
        let analysis: ClauseAnalysis = serde_json::from_str("{}").unwrap();
        assert!(analysis.is_empty());
    }
}
