//! Basic contract information extracted by the first pipeline stage.

use serde::{Deserialize, Serialize};

/// Key facts pulled from a contract's text.
///
/// Every field is optional: the extraction service returns whatever it
/// could find and omits the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicInfo {
    #[serde(default)]
    pub contract_number: Option<String>,
    #[serde(default)]
    pub contract_name: Option<String>,
    #[serde(default)]
    pub party_a: Option<String>,
    #[serde(default)]
    pub party_b: Option<String>,
    #[serde(default)]
    pub contract_start_date: Option<String>,
    #[serde(default)]
    pub contract_end_date: Option<String>,
    #[serde(default, deserialize_with = "flexible_amount")]
    pub contract_total_amount: Option<f64>,
    #[serde(default)]
    pub contract_payment_method: Option<String>,
    #[serde(default)]
    pub contract_currency: Option<String>,
}

impl BasicInfo {
    /// Trim whitespace and drop empty strings across all text fields.
    pub fn normalized(self) -> Self {
        Self {
            contract_number: clean(self.contract_number),
            contract_name: clean(self.contract_name),
            party_a: clean(self.party_a),
            party_b: clean(self.party_b),
            contract_start_date: clean(self.contract_start_date),
            contract_end_date: clean(self.contract_end_date),
            contract_total_amount: self.contract_total_amount.filter(|n| n.is_finite()),
            contract_payment_method: clean(self.contract_payment_method),
            contract_currency: clean(self.contract_currency),
        }
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Accept amounts as numbers or as strings with thousands separators.
fn flexible_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) if n.is_finite() => Some(n),
        Some(Raw::Text(s)) => {
            let sanitized = s.replace(',', "");
            let sanitized = sanitized.trim();
            if sanitized.is_empty() {
                None
            } else {
                sanitized.parse::<f64>().ok().filter(|n| n.is_finite())
            }
        }
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_accepts_separated_string() {
        let info: BasicInfo = serde_json::from_str(
            r#"{"contract_name": "CT Service Agreement", "contract_total_amount": "1,250,000.50"}"#,
        )
        .unwrap();
        assert_eq!(info.contract_total_amount, Some(1_250_000.50));
    }

    #[test]
    fn test_amount_accepts_plain_number() {
        let info: BasicInfo =
            serde_json::from_str(r#"{"contract_total_amount": 98000}"#).unwrap();
        assert_eq!(info.contract_total_amount, Some(98000.0));
    }

    #[test]
    fn test_amount_rejects_garbage() {
        let info: BasicInfo =
            serde_json::from_str(r#"{"contract_total_amount": "about a million"}"#).unwrap();
        assert_eq!(info.contract_total_amount, None);
    }

    #[test]
    fn test_normalized_drops_blank_strings() {
        let info = BasicInfo {
            contract_name: Some("  Imaging Maintenance  ".to_string()),
            party_a: Some("   ".to_string()),
            ..Default::default()
        };
        let info = info.normalized();
        assert_eq!(info.contract_name.as_deref(), Some("Imaging Maintenance"));
        assert_eq!(info.party_a, None);
    }

    #[test]
    fn test_missing_fields_default_to_none() {
        let info: BasicInfo = serde_json::from_str("{}").unwrap();
        assert_eq!(info, BasicInfo::default());
    }
}
