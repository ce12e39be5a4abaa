//! Service information extracted by the final pipeline stage.
//!
//! Covers the serviced devices, the maintenance commitments, and any
//! training support promised in the contract.

use serde::{Deserialize, Serialize};

/// A device covered by the service contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub registration_number: Option<String>,
    #[serde(default)]
    pub device_model: Option<String>,
    #[serde(default)]
    pub installation_date: Option<String>,
    #[serde(default)]
    pub service_start_date: Option<String>,
    #[serde(default)]
    pub service_end_date: Option<String>,
    /// Scheduled maintenance visits per year.
    #[serde(default)]
    pub maintenance_frequency: Option<f64>,
    /// Promised response time in hours.
    #[serde(default)]
    pub response_time: Option<f64>,
    /// Promised on-site arrival time in hours.
    #[serde(default)]
    pub arrival_time: Option<f64>,
}

/// A maintenance commitment in the contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceItem {
    #[serde(default)]
    pub maintenance_scope: Option<String>,
    #[serde(default)]
    pub included_parts: Vec<String>,
    #[serde(default)]
    pub spare_parts_support: Option<String>,
    #[serde(default)]
    pub deep_maintenance: Option<bool>,
}

/// A training support commitment in the contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingItem {
    #[serde(default)]
    pub training_category: Option<String>,
    #[serde(default)]
    pub applicable_devices: Vec<String>,
    #[serde(default)]
    pub training_times: Option<i64>,
    #[serde(default)]
    pub training_period: Option<String>,
    #[serde(default)]
    pub training_days: Option<i64>,
    #[serde(default)]
    pub training_seats: Option<i64>,
    #[serde(default)]
    pub training_cost: Option<String>,
}

/// Snapshot of all service commitments extracted from one contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    #[serde(default)]
    pub devices: Vec<DeviceInfo>,
    #[serde(default, rename = "maintenance_services")]
    pub maintenance: Vec<MaintenanceItem>,
    #[serde(default, rename = "training_supports")]
    pub trainings: Vec<TrainingItem>,
}

impl ServiceInfo {
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty() && self.maintenance.is_empty() && self.trainings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extraction_payload() {
        let payload = r#"{
            "devices": [
                {
                    "device_name": "Revolution CT",
                    "device_model": "RevCT-2020",
                    "maintenance_frequency": 4,
                    "response_time": 2,
                    "arrival_time": 24
                }
            ],
            "maintenance_services": [
                {
                    "maintenance_scope": "full",
                    "included_parts": ["tube", "detector"],
                    "deep_maintenance": true
                }
            ],
            "training_supports": []
        }"#;

        let info: ServiceInfo = serde_json::from_str(payload).unwrap();
        assert_eq!(info.devices.len(), 1);
        assert_eq!(info.devices[0].response_time, Some(2.0));
        assert_eq!(info.maintenance[0].included_parts.len(), 2);
        assert!(info.trainings.is_empty());
        assert!(!info.is_empty());
    }

    #[test]
    fn test_missing_sections_default_empty() {
        let info: ServiceInfo = serde_json::from_str("{}").unwrap();
        assert!(info.is_empty());
    }
}
