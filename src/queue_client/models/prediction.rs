use serde::Serialize;
use serde_json::Value;

use crate::queue_client::helpers::{f64_field, str_field, u64_field};

/// Expected crowding for one department.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrowdPrediction {
    pub department: String,
    pub crowd_risk: String,
    pub expected_patients: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl CrowdPrediction {
    pub fn from_value(department: &str, value: &Value) -> Self {
        Self {
            department: department.to_string(),
            crowd_risk: str_field(value, &["crowd_risk"]).unwrap_or_else(|| "unknown".to_string()),
            expected_patients: u64_field(value, &["expected_patients"]),
            suggested_action: str_field(value, &["suggested_action"])
                .filter(|action| !action.eq_ignore_ascii_case("none")),
            confidence: f64_field(value, &["confidence"]),
        }
    }
}
