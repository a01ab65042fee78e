use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::queue_client::helpers::{parse_percent, str_field, u64_field};
use crate::types::NetworkError;

/// One complete admin dashboard, assembled from a single polling cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub opd_load: OpdLoad,
    pub doctors: DoctorAvailability,
    pub alerts: AlertFeed,
    pub insights: Insights,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpdLoad {
    pub current_patients: Option<u64>,
    pub capacity: Option<u64>,
    pub utilization_percent: Option<f64>,
    pub raw: Value,
}

impl OpdLoad {
    pub fn from_value(value: &Value) -> Self {
        let current_patients = u64_field(value, &["current_patients", "total_patients", "current"]);
        let capacity = u64_field(value, &["capacity"]);
        let utilization_percent = value
            .get("utilization")
            .and_then(parse_percent)
            .or_else(|| match (current_patients, capacity) {
                (Some(current), Some(capacity)) if capacity > 0 => {
                    Some(current as f64 / capacity as f64 * 100.0)
                }
                _ => None,
            });

        Self {
            current_patients,
            capacity,
            utilization_percent,
            raw: value.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoctorStatus {
    pub name: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patients: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoctorAvailability {
    pub doctors: Vec<DoctorStatus>,
    pub available_count: u64,
    pub raw: Value,
}

impl DoctorAvailability {
    pub fn from_value(value: &Value) -> Self {
        let mut doctors = Vec::new();
        match value.get("doctors") {
            Some(Value::Object(map)) => {
                for (name, info) in map {
                    doctors.push(DoctorStatus {
                        name: name.clone(),
                        available: info.get("available").and_then(|v| v.as_bool()).unwrap_or(false),
                        patients: u64_field(info, &["patients"]),
                    });
                }
            }
            Some(Value::Array(entries)) => {
                for entry in entries {
                    let Some(name) = str_field(entry, &["name", "id"]) else {
                        continue;
                    };
                    doctors.push(DoctorStatus {
                        name,
                        available: entry.get("available").and_then(|v| v.as_bool()).unwrap_or(false),
                        patients: u64_field(entry, &["patients"]),
                    });
                }
            }
            _ => {}
        }
        doctors.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

        let available_count = u64_field(value, &["available_count"])
            .unwrap_or_else(|| doctors.iter().filter(|d| d.available).count() as u64);

        Self {
            doctors,
            available_count,
            raw: value.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_action: Option<String>,
    pub immediate_notify: bool,
}

impl Alert {
    fn plain(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: None,
            recommended_action: None,
            immediate_notify: false,
        }
    }

    /// `None` for an "all clear" notice (`alert_level: "none"`). An object
    /// carrying neither a level nor a message is not an alert.
    fn from_notice(value: &Value) -> Result<Option<Self>, NetworkError> {
        let level = str_field(value, &["alert_level", "level"]);
        let message = str_field(value, &["alert_message", "message"]);
        if level.is_none() && message.is_none() {
            return Err(NetworkError::decode(format!(
                "alert object has neither a level nor a message: {value}"
            )));
        }
        if level
            .as_deref()
            .map(|l| l.eq_ignore_ascii_case("none"))
            .unwrap_or(false)
        {
            return Ok(None);
        }
        Ok(Some(Self {
            message: message.unwrap_or_else(|| "Unspecified alert".to_string()),
            level,
            recommended_action: str_field(value, &["recommended_action"]),
            immediate_notify: value
                .get("immediate_notify")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertFeed {
    pub alerts: Vec<Alert>,
    pub raw: Value,
}

impl AlertFeed {
    /// Accepts a list of alert strings (or alert objects), a single alert
    /// notice object, or an object wrapping an `alerts` list.
    pub fn from_value(value: &Value) -> Result<Self, NetworkError> {
        let alerts = match value {
            Value::Array(entries) => parse_alert_list(entries)?,
            Value::Object(map) => match map.get("alerts") {
                Some(Value::Array(entries)) => parse_alert_list(entries)?,
                _ => Alert::from_notice(value)?.into_iter().collect(),
            },
            other => {
                return Err(NetworkError::decode(format!(
                    "alerts must be a list or an object, got {other}"
                )))
            }
        };

        Ok(Self {
            alerts,
            raw: value.clone(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}

fn parse_alert_list(entries: &[Value]) -> Result<Vec<Alert>, NetworkError> {
    let mut alerts = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            Value::String(message) => alerts.push(Alert::plain(message.as_str())),
            Value::Object(_) => alerts.extend(Alert::from_notice(entry)?),
            other => {
                return Err(NetworkError::decode(format!(
                    "unexpected alert entry {other}"
                )))
            }
        }
    }
    Ok(alerts)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insight {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub items: Vec<Insight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub raw: Value,
}

impl Insights {
    pub fn from_value(value: &Value) -> Self {
        let entries = match value {
            Value::Array(entries) => entries.as_slice(),
            _ => value
                .get("insights")
                .and_then(|v| v.as_array())
                .map(|v| v.as_slice())
                .unwrap_or_default(),
        };

        let items = entries
            .iter()
            .filter_map(|entry| match entry {
                Value::String(text) => Some(Insight {
                    text: text.clone(),
                    priority: None,
                }),
                Value::Object(_) => str_field(entry, &["insight", "text"]).map(|text| Insight {
                    text,
                    priority: str_field(entry, &["priority"]),
                }),
                _ => None,
            })
            .collect();

        Self {
            items,
            summary: str_field(value, &["summary"]),
            raw: value.clone(),
        }
    }
}
