use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::queue_client::helpers::{str_field, u64_field};
use crate::types::NetworkError;

/// Backend-issued queue identifier. The backend hands these out as strings or
/// numbers; both are kept as text since the client never does arithmetic on them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TokenId(String);

impl TokenId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(Self(s.trim().to_string())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TokenId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TokenId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for TokenId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value)
            .ok_or_else(|| D::Error::custom(format!("expected a token string or number, got {value}")))
    }
}

/// Latest known state of one queue token. Every poll produces a fresh snapshot
/// that replaces the previous one outright.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenStatusSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_number: Option<TokenId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triage_level: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_wait_minutes: Option<u64>,
    pub fetched_at: DateTime<Utc>,
}

impl TokenStatusSnapshot {
    pub fn from_value(value: &Value) -> Result<Self, NetworkError> {
        if !value.is_object() {
            return Err(NetworkError::decode(format!(
                "token status must be a JSON object, got {value}"
            )));
        }
        let status = str_field(value, &["status"])
            .ok_or_else(|| NetworkError::decode("token status response has no status"))?;

        Ok(Self {
            token_number: ["token_number", "tokenNumber"]
                .iter()
                .filter_map(|key| value.get(*key))
                .find_map(TokenId::from_value),
            patient_id: str_field(value, &["patient_id", "patientId"]),
            triage_level: str_field(value, &["triage_level", "triageLevel"]),
            status,
            department: str_field(value, &["department"]),
            position: u64_field(value, &["position"]),
            estimated_wait_minutes: u64_field(value, &["wait_time", "waitTime"]),
            fetched_at: Utc::now(),
        })
    }

    /// Whether `status` is one of `terminal` (case-insensitive).
    pub fn is_terminal(&self, terminal: &[String]) -> bool {
        let status = self.status.trim();
        terminal
            .iter()
            .any(|candidate| candidate.trim().eq_ignore_ascii_case(status))
    }
}
