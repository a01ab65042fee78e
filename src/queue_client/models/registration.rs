use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::queue_client::helpers::{str_field, u64_field};
use crate::types::{NetworkError, ValidationError};

use super::TokenId;

/// A validated patient registration, ready to be sent once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub name: String,
    pub age: u32,
    pub symptoms: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<String>,
}

impl RegistrationRequest {
    pub fn new(name: impl Into<String>, age: u32, symptoms: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            age,
            symptoms: symptoms.into(),
            contact: None,
            history: None,
        }
    }

    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = Some(contact.into());
        self
    }

    pub fn with_history(mut self, history: impl Into<String>) -> Self {
        self.history = Some(history.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        if self.age == 0 {
            return Err(ValidationError::InvalidAge(self.age.to_string()));
        }
        if self.symptoms.trim().is_empty() {
            return Err(ValidationError::MissingSymptoms);
        }
        Ok(())
    }
}

/// Raw form input as typed by the patient.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    pub name: String,
    pub age: String,
    pub symptoms: String,
    pub contact: String,
    pub history: String,
}

impl RegistrationForm {
    pub fn into_request(self) -> Result<RegistrationRequest, ValidationError> {
        let age_text = self.age.trim();
        let age = match age_text.parse::<u32>() {
            Ok(age) if age > 0 => age,
            _ => return Err(ValidationError::InvalidAge(age_text.to_string())),
        };

        let request = RegistrationRequest {
            name: self.name.trim().to_string(),
            age,
            symptoms: self.symptoms.trim().to_string(),
            contact: non_blank(self.contact),
            history: non_blank(self.history),
        };
        request.validate()?;
        Ok(request)
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// What the backend hands back after a successful registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationReceipt {
    /// Key for `/token-status/{id}`.
    pub token: TokenId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triage_level: Option<String>,
}

impl RegistrationReceipt {
    pub fn from_value(value: &Value) -> Result<Self, NetworkError> {
        let token = ["token", "patient_id"]
            .iter()
            .filter_map(|key| value.get(*key))
            .find_map(TokenId::from_value)
            .ok_or_else(|| {
                NetworkError::decode("registration response carries neither token nor patient_id")
            })?;

        Ok(Self {
            token,
            patient_id: str_field(value, &["patient_id"]),
            token_number: u64_field(value, &["token_number", "tokenNumber"]),
            name: str_field(value, &["name"]),
            triage_level: str_field(value, &["triage_level"]),
        })
    }
}
