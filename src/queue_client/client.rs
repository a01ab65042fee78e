use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::types::{NetworkError, NetworkErrorKind};

use super::api::{Endpoint, RegisterPatientBody};
use super::gateway::Gateway;
use super::models::{
    AlertFeed, CrowdPrediction, DoctorAvailability, Insights, OpdLoad, RegistrationReceipt,
    RegistrationRequest, TokenId, TokenStatusSnapshot,
};

/// Typed calls for every queue backend endpoint, layered over a [`Gateway`].
#[derive(Clone)]
pub struct QueueClient {
    gateway: Arc<dyn Gateway>,
}

impl QueueClient {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    pub async fn register_patient(
        &self,
        request: &RegistrationRequest,
    ) -> Result<RegistrationReceipt, NetworkError> {
        let body = serde_json::to_value(RegisterPatientBody::from(request)).map_err(|err| {
            NetworkError::new(
                NetworkErrorKind::Request,
                format!("Failed to encode registration: {err}"),
            )
        })?;
        let value = self
            .gateway
            .request(&Endpoint::RegisterPatient, Some(body))
            .await?;
        let receipt = RegistrationReceipt::from_value(&value)?;
        info!(token = %receipt.token, "Patient registered");
        Ok(receipt)
    }

    pub async fn token_status(&self, token: &TokenId) -> Result<TokenStatusSnapshot, NetworkError> {
        let value = self.get(&Endpoint::TokenStatus(token.clone())).await?;
        TokenStatusSnapshot::from_value(&value)
    }

    pub async fn opd_load(&self) -> Result<OpdLoad, NetworkError> {
        let value = self.get(&Endpoint::OpdLoad).await?;
        Ok(OpdLoad::from_value(&value))
    }

    pub async fn doctor_availability(&self) -> Result<DoctorAvailability, NetworkError> {
        let value = self.get(&Endpoint::DoctorAvailability).await?;
        Ok(DoctorAvailability::from_value(&value))
    }

    pub async fn alerts(&self) -> Result<AlertFeed, NetworkError> {
        let value = self.get(&Endpoint::Alerts).await?;
        AlertFeed::from_value(&value)
    }

    pub async fn insights(&self) -> Result<Insights, NetworkError> {
        let value = self.get(&Endpoint::Insights).await?;
        Ok(Insights::from_value(&value))
    }

    pub async fn crowd_prediction(&self, department: &str) -> Result<CrowdPrediction, NetworkError> {
        let value = self
            .get(&Endpoint::CrowdPrediction {
                department: department.to_string(),
            })
            .await?;
        Ok(CrowdPrediction::from_value(department, &value))
    }

    async fn get(&self, endpoint: &Endpoint) -> Result<Value, NetworkError> {
        let value = self.gateway.request(endpoint, None).await?;
        debug!(endpoint = %endpoint, "Response received");
        Ok(value)
    }
}
