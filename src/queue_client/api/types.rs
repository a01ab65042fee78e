use serde::Serialize;

use crate::queue_client::models::RegistrationRequest;

/// Wire body for `POST /register-patient`. The backend requires `contact` and
/// defaults `history`, so both are always sent, empty when not given.
#[derive(Debug, Serialize)]
pub struct RegisterPatientBody<'a> {
    pub name: &'a str,
    pub age: u32,
    pub symptoms: &'a str,
    pub contact: &'a str,
    pub history: &'a str,
}

impl<'a> From<&'a RegistrationRequest> for RegisterPatientBody<'a> {
    fn from(request: &'a RegistrationRequest) -> Self {
        Self {
            name: request.name.as_str(),
            age: request.age,
            symptoms: request.symptoms.as_str(),
            contact: request.contact.as_deref().unwrap_or_default(),
            history: request.history.as_deref().unwrap_or_default(),
        }
    }
}
