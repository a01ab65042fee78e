use std::fmt;

use reqwest::{Method, Url};

use crate::queue_client::models::TokenId;
use crate::types::{NetworkError, NetworkErrorKind};

pub const DEFAULT_DEPARTMENT: &str = "General";

/// The fixed set of backend routes this client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    RegisterPatient,
    TokenStatus(TokenId),
    OpdLoad,
    DoctorAvailability,
    Alerts,
    Insights,
    CrowdPrediction { department: String },
}

impl Endpoint {
    pub fn method(&self) -> Method {
        match self {
            Self::RegisterPatient => Method::POST,
            _ => Method::GET,
        }
    }

    fn segments(&self) -> Vec<&str> {
        match self {
            Self::RegisterPatient => vec!["register-patient"],
            Self::TokenStatus(token) => vec!["token-status", token.as_str()],
            Self::OpdLoad => vec!["opd-load"],
            Self::DoctorAvailability => vec!["doctor-availability"],
            Self::Alerts => vec!["alerts"],
            Self::Insights => vec!["insights"],
            Self::CrowdPrediction { .. } => vec!["crowd-prediction"],
        }
    }

    /// Route path without percent-encoding, for logs and lookups.
    pub fn path(&self) -> String {
        format!("/{}", self.segments().join("/"))
    }

    /// Resolve this endpoint against the configured base URL. Path segments and
    /// query values are percent-encoded by `Url`.
    pub fn url(&self, base: &Url) -> Result<Url, NetworkError> {
        let mut url = base.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                NetworkError::new(
                    NetworkErrorKind::Request,
                    format!("{base} cannot be used as a base URL"),
                )
            })?;
            path.pop_if_empty();
            path.extend(self.segments());
        }
        if let Self::CrowdPrediction { department } = self {
            url.query_pairs_mut().append_pair("department", department);
        }
        Ok(url)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method(), self.path())
    }
}
