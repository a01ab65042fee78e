use std::fmt;

use thiserror::Error;

/// What went wrong while talking to the queue backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// The backend could not be reached.
    Connect,
    Timeout,
    /// The backend answered with a non-2xx status.
    Status(u16),
    /// The body was not valid JSON or did not have the expected shape.
    Decode,
    /// The request could not be built (bad URL, unserializable body).
    Request,
    Transport,
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => f.write_str("connection failed"),
            Self::Timeout => f.write_str("request timed out"),
            Self::Status(code) => write!(f, "HTTP {code}"),
            Self::Decode => f.write_str("unexpected response"),
            Self::Request => f.write_str("invalid request"),
            Self::Transport => f.write_str("transport error"),
        }
    }
}

/// Failure surfaced by the HTTP gateway. Decode failures are carried here too
/// so callers can treat every backend problem the same way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct NetworkError {
    pub kind: NetworkErrorKind,
    pub detail: String,
}

impl NetworkError {
    pub fn new(kind: NetworkErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn decode(detail: impl Into<String>) -> Self {
        Self::new(NetworkErrorKind::Decode, detail)
    }

    pub fn is_decode(&self) -> bool {
        self.kind == NetworkErrorKind::Decode
    }

    pub fn status(&self) -> Option<u16> {
        match self.kind {
            NetworkErrorKind::Status(code) => Some(code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            NetworkErrorKind::Timeout
        } else if err.is_connect() {
            NetworkErrorKind::Connect
        } else if err.is_decode() {
            NetworkErrorKind::Decode
        } else if err.is_builder() {
            NetworkErrorKind::Request
        } else if let Some(status) = err.status() {
            NetworkErrorKind::Status(status.as_u16())
        } else {
            NetworkErrorKind::Transport
        };
        Self::new(kind, err.to_string())
    }
}

/// Client-side form checks that failed before any request was sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name is required")]
    MissingName,
    #[error("age must be a positive whole number, got {0:?}")]
    InvalidAge(String),
    #[error("symptoms are required")]
    MissingSymptoms,
}

/// One of the four documents that make up a dashboard snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DashboardSource {
    OpdLoad,
    DoctorAvailability,
    Alerts,
    Insights,
}

impl fmt::Display for DashboardSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OpdLoad => "opd-load",
            Self::DoctorAvailability => "doctor-availability",
            Self::Alerts => "alerts",
            Self::Insights => "insights",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub source: DashboardSource,
    pub error: NetworkError,
}

/// A dashboard cycle where at least one joined fetch failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationError {
    pub failures: Vec<SourceFailure>,
}

impl fmt::Display for AggregationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let details = self
            .failures
            .iter()
            .map(|failure| format!("{} ({})", failure.source, failure.error))
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "{} of 4 dashboard sources failed: {}",
            self.failures.len(),
            details
        )
    }
}

impl std::error::Error for AggregationError {}

impl AggregationError {
    pub fn failed_sources(&self) -> Vec<DashboardSource> {
        self.failures.iter().map(|failure| failure.source).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("invalid registration: {0}")]
    Validation(#[from] ValidationError),
    #[error("backend request failed: {0}")]
    Network(#[from] NetworkError),
    #[error("dashboard refresh failed: {0}")]
    Aggregation(#[from] AggregationError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("a registration is already being submitted")]
    SubmissionInProgress,
    #[error("patient already registered; reset the form to register another")]
    AlreadyRegistered,
}
