use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::types::{ClientError, NetworkError, NetworkErrorKind};

use super::api::Endpoint;

const ERROR_BODY_PREVIEW_CHARS: usize = 200;

/// Issues one request against a queue backend endpoint and hands back the
/// decoded JSON body. Implementations never panic or retry; every failure is
/// returned as a [`NetworkError`].
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn request(&self, endpoint: &Endpoint, body: Option<Value>) -> Result<Value, NetworkError>;
}

/// [`Gateway`] backed by `reqwest`. Stateless apart from the connection pool,
/// so one instance can be shared by every view.
#[derive(Clone)]
pub struct HttpGateway {
    http: Client,
    base_url: Url,
}

impl HttpGateway {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let raw = config.api_base_url.trim();
        let base_url = Url::parse(raw)
            .map_err(|err| ClientError::Config(format!("Invalid api_base_url {raw:?}: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "api_base_url {raw:?} cannot be used as a base URL"
            )));
        }

        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| ClientError::Config(format!("Failed to create HTTP client: {err}")))?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn request(&self, endpoint: &Endpoint, body: Option<Value>) -> Result<Value, NetworkError> {
        let url = endpoint.url(&self.base_url)?;
        debug!(endpoint = %endpoint, url = %url, "Sending request");

        let mut request = self
            .http
            .request(endpoint.method(), url)
            .header(ACCEPT, "application/json");
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|err| {
            warn!(endpoint = %endpoint, error = %err, "Request failed");
            NetworkError::from(err)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.trim().chars().take(ERROR_BODY_PREVIEW_CHARS).collect();
            return Err(NetworkError::new(
                NetworkErrorKind::Status(status.as_u16()),
                if preview.is_empty() {
                    format!("{endpoint} returned {status}")
                } else {
                    format!("{endpoint} returned {status}: {preview}")
                },
            ));
        }

        let bytes = response.bytes().await.map_err(NetworkError::from)?;
        serde_json::from_slice(&bytes).map_err(|err| {
            NetworkError::decode(format!("{endpoint} returned malformed JSON: {err}"))
        })
    }
}
