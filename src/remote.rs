use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::constants::{API_PREFIX, LOCAL_BASE_URL};
use crate::endpoints::{EndpointSet, Service};
use crate::environment::{present, EnvironmentContext};

/// The one way a remote configuration lookup can go wrong. Every variant is
/// handled the same way by the resolver: fall through to the next tier.
#[derive(Debug, Error)]
pub enum RemoteConfigError {
    #[error("remote configuration fetch failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("remote configuration fetch failed: HTTP {0}")]
    Status(StatusCode),
    #[error("remote configuration fetch failed: malformed payload: {0}")]
    Malformed(String),
    #[error("remote configuration fetch failed: remote source disabled")]
    Disabled,
}

/// Payload served by `GET /api/v1/config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
    pub urls: EndpointSet,
}

impl From<EndpointSet> for RemoteConfig {
    fn from(urls: EndpointSet) -> Self {
        Self {
            deployment_env: None,
            host_ip: None,
            public_ip: None,
            urls,
        }
    }
}

impl RemoteConfig {
    /// Accepts either the full config object (anything with a `urls` member)
    /// or a bare endpoint object. Only the endpoints have to be well formed;
    /// labels that are not strings are dropped and extra fields are ignored.
    pub fn from_json(value: serde_json::Value) -> Result<Self, RemoteConfigError> {
        let label = |key: &str| {
            value
                .get(key)
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        };
        let (urls, labelled) = match value.get("urls") {
            Some(urls) => (serde_json::from_value::<EndpointSet>(urls.clone()), true),
            None => (serde_json::from_value::<EndpointSet>(value.clone()), false),
        };
        let urls = urls.map_err(|e| RemoteConfigError::Malformed(e.to_string()))?;
        urls.validate()
            .map_err(|e| RemoteConfigError::Malformed(e.to_string()))?;

        if !labelled {
            return Ok(RemoteConfig::from(urls));
        }
        Ok(RemoteConfig {
            deployment_env: label("deployment_env"),
            host_ip: label("host_ip"),
            public_ip: label("public_ip"),
            urls,
        })
    }
}

/// Something that can be asked for the endpoint configuration.
pub trait RemoteConfigSource {
    fn fetch(&self) -> impl Future<Output = Result<RemoteConfig, RemoteConfigError>> + Send;
}

/// Fetches the configuration from the backend over HTTP.
#[derive(Debug, Clone)]
pub struct HttpConfigSource {
    client: Client,
    url: String,
}

impl HttpConfigSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout, using defaults: {}", e);
                Client::new()
            });
        Self {
            client,
            url: url.into(),
        }
    }

    /// Targets `<api base>/config`, where the API base is the `api` override or
    /// the URL the backend would have for this host.
    pub fn for_context(context: &EnvironmentContext, timeout: Duration) -> Self {
        let api_base = match present(&context.overrides().api) {
            Some(api) => api.trim_end_matches('/').to_string(),
            None => {
                let base = context
                    .runtime_base()
                    .unwrap_or_else(|| LOCAL_BASE_URL.to_string());
                format!("{}:{}{}", base, Service::Backend.port(), API_PREFIX)
            }
        };
        Self::new(format!("{}/config", api_base), timeout)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RemoteConfigSource for HttpConfigSource {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<RemoteConfig, RemoteConfigError> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteConfigError::Status(status));
        }

        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| RemoteConfigError::Malformed(e.to_string()))?;
        debug!(?body, "Received remote configuration");

        RemoteConfig::from_json(body)
    }
}

/// A source that never answers; resolution goes straight to hostname derivation.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSource;

impl RemoteConfigSource for OfflineSource {
    async fn fetch(&self) -> Result<RemoteConfig, RemoteConfigError> {
        Err(RemoteConfigError::Disabled)
    }
}
