use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, instrument};

use crate::constants::{API_REQUEST_TIMEOUT, HEALTH_PATH};
use crate::models::{
    AnalyzeTextRequest, AnalyzeTextResponse, AppEnvelope, AppInfo, AppList, ChatMessage,
    ChatRequest, ChatResponse, HealthStatus, MessageEnvelope, StatsEnvelope, SystemStats,
};
use crate::remote::RemoteConfig;
use crate::resolver::Resolution;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}: {detail}")]
    Status {
        url: String,
        status: StatusCode,
        detail: String,
    },
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Pulls FastAPI's `{"detail": ...}` out of an error body, falling back to the raw text.
fn error_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| match v.get("detail") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        });
    Some(detail.unwrap_or_else(|| body.to_string()))
}

/// Typed client for the portfolio backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    api_base: String,
    backend: String,
}

impl ApiClient {
    pub fn new(resolution: &Resolution) -> Result<Self, ApiError> {
        Self::with_timeout(&resolution.api, &resolution.urls.backend, *API_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(api_base: &str, backend: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            backend: backend.trim_end_matches('/').to_string(),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: String,
    ) -> Result<T, ApiError> {
        debug!(%url, "Making API request");
        let response = match request.send().await {
            Ok(response) => response,
            Err(source) => return Err(ApiError::Request { url, source }),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = error_detail(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });
            error!(%status, %detail, %url, "API request failed");
            return Err(ApiError::Status {
                url,
                status,
                detail,
            });
        }

        match response.json::<T>().await {
            Ok(body) => Ok(body),
            Err(source) => Err(ApiError::Decode { url, source }),
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: String) -> Result<T, ApiError> {
        self.execute(self.client.get(&url), url).await
    }

    /// Health endpoint lives on the backend root, not under the API prefix.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<HealthStatus, ApiError> {
        self.get(format!("{}{}", self.backend, HEALTH_PATH)).await
    }

    #[instrument(skip(self))]
    pub async fn get_config(&self) -> Result<RemoteConfig, ApiError> {
        self.get(self.api_url("/config")).await
    }

    #[instrument(skip(self))]
    pub async fn list_apps(&self) -> Result<AppList, ApiError> {
        self.get(self.api_url("/apps")).await
    }

    #[instrument(skip(self))]
    pub async fn get_app(&self, app_id: &str) -> Result<AppInfo, ApiError> {
        let envelope: AppEnvelope = self.get(self.api_url(&format!("/apps/{}", app_id))).await?;
        Ok(envelope.app)
    }

    #[instrument(skip(self, app), fields(app_id = %app.id))]
    pub async fn add_app(&self, app: &AppInfo) -> Result<AppInfo, ApiError> {
        let url = self.api_url("/apps");
        let envelope: AppEnvelope = self.execute(self.client.post(&url).json(app), url).await?;
        Ok(envelope.app)
    }

    #[instrument(skip(self, app))]
    pub async fn update_app(&self, app_id: &str, app: &AppInfo) -> Result<AppInfo, ApiError> {
        let url = self.api_url(&format!("/apps/{}", app_id));
        let envelope: AppEnvelope = self.execute(self.client.put(&url).json(app), url).await?;
        Ok(envelope.app)
    }

    /// Returns the backend's confirmation message.
    #[instrument(skip(self))]
    pub async fn delete_app(&self, app_id: &str) -> Result<String, ApiError> {
        let url = self.api_url(&format!("/apps/{}", app_id));
        let envelope: MessageEnvelope = self.execute(self.client.delete(&url), url).await?;
        Ok(envelope.message)
    }

    #[instrument(skip(self))]
    pub async fn system_stats(&self) -> Result<SystemStats, ApiError> {
        let envelope: StatsEnvelope = self.get(self.api_url("/system/stats")).await?;
        Ok(envelope.stats)
    }

    #[instrument(skip(self, message, history), fields(history_len = history.len()))]
    pub async fn chat(&self, message: &str, history: &[ChatMessage]) -> Result<String, ApiError> {
        let url = self.api_url("/bedrock/chat");
        let body = ChatRequest {
            message,
            conversation_history: history,
        };
        let reply: ChatResponse = self.execute(self.client.post(&url).json(&body), url).await?;
        Ok(reply.response)
    }

    #[instrument(skip(self, text))]
    pub async fn analyze_text(&self, text: &str, analysis_type: &str) -> Result<String, ApiError> {
        let url = self.api_url("/bedrock/analyze-text");
        let body = AnalyzeTextRequest {
            text,
            analysis_type,
        };
        let reply: AnalyzeTextResponse =
            self.execute(self.client.post(&url).json(&body), url).await?;
        Ok(reply.analysis)
    }

    /// Uploads a document as `multipart/form-data`. The backend picks the text
    /// extractor from the file name's extension (`.pdf`, `.docx`, `.txt`).
    #[instrument(skip(self, content), fields(size = content.len()))]
    pub async fn analyze_document(
        &self,
        file_name: &str,
        content: Vec<u8>,
        analysis_type: &str,
    ) -> Result<String, ApiError> {
        let url = self.api_url("/bedrock/analyze-document");
        let form = Form::new()
            .part("file", Part::bytes(content).file_name(file_name.to_string()))
            .text("analysis_type", analysis_type.to_string());
        // FastAPI reads a plain `str` parameter next to a file from the query string.
        let request = self
            .client
            .post(&url)
            .query(&[("analysis_type", analysis_type)])
            .multipart(form);
        let reply: AnalyzeTextResponse = self.execute(request, url).await?;
        Ok(reply.analysis)
    }
}
