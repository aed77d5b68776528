use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::constants::{
    AI_CHAT_PORT, API_PREFIX, BACKEND_PORT, DOCUMENT_ANALYSIS_PORT, FRONTEND_PORT, HEALTH_PATH,
    LOCAL_BASE_URL, WEB_SEARCH_PORT,
};

/// The logical services a portal knows how to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Backend,
    Frontend,
    AiChat,
    DocumentAnalysis,
    WebSearch,
}

impl Service {
    pub const ALL: [Service; 5] = [
        Service::Backend,
        Service::Frontend,
        Service::AiChat,
        Service::DocumentAnalysis,
        Service::WebSearch,
    ];

    /// Key used for this service in the `urls` object of the config payload.
    pub fn key(self) -> &'static str {
        match self {
            Service::Backend => "backend",
            Service::Frontend => "frontend",
            Service::AiChat => "ai_chat",
            Service::DocumentAnalysis => "document_analysis",
            Service::WebSearch => "web_search",
        }
    }

    pub fn port(self) -> u16 {
        match self {
            Service::Backend => BACKEND_PORT,
            Service::Frontend => FRONTEND_PORT,
            Service::AiChat => AI_CHAT_PORT,
            Service::DocumentAnalysis => DOCUMENT_ANALYSIS_PORT,
            Service::WebSearch => WEB_SEARCH_PORT,
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    #[error("endpoint `{0}` is empty")]
    Empty(Service),
}

/// Resolved URL for every service. All five fields are always populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSet {
    pub backend: String,
    pub frontend: String,
    pub ai_chat: String,
    pub document_analysis: String,
    pub web_search: String,
}

impl EndpointSet {
    /// Builds every service URL as `<base>:<port>`.
    pub fn from_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        let url = |service: Service| format!("{}:{}", base, service.port());
        Self {
            backend: url(Service::Backend),
            frontend: url(Service::Frontend),
            ai_chat: url(Service::AiChat),
            document_analysis: url(Service::DocumentAnalysis),
            web_search: url(Service::WebSearch),
        }
    }

    /// Last-resort defaults pointing at a local development stack.
    pub fn localhost() -> Self {
        Self::from_base(LOCAL_BASE_URL)
    }

    pub fn get(&self, service: Service) -> &str {
        match service {
            Service::Backend => &self.backend,
            Service::Frontend => &self.frontend,
            Service::AiChat => &self.ai_chat,
            Service::DocumentAnalysis => &self.document_analysis,
            Service::WebSearch => &self.web_search,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Service, &str)> + '_ {
        Service::ALL.into_iter().map(move |s| (s, self.get(s)))
    }

    /// Rejects sets where any service maps to an empty or blank URL.
    pub fn validate(&self) -> Result<(), EndpointError> {
        match self.iter().find(|(_, url)| url.trim().is_empty()) {
            Some((service, _)) => Err(EndpointError::Empty(service)),
            None => Ok(()),
        }
    }

    /// `<backend>/api/v1`
    pub fn api_base(&self) -> String {
        format!("{}{}", self.backend.trim_end_matches('/'), API_PREFIX)
    }

    pub fn health_url(&self) -> String {
        format!("{}{}", self.backend.trim_end_matches('/'), HEALTH_PATH)
    }
}
