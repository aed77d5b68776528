use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::net::Ipv6Addr;
use tracing::debug;

use crate::constants::{
    ENV_AI_CHAT_URL, ENV_API_URL, ENV_BACKEND_URL, ENV_DOCUMENT_ANALYSIS_URL, ENV_FRONTEND_URL,
    ENV_WEB_SEARCH_URL, LOCAL_BASE_URL,
};

/// Where the portal is running, derived from the observed hostname.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentClass {
    Local,
    Cloud,
}

impl DeploymentClass {
    pub fn classify(hostname: &str) -> Self {
        match hostname {
            "localhost" | "127.0.0.1" => DeploymentClass::Local,
            _ => DeploymentClass::Cloud,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeploymentClass::Local => "local",
            DeploymentClass::Cloud => "cloud",
        }
    }
}

impl fmt::Display for DeploymentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Endpoint URLs fixed at packaging time. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildTimeOverrides {
    pub api: Option<String>,
    pub backend: Option<String>,
    pub frontend: Option<String>,
    pub ai_chat: Option<String>,
    pub document_analysis: Option<String>,
    pub web_search: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// The value of an override field unless it is missing or blank.
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl BuildTimeOverrides {
    /// Values baked into the binary by the `GENAI_*_URL` variables at compile time.
    pub fn from_build() -> Self {
        let baked = |v: Option<&'static str>| non_empty(v.map(str::to_string));
        Self {
            api: baked(option_env!("GENAI_API_URL")),
            backend: baked(option_env!("GENAI_BACKEND_URL")),
            frontend: baked(option_env!("GENAI_FRONTEND_URL")),
            ai_chat: baked(option_env!("GENAI_AI_CHAT_URL")),
            document_analysis: baked(option_env!("GENAI_DOCUMENT_ANALYSIS_URL")),
            web_search: baked(option_env!("GENAI_WEB_SEARCH_URL")),
        }
    }

    /// Same variables read from the process environment at startup.
    pub fn from_env() -> Self {
        let var = |name: &str| non_empty(env::var(name).ok());
        Self {
            api: var(ENV_API_URL),
            backend: var(ENV_BACKEND_URL),
            frontend: var(ENV_FRONTEND_URL),
            ai_chat: var(ENV_AI_CHAT_URL),
            document_analysis: var(ENV_DOCUMENT_ANALYSIS_URL),
            web_search: var(ENV_WEB_SEARCH_URL),
        }
    }

    /// Fields already set on `self` win over `other`.
    pub fn or(self, other: Self) -> Self {
        Self {
            api: self.api.or(other.api),
            backend: self.backend.or(other.backend),
            frontend: self.frontend.or(other.frontend),
            ai_chat: self.ai_chat.or(other.ai_chat),
            document_analysis: self.document_analysis.or(other.document_analysis),
            web_search: self.web_search.or(other.web_search),
        }
    }

    /// Overrides are only authoritative when both the backend and the API URL are known.
    pub fn is_complete(&self) -> bool {
        present(&self.backend).is_some() && present(&self.api).is_some()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Facts captured once at startup about where resolution runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentContext {
    hostname: String,
    overrides: BuildTimeOverrides,
}

impl EnvironmentContext {
    /// Hostnames are case-insensitive and kept lowercase, as browsers report them.
    pub fn new(hostname: impl Into<String>, overrides: BuildTimeOverrides) -> Self {
        let hostname = hostname.into().trim().to_ascii_lowercase();
        debug!(%hostname, ?overrides, "Captured environment context");
        Self { hostname, overrides }
    }

    /// Context for `hostname` with overrides from the build and then the process environment.
    pub fn capture(hostname: impl Into<String>) -> Self {
        Self::new(
            hostname,
            BuildTimeOverrides::from_build().or(BuildTimeOverrides::from_env()),
        )
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn deployment_class(&self) -> DeploymentClass {
        DeploymentClass::classify(&self.hostname)
    }

    pub fn overrides(&self) -> &BuildTimeOverrides {
        &self.overrides
    }

    /// `http://localhost` for local hosts, `http://<hostname>` otherwise, `None` without a hostname.
    pub fn runtime_base(&self) -> Option<String> {
        if self.hostname.is_empty() {
            return None;
        }
        Some(match self.deployment_class() {
            DeploymentClass::Local => LOCAL_BASE_URL.to_string(),
            DeploymentClass::Cloud => format!("http://{}", self.url_host()),
        })
    }

    /// The hostname as it appears in a URL authority; IPv6 literals get brackets.
    fn url_host(&self) -> String {
        if self.hostname.parse::<Ipv6Addr>().is_ok() {
            format!("[{}]", self.hostname)
        } else {
            self.hostname.clone()
        }
    }
}
