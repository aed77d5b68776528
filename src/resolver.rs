use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::endpoints::EndpointSet;
use crate::environment::{present, DeploymentClass, EnvironmentContext};
use crate::remote::{RemoteConfig, RemoteConfigSource};

/// Which source produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    BuildTime,
    Remote,
    Runtime,
    Fallback,
}

/// A fully populated endpoint configuration together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub deployment_env: String,
    pub host_ip: String,
    pub public_ip: String,
    pub urls: EndpointSet,
    /// Base URL for `/api/v1` calls.
    pub api: String,
    pub source: Tier,
}

impl Resolution {
    /// The shape served to other portals from `/api/v1/config`.
    pub fn to_remote_config(&self) -> RemoteConfig {
        RemoteConfig {
            deployment_env: Some(self.deployment_env.clone()),
            host_ip: Some(self.host_ip.clone()),
            public_ip: Some(self.public_ip.clone()),
            urls: self.urls.clone(),
        }
    }
}

/// Picks the endpoint configuration for a captured environment.
///
/// Sources are tried in order and the first usable one supplies the whole set:
/// build-time overrides, the remote config endpoint, URLs derived from the
/// hostname, and finally the localhost defaults. Resolution never fails.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    context: EnvironmentContext,
}

impl ConfigResolver {
    pub fn new(context: EnvironmentContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &EnvironmentContext {
        &self.context
    }

    pub async fn resolve<S: RemoteConfigSource>(&self, remote: &S) -> EndpointSet {
        self.resolve_detailed(remote).await.urls
    }

    #[instrument(skip(self, remote), fields(hostname = %self.context.hostname()))]
    pub async fn resolve_detailed<S: RemoteConfigSource>(&self, remote: &S) -> Resolution {
        if let Some(resolution) = self.from_overrides() {
            info!("Using build-time endpoint overrides");
            return resolution;
        }

        match remote.fetch().await {
            Ok(config) => match config.urls.validate() {
                Ok(()) => {
                    info!(backend = %config.urls.backend, "Using remote endpoint configuration");
                    return self.from_remote(config);
                }
                Err(e) => warn!("Remote configuration rejected: {}", e),
            },
            Err(e) => warn!("{}, deriving endpoints from hostname", e),
        }

        let resolution = self.derived();
        info!(source = ?resolution.source, backend = %resolution.urls.backend, "Using derived endpoints");
        resolution
    }

    fn from_overrides(&self) -> Option<Resolution> {
        let overrides = self.context.overrides();
        if !overrides.is_complete() {
            if !overrides.is_empty() {
                debug!("Build-time overrides lack a backend or API URL, ignoring them");
            }
            return None;
        }

        let derived = self.derived().urls;
        let pick = |value: &Option<String>, default: String| {
            present(value).map(str::to_string).unwrap_or(default)
        };
        let urls = EndpointSet {
            backend: pick(&overrides.backend, derived.backend),
            frontend: pick(&overrides.frontend, derived.frontend),
            ai_chat: pick(&overrides.ai_chat, derived.ai_chat),
            document_analysis: pick(&overrides.document_analysis, derived.document_analysis),
            web_search: pick(&overrides.web_search, derived.web_search),
        };
        urls.validate().ok()?;

        let api = present(&overrides.api)?.to_string();
        Some(self.labelled(urls, api, Tier::BuildTime))
    }

    fn from_remote(&self, config: RemoteConfig) -> Resolution {
        let api = config.urls.api_base();
        let mut resolution = self.labelled(config.urls, api, Tier::Remote);
        if let Some(env) = config.deployment_env {
            resolution.deployment_env = env;
        }
        if let Some(host_ip) = config.host_ip {
            resolution.host_ip = host_ip;
        }
        if let Some(public_ip) = config.public_ip {
            resolution.public_ip = public_ip;
        }
        resolution
    }

    fn derived(&self) -> Resolution {
        let (urls, source) = match self.context.runtime_base() {
            Some(base) => (EndpointSet::from_base(&base), Tier::Runtime),
            None => (EndpointSet::localhost(), Tier::Fallback),
        };
        let api = urls.api_base();
        self.labelled(urls, api, source)
    }

    /// Attaches the deployment labels of the captured context. Without a
    /// hostname the portal describes itself as a local one.
    fn labelled(&self, urls: EndpointSet, api: String, source: Tier) -> Resolution {
        let (deployment_env, host) = match self.context.runtime_base() {
            Some(_) => (self.context.deployment_class(), self.context.hostname()),
            None => (DeploymentClass::Local, "localhost"),
        };
        Resolution {
            deployment_env: deployment_env.to_string(),
            host_ip: host.to_string(),
            public_ip: host.to_string(),
            urls,
            api,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::BuildTimeOverrides;
    use crate::remote::RemoteConfigError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Failing {
        calls: AtomicUsize,
    }

    impl Failing {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl RemoteConfigSource for Failing {
        async fn fetch(&self) -> Result<RemoteConfig, RemoteConfigError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(RemoteConfigError::Malformed("unexpected token".to_string()))
        }
    }

    struct Answering(RemoteConfig);

    impl RemoteConfigSource for Answering {
        async fn fetch(&self) -> Result<RemoteConfig, RemoteConfigError> {
            Ok(self.0.clone())
        }
    }

    fn resolver(hostname: &str) -> ConfigResolver {
        ConfigResolver::new(EnvironmentContext::new(hostname, BuildTimeOverrides::default()))
    }

    #[tokio::test]
    async fn test_localhost_with_failing_remote() {
        let resolution = resolver("localhost").resolve_detailed(&Failing::new()).await;
        assert_eq!(resolution.source, Tier::Runtime);
        assert_eq!(resolution.deployment_env, "local");
        assert_eq!(resolution.urls.backend, "http://localhost:8000");
        assert_eq!(resolution.urls.ai_chat, "http://localhost:8501");
        assert_eq!(resolution.urls.document_analysis, "http://localhost:8502");
        assert_eq!(resolution.urls.web_search, "http://localhost:8503");
        assert_eq!(resolution.urls.frontend, "http://localhost:3000");
        assert_eq!(resolution.api, "http://localhost:8000/api/v1");
    }

    #[tokio::test]
    async fn test_loopback_ip_maps_to_localhost_base() {
        let urls = resolver("127.0.0.1").resolve(&Failing::new()).await;
        assert_eq!(urls, EndpointSet::localhost());
    }

    #[tokio::test]
    async fn test_cloud_host_with_failing_remote() {
        let resolution = resolver("203.0.113.5").resolve_detailed(&Failing::new()).await;
        assert_eq!(resolution.deployment_env, "cloud");
        assert_eq!(resolution.host_ip, "203.0.113.5");
        for (_, url) in resolution.urls.iter() {
            assert!(url.starts_with("http://203.0.113.5:"), "{}", url);
        }
        assert_eq!(resolution.urls.web_search, "http://203.0.113.5:8503");
    }

    #[tokio::test]
    async fn test_empty_hostname_falls_back_to_localhost() {
        let resolution = resolver("").resolve_detailed(&Failing::new()).await;
        assert_eq!(resolution.source, Tier::Fallback);
        assert_eq!(resolution.urls, EndpointSet::localhost());
        assert_eq!(resolution.host_ip, "localhost");
    }

    #[tokio::test]
    async fn test_remote_urls_returned_verbatim() {
        let urls = EndpointSet {
            backend: "https://api.example.com".to_string(),
            frontend: "https://example.com".to_string(),
            ai_chat: "https://chat.example.com".to_string(),
            document_analysis: "https://docs.example.com".to_string(),
            web_search: "https://search.example.com".to_string(),
        };
        let remote = Answering(RemoteConfig::from(urls.clone()));
        let resolution = resolver("203.0.113.5").resolve_detailed(&remote).await;
        assert_eq!(resolution.source, Tier::Remote);
        assert_eq!(resolution.urls, urls);
        assert_eq!(resolution.api, "https://api.example.com/api/v1");
    }

    #[tokio::test]
    async fn test_remote_with_blank_url_is_ignored() {
        let mut urls = EndpointSet::from_base("http://10.1.1.1");
        urls.frontend = String::new();
        let remote = Answering(RemoteConfig::from(urls));
        let resolution = resolver("localhost").resolve_detailed(&remote).await;
        assert_eq!(resolution.source, Tier::Runtime);
        assert_eq!(resolution.urls, EndpointSet::localhost());
    }

    #[tokio::test]
    async fn test_complete_overrides_short_circuit_remote() {
        let overrides = BuildTimeOverrides {
            backend: Some("https://api.example.com".to_string()),
            api: Some("https://api.example.com/v2".to_string()),
            ai_chat: Some("https://chat.example.com".to_string()),
            ..Default::default()
        };
        let resolver = ConfigResolver::new(EnvironmentContext::new("203.0.113.5", overrides));
        let remote = Failing::new();

        let resolution = resolver.resolve_detailed(&remote).await;
        assert_eq!(remote.calls.load(Ordering::SeqCst), 0);
        assert_eq!(resolution.source, Tier::BuildTime);
        assert_eq!(resolution.urls.backend, "https://api.example.com");
        assert_eq!(resolution.api, "https://api.example.com/v2");
        assert_eq!(resolution.urls.ai_chat, "https://chat.example.com");
        // Services without an override are filled in from the hostname.
        assert_eq!(resolution.urls.web_search, "http://203.0.113.5:8503");
    }

    #[tokio::test]
    async fn test_complete_overrides_without_hostname_fill_from_fallback() {
        let overrides = BuildTimeOverrides {
            backend: Some("https://api.example.com".to_string()),
            api: Some("https://api.example.com/api/v1".to_string()),
            ..Default::default()
        };
        let resolver = ConfigResolver::new(EnvironmentContext::new("", overrides));
        let remote = Failing::new();

        let resolution = resolver.resolve_detailed(&remote).await;
        assert_eq!(remote.calls.load(Ordering::SeqCst), 0);
        assert_eq!(resolution.source, Tier::BuildTime);
        assert_eq!(resolution.urls.backend, "https://api.example.com");
        assert_eq!(resolution.api, "https://api.example.com/api/v1");
        assert_eq!(resolution.urls.frontend, "http://localhost:3000");
        assert_eq!(resolution.urls.web_search, "http://localhost:8503");
        assert_eq!(resolution.deployment_env, "local");
        assert_eq!(resolution.host_ip, "localhost");
    }

    #[tokio::test]
    async fn test_incomplete_overrides_consult_remote() {
        let overrides = BuildTimeOverrides {
            backend: Some("https://api.example.com".to_string()),
            ..Default::default()
        };
        let resolver = ConfigResolver::new(EnvironmentContext::new("localhost", overrides));
        let remote = Failing::new();

        let resolution = resolver.resolve_detailed(&remote).await;
        assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolution.source, Tier::Runtime);
        assert_eq!(resolution.urls.backend, "http://localhost:8000");
    }

    #[tokio::test]
    async fn test_resolution_is_repeatable() {
        let resolver = resolver("portal.example.com");
        let first = resolver.resolve_detailed(&Failing::new()).await;
        let second = resolver.resolve_detailed(&Failing::new()).await;
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_to_remote_config_round_trips_through_parser() {
        let resolution = resolver("203.0.113.5").derived();
        let wire = serde_json::to_value(resolution.to_remote_config()).unwrap();
        let parsed = RemoteConfig::from_json(wire).unwrap();
        assert_eq!(parsed.urls, resolution.urls);
        assert_eq!(parsed.deployment_env.as_deref(), Some("cloud"));
    }
}
