// Ports, paths and environment variable names shared by the resolver, the client and the server.

use std::env;
use std::time::Duration;

pub const BACKEND_PORT: u16 = 8000;
pub const FRONTEND_PORT: u16 = 3000;
pub const AI_CHAT_PORT: u16 = 8501;
pub const DOCUMENT_ANALYSIS_PORT: u16 = 8502;
pub const WEB_SEARCH_PORT: u16 = 8503;

/// Path prefix of the versioned backend API, appended to the backend URL.
pub const API_PREFIX: &str = "/api/v1";
pub const HEALTH_PATH: &str = "/health";
pub const LOCAL_BASE_URL: &str = "http://localhost";

// Build-time / startup overrides
pub const ENV_API_URL: &str = "GENAI_API_URL";
pub const ENV_BACKEND_URL: &str = "GENAI_BACKEND_URL";
pub const ENV_FRONTEND_URL: &str = "GENAI_FRONTEND_URL";
pub const ENV_AI_CHAT_URL: &str = "GENAI_AI_CHAT_URL";
pub const ENV_DOCUMENT_ANALYSIS_URL: &str = "GENAI_DOCUMENT_ANALYSIS_URL";
pub const ENV_WEB_SEARCH_URL: &str = "GENAI_WEB_SEARCH_URL";

fn secs_from_env(name: &str, default: u64) -> Duration {
    let secs = env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default);
    Duration::from_secs(secs)
}

// Use lazy_static to initialize static variables safely.
lazy_static::lazy_static! {
    pub static ref API_REQUEST_TIMEOUT: Duration = secs_from_env("GENAI_API_TIMEOUT_SECS", 30);
    pub static ref CONFIG_FETCH_TIMEOUT: Duration = secs_from_env("GENAI_CONFIG_TIMEOUT_SECS", 10);
}
