pub mod chat;
pub mod client;
pub mod constants;
pub mod endpoints;
pub mod environment;
pub mod models;
pub mod remote;
pub mod resolver;
pub mod web_server;

pub use client::{ApiClient, ApiError};
pub use endpoints::{EndpointError, EndpointSet, Service};
pub use environment::{BuildTimeOverrides, DeploymentClass, EnvironmentContext};
pub use remote::{HttpConfigSource, OfflineSource, RemoteConfig, RemoteConfigError, RemoteConfigSource};
pub use resolver::{ConfigResolver, Resolution, Tier};
