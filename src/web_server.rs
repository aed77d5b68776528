use anyhow::{Context, Result};
use axum::{extract::State, routing::get, serve, Json, Router};
use serde::Serialize;
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::constants::{API_PREFIX, HEALTH_PATH};
use crate::remote::RemoteConfig;
use crate::resolver::Resolution;

// Shared application state
#[derive(Clone)]
struct AppState {
    resolution: Arc<Resolution>,
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    service: &'static str,
    environment: String,
    host_ip: String,
    public_ip: String,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthBody> {
    let resolution = &state.resolution;
    Json(HealthBody {
        status: "healthy",
        service: "config",
        environment: resolution.deployment_env.clone(),
        host_ip: resolution.host_ip.clone(),
        public_ip: resolution.public_ip.clone(),
    })
}

async fn config_handler(State(state): State<AppState>) -> Json<RemoteConfig> {
    Json(state.resolution.to_remote_config())
}

/// Routes serving a resolved configuration in the same shape the backend uses.
pub fn router(resolution: Resolution) -> Router {
    let state = AppState {
        resolution: Arc::new(resolution),
    };

    Router::new()
        .route(HEALTH_PATH, get(health_handler))
        .route(&format!("{}/config", API_PREFIX), get(config_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http()) // Add request logging
}

pub async fn start_web_server(port: u16, resolution: Resolution) -> Result<()> {
    let app = router(resolution);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Config server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;

    serve(listener, app.into_make_service())
        .await
        .context("Config server failed")?;

    Ok(())
}
