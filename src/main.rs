use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::time::Duration;
use tracing::{info, warn};

use genai_portal::chat::run_chat_session;
use genai_portal::constants::CONFIG_FETCH_TIMEOUT;
use genai_portal::{
    web_server, ApiClient, ConfigResolver, EnvironmentContext, HttpConfigSource, OfflineSource,
    Resolution,
};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Hostname the portal is reached through; decides local vs. cloud URLs.
    #[arg(long, global = true, env = "GENAI_HOSTNAME", default_value = "localhost")]
    hostname: String,
    /// Seconds to wait for the remote configuration endpoint.
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,
    /// Skip the remote configuration endpoint.
    #[arg(long, global = true)]
    offline: bool,
    #[command(subcommand)]
    command: Commands,
}

// Define the available subcommands
#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print the resolved service endpoints.
    Resolve {
        #[arg(long, help = "Print the resolution as JSON.")]
        json: bool,
    },
    /// Check backend health and show system statistics.
    Status,
    /// List the launchable applications.
    Apps,
    /// Chat with the AI backend.
    Chat,
    /// Serve the resolved configuration to other portals.
    Serve {
        #[arg(long, default_value_t = 8080, help = "Port for the config server.")]
        port: u16,
    },
}

async fn resolve(cli: &Cli) -> Resolution {
    let context = EnvironmentContext::capture(cli.hostname.as_str());
    let resolver = ConfigResolver::new(context);
    if cli.offline {
        return resolver.resolve_detailed(&OfflineSource).await;
    }
    let timeout = cli
        .timeout
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(*CONFIG_FETCH_TIMEOUT);
    let source = HttpConfigSource::for_context(resolver.context(), timeout);
    resolver.resolve_detailed(&source).await
}

fn print_resolution(resolution: &Resolution) {
    for (service, url) in resolution.urls.iter() {
        println!("{:<18} {}", service, url);
    }
    println!("{:<18} {}", "api", resolution.api);
    println!("{:<18} {}", "health", resolution.urls.health_url());
    println!(
        "{:<18} {:?} ({})",
        "source", resolution.source, resolution.deployment_env
    );
}

// The main entry point of the application, using tokio's async runtime
#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for GENAI_* overrides)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG environment variable (e.g., RUST_LOG=genai_portal=debug)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    info!("genai-portal starting with command: {:?}", cli.command);

    let resolution = resolve(&cli).await;

    match cli.command {
        Commands::Resolve { json } => {
            if json {
                let rendered = serde_json::to_string_pretty(&resolution)
                    .context("Failed to serialize resolution")?;
                println!("{}", rendered);
            } else {
                print_resolution(&resolution);
            }
        }
        Commands::Status => {
            let client = ApiClient::new(&resolution).context("Failed to create API client")?;
            let health = client
                .health_check()
                .await
                .context("Backend health check failed")?;
            println!(
                "backend: {} ({}, {})",
                health.status, health.service, health.environment
            );
            match client.system_stats().await {
                Ok(stats) => {
                    println!("apps: {} total, {} active", stats.total_apps, stats.active_apps);
                    if !stats.categories.is_empty() {
                        println!("categories: {}", stats.categories.join(", "));
                    }
                }
                Err(e) => warn!("System statistics unavailable: {}", e),
            }
        }
        Commands::Apps => {
            let client = ApiClient::new(&resolution).context("Failed to create API client")?;
            let list = client.list_apps().await.context("Failed to fetch apps")?;
            for app in &list.apps {
                println!("{:<20} {:<8} {}  {}", app.id, app.status, app.url, app.name);
            }
            println!("{} apps ({})", list.apps.len(), list.environment);
        }
        Commands::Chat => {
            let client = ApiClient::new(&resolution).context("Failed to create API client")?;
            let stdin = io::stdin();
            run_chat_session(&client, stdin.lock(), io::stdout())
                .await
                .context("Chat session failed")?;
        }
        Commands::Serve { port } => {
            info!("Serving {:?} configuration on port {}...", resolution.source, port);
            let server = web_server::start_web_server(port, resolution);
            tokio::select! {
                res = server => res?,
                _ = tokio::signal::ctrl_c() => info!("Ctrl-C received, shutting down."),
            }
        }
    }

    Ok(())
}
