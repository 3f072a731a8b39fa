//! Daemon entry point for the Prometheus MCP server.
//!
//! Loads configuration from the environment, builds the shared backend
//! client, and serves the MCP protocol over stdio or streamable HTTP.

mod config;

use prom_core::client::{Auth, ConnectionSettings, PrometheusClient};
use prom_core::service::MetricsService;
use prom_mcp::PromMcp;
use prom_mcp::server::{self, McpHttpServerConfig};
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{PromConfig, TransportMode};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_logging();

    let config = PromConfig::from_args()?;
    let auth = Auth::resolve(
        config.username.clone(),
        config.password.clone(),
        config.token.clone(),
    );
    info!(
        url = %config.url,
        authentication = auth.method_name(),
        org_id = config.org_id.is_some(),
        "prometheus configuration validated"
    );

    let client = PrometheusClient::new(ConnectionSettings {
        url: config.url.clone(),
        auth,
        org_id: config.org_id.clone(),
        timeout: config.http_timeout,
    })?;
    // One probe at startup; an outage stays a per-call error.
    if let Err(err) = client.ping().await {
        warn!(error = %err, "prometheus not reachable at startup, continuing");
    }

    let service = MetricsService::new(client);
    let mcp = PromMcp::with_enabled_tools(service, config.enabled_tools.as_ref());
    info!(tools = ?mcp.tool_names(), "tool registry built");

    match config.transport {
        TransportMode::Stdio => {
            info!("serving MCP over stdio");
            server::serve_stdio(mcp).await?;
        }
        TransportMode::Http => {
            info!(addr = %config.bind_addr, "serving MCP over streamable HTTP");
            server::serve_streamable_http(mcp, McpHttpServerConfig::new(config.bind_addr))
                .await?;
        }
    }
    Ok(())
}

/// Logs go to stderr so stdio transport framing stays clean.
fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();
}
