//! `clicksend-mcp`: serves selected ClickSend REST operations as MCP tools over stdio.
//!
//! stdout carries the MCP protocol, so all logging goes to stderr.

mod server;

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use clicksend_http_tools::config::{Credentials, DEFAULT_BASE_URL, TransportConfig};
use clicksend_http_tools::runtime::HttpTransport;
use clicksend_openapi_tools::config::{ApiServerConfig, EndpointSelector};
use clicksend_openapi_tools::{SpecDocument, ToolRegistry};
use rmcp::ServiceExt as _;
use server::ClickSendServer;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "clicksend-mcp", version, about = "ClickSend SMS tools over MCP (stdio)")]
struct Cli {
    /// `OpenAPI` description of the ClickSend API (YAML or JSON).
    #[arg(long, env = "CLICKSEND_OPENAPI_SPEC", default_value = "specs/clicksend.yaml")]
    spec: PathBuf,

    #[arg(long, env = "CLICKSEND_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[arg(long, env = "CLICKSEND_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "CLICKSEND_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Optional YAML file overriding `spec`, `baseUrl` and the `endpoints` allow-list.
    #[arg(long, env = "CLICKSEND_MCP_CONFIG")]
    config: Option<PathBuf>,

    /// Default filter when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

/// CLI values with the config file applied on top.
#[derive(Debug)]
struct Settings {
    spec: PathBuf,
    transport: TransportConfig,
    endpoints: Vec<EndpointSelector>,
}

impl Settings {
    fn resolve(cli: Cli, file: ApiServerConfig) -> anyhow::Result<Self> {
        let credentials = match (cli.username, cli.api_key) {
            (Some(username), Some(api_key)) => Some(Credentials { username, api_key }),
            _ => None,
        };
        Ok(Self {
            spec: file.spec.as_deref().map_or(cli.spec, PathBuf::from),
            endpoints: file.endpoint_selectors()?,
            transport: TransportConfig {
                base_url: file.base_url.unwrap_or(cli.base_url),
                credentials,
                ..TransportConfig::default()
            },
        })
    }
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format);

    if let Err(e) = run(cli).await {
        error!("{e:#}");
        return Err(e);
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let file = match &cli.config {
        Some(path) => ApiServerConfig::load(path)?,
        None => ApiServerConfig::default(),
    };
    let settings = Settings::resolve(cli, file)?;

    let spec = SpecDocument::load(&settings.spec)?;
    if settings.transport.credentials.is_none() {
        warn!("CLICKSEND_USERNAME/CLICKSEND_API_KEY not set; requests will be unauthenticated");
    }
    info!(base_url = %settings.transport.base_url, "using ClickSend API");
    let transport = HttpTransport::new(settings.transport)?;

    let mut registry = ToolRegistry::new(Arc::new(transport));
    if registry.register_endpoints(&spec, &settings.endpoints) == 0 {
        warn!("no tools registered; check the endpoint list against the OpenAPI document");
    }

    let title = Some(spec.title()).filter(|t| !t.is_empty()).map(str::to_string);
    let server = ClickSendServer::new(registry, title);
    info!(tools = server.tool_count(), "serving MCP over stdio");
    let service = server
        .serve(rmcp::transport::stdio())
        .await
        .context("start MCP stdio service")?;
    service.waiting().await.context("MCP stdio service")?;
    Ok(())
}
