//! Stowage Gateway - storage action API and reverse proxy

use clap::Parser;
use std::path::PathBuf;
use stowage_cli::{run_server_with_shutdown, server, GatewayConfig, StorageDefaults};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "stowage-gateway")]
#[command(about = "Resilient gateway for S3-compatible object storage")]
#[command(version)]
struct Args {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, env = "STOWAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Host to bind to
    #[arg(short = 'H', long, env = "STOWAGE_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "STOWAGE_PORT")]
    port: Option<u16>,

    /// Path of the action endpoint
    #[arg(long, env = "STOWAGE_API_PATH")]
    api_path: Option<String>,

    /// Path prefix served by the reverse proxy
    #[arg(long, env = "STOWAGE_PROXY_PREFIX")]
    proxy_prefix: Option<String>,

    /// Backend root for the proxy when CLOUDFLARE_R2_ENDPOINT is unset
    #[arg(long, env = "STOWAGE_PROXY_FALLBACK_ENDPOINT")]
    proxy_fallback_endpoint: Option<String>,

    /// Total attempts per backend call
    #[arg(long, env = "STOWAGE_MAX_RETRIES")]
    max_retries: Option<u32>,

    /// Disable the connectivity probe
    #[arg(long, env = "STOWAGE_NO_PROBE")]
    no_probe: bool,

    /// Enable debug logging
    #[arg(short, long, env = "STOWAGE_DEBUG")]
    debug: bool,

    /// Emit logs as JSON
    #[arg(long, env = "STOWAGE_LOG_JSON")]
    log_json: bool,
}

impl Args {
    /// Explicit flags win over file and environment configuration
    fn apply(self, mut config: GatewayConfig) -> GatewayConfig {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(api_path) = self.api_path {
            config.api_path = api_path;
        }
        if let Some(prefix) = self.proxy_prefix {
            config.proxy_prefix = prefix;
        }
        if self.proxy_fallback_endpoint.is_some() {
            config.proxy_fallback_endpoint = self.proxy_fallback_endpoint;
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if self.no_probe {
            config.probe_enabled = false;
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Parse arguments
    let args = Args::parse();

    // Setup logging
    let log_level = if args.debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "stowage_cli={0},stowage_client={0},tower_http=debug",
            log_level
        )
        .into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    if args.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // Build configuration
    let file_config = GatewayConfig::load(args.config.as_deref())?;
    let config = args.apply(file_config);
    let defaults = StorageDefaults::from_env();

    tracing::info!(
        "Starting Stowage gateway on {}:{}",
        config.host,
        config.port
    );
    tracing::info!(
        max_retries = config.max_retries,
        base_delay_ms = config.base_delay_ms,
        probe = config.probe_enabled,
        "Retry policy"
    );

    if defaults.endpoint_root().is_none() && config.proxy_fallback_endpoint.is_none() {
        tracing::warn!("No backend endpoint configured - the proxy will reject requests");
    }

    // Run the server
    run_server_with_shutdown(config, defaults, server::ctrl_c()).await
}
