use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wdgate_http::http::{DEFAULT_LISTEN_ADDRESS, DEFAULT_PLUGIN_DIR, DEFAULT_UPSTREAM_ADDRESS};
use wdgate_http::{start_server, ServerConfig};
use wdgate_rpc::AgentServiceClient;

#[derive(Parser, Debug)]
#[command(name = "wdgate", version, about = "HTTP gateway for the agent runtime")]
struct Args {
    /// Address the HTTP server binds to
    #[arg(long, default_value = DEFAULT_LISTEN_ADDRESS)]
    listen: String,

    /// gRPC address of the agent runtime
    #[arg(long, default_value = DEFAULT_UPSTREAM_ADDRESS)]
    upstream: String,

    /// Default directory of plugin fragments
    #[arg(long, default_value = DEFAULT_PLUGIN_DIR)]
    plugin_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = ServerConfig::new(args.listen)
        .with_upstream(args.upstream)
        .with_plugin_dir(args.plugin_dir);

    // the runtime client must be valid before the listener accepts anything
    let client = AgentServiceClient::connect_lazy(&config.upstream)
        .context("grpc client init failed")?;
    info!("✓ Agent runtime client initialized ({})", client.endpoint());

    start_server(config, Arc::new(client))
        .await
        .map_err(|e| anyhow::anyhow!("server error: {}", e))?;

    Ok(())
}
