use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use wdgate_rpc::AgentRuntime;

use crate::apis;
use crate::cors::cors_layer;

pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:50000";
pub const DEFAULT_UPSTREAM_ADDRESS: &str = "127.0.0.1:50002";
pub const DEFAULT_PLUGIN_DIR: &str = "./plugin";

/// Configuration for the HTTP server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0:50000")
    pub address: String,
    /// Agent runtime gRPC address
    pub upstream: String,
    /// Directory of plugin fragments served when no `path` is given
    pub plugin_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_LISTEN_ADDRESS.to_string(),
            upstream: DEFAULT_UPSTREAM_ADDRESS.to_string(),
            plugin_dir: PathBuf::from(DEFAULT_PLUGIN_DIR),
        }
    }
}

impl ServerConfig {
    /// Create a new server config with the given address and default collaborators
    pub fn new(address: String) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }

    pub fn with_upstream(mut self, upstream: String) -> Self {
        self.upstream = upstream;
        self
    }

    pub fn with_plugin_dir(mut self, plugin_dir: PathBuf) -> Self {
        self.plugin_dir = plugin_dir;
        self
    }
}

/// State shared by every handler. The runtime handle is built once at
/// startup and is read-only afterwards.
#[derive(Clone)]
pub struct ServerState {
    pub runtime: Arc<dyn AgentRuntime>,
    pub plugin_dir: PathBuf,
}

impl ServerState {
    pub fn new(runtime: Arc<dyn AgentRuntime>, plugin_dir: PathBuf) -> Self {
        Self {
            runtime,
            plugin_dir,
        }
    }
}

/// Build the application router
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/api/v1/plugin", get(apis::plugin::handle_load_plugins))
        // call bodies are not size limited
        .route(
            "/api/v1/agent/call",
            post(apis::agent::handle_agent_call).layer(DefaultBodyLimit::disable()),
        )
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(
    config: ServerConfig,
    runtime: Arc<dyn AgentRuntime>,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = ServerState::new(runtime, config.plugin_dir.clone());
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.address).await?;

    // Print server info
    println!("Server starting on \x1b[1mhttp://{}\x1b[0m", config.address);
    println!("  Agent runtime: \x1b[1m{}\x1b[0m", config.upstream);
    println!("  Plugin dir:    \x1b[1m{}\x1b[0m", config.plugin_dir.display());
    println!("\nAvailable endpoints:");
    println!("  \x1b[1mPOST /api/v1/agent/call\x1b[0m   - Call the agent runtime (streaming)");
    println!("  \x1b[1mGET  /api/v1/plugin\x1b[0m       - Plugin catalogue grouped by class");
    println!("\nPress Ctrl+C to stop\n");

    info!("HTTP server listening on {}", config.address);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_and_overrides() {
        let config = ServerConfig::default();
        assert_eq!(config.address, "0.0.0.0:50000");
        assert_eq!(config.upstream, "127.0.0.1:50002");
        assert_eq!(config.plugin_dir, PathBuf::from("./plugin"));

        let config = ServerConfig::new("127.0.0.1:8080".into())
            .with_upstream("grpc://agent:50002".into())
            .with_plugin_dir(PathBuf::from("/etc/plugins"));
        assert_eq!(config.address, "127.0.0.1:8080");
        assert_eq!(config.upstream, "grpc://agent:50002");
        assert_eq!(config.plugin_dir, PathBuf::from("/etc/plugins"));
    }
}
