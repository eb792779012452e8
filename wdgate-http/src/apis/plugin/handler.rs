use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{error, info};

use super::loader::load_plugin_dir;
use crate::ServerState;

#[derive(Debug, Default, Deserialize)]
pub struct PluginQuery {
    /// Fragment directory overriding the configured one
    #[serde(default)]
    pub path: Option<String>,
}

/// Handle plugin catalogue request - fragments grouped by class
pub async fn handle_load_plugins(
    State(state): State<ServerState>,
    Query(query): Query<PluginQuery>,
) -> Response {
    let dir = query
        .path
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| state.plugin_dir.clone());

    info!("GET /api/v1/plugin path={}", dir.display());

    match load_plugin_dir(&dir).await {
        Ok(groups) => Json(groups).into_response(),
        Err(e) => {
            error!("Failed to load plugins from {}: {}", dir.display(), e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
