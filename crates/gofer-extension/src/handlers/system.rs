//! Info, debug and shutdown handlers.

use crate::config::SystemConfig;
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Serialize)]
pub struct InfoResponse {
    pub extension_id: String,
    pub documentation: String,
}

pub async fn info(State(state): State<Arc<AppState>>) -> Json<InfoResponse> {
    Json(InfoResponse {
        extension_id: state.config.extension_id.clone(),
        documentation: state.extension.documentation(),
    })
}

#[derive(Serialize)]
pub struct DebugResponse {
    pub registered_pipelines: Vec<String>,
    pub config: SystemConfig,
}

/// Snapshot of registered subscription keys and the non-secret config.
pub async fn debug(State(state): State<Arc<AppState>>) -> Json<DebugResponse> {
    let registered_pipelines = state
        .extension
        .registered()
        .await
        .iter()
        .map(ToString::to_string)
        .collect();

    Json(DebugResponse {
        registered_pipelines,
        config: state.config.as_ref().clone(),
    })
}

pub async fn shutdown(State(state): State<Arc<AppState>>) -> StatusCode {
    info!("Shutdown requested by host");
    state.context.shutdown.cancel();
    StatusCode::NO_CONTENT
}
