//! Health check handler.

use crate::lifecycle::HarnessState;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode};
use std::sync::Arc;

/// 204 while serving; 503 while restoring or draining.
pub async fn health(State(state): State<Arc<AppState>>) -> StatusCode {
    match state.lifecycle.current() {
        HarnessState::Serving => StatusCode::NO_CONTENT,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    }
}
