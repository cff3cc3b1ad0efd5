//! External event handler.

use crate::error::ApiError;
use crate::extension::ExternalEvent;
use crate::lifecycle::HarnessState;
use crate::middleware::RequestId;
use crate::state::AppState;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A forwarded HTTP request. `body` is base64 encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalEventRequest {
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: String,
}

impl ExternalEventRequest {
    pub fn new(headers: HashMap<String, String>, body: &[u8]) -> Self {
        Self {
            headers,
            body: STANDARD.encode(body),
        }
    }
}

pub async fn external_event(
    State(state): State<Arc<AppState>>,
    request_id: RequestId,
    body: Result<Json<ExternalEventRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let reject = |e: ApiError| e.with_request_id(request_id.as_str());

    if state.lifecycle.current() != HarnessState::Serving {
        return Err(reject(ApiError::unavailable("extension is not serving")));
    }

    let Json(request) = body.map_err(|e| reject(ApiError::bad_request(e.body_text())))?;
    let raw = STANDARD
        .decode(request.body.as_bytes())
        .map_err(|e| reject(ApiError::bad_request(format!("body is not valid base64: {}", e))))?;

    state
        .extension
        .external_event(&state.context, ExternalEvent::new(request.headers, raw))
        .await
        .map_err(|e| reject(e.into()))?;

    Ok(StatusCode::NO_CONTENT)
}
