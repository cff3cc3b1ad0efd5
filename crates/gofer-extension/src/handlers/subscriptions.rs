//! Subscription lifecycle handlers.

use crate::error::ApiError;
use crate::middleware::RequestId;
use crate::state::AppState;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use gofer_core::Error;
use gofer_core::ids::SubscriptionKey;
use gofer_core::subscription::SubscriptionParams;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    pub namespace_id: String,
    pub pipeline_id: String,
    pub pipeline_subscription_id: String,
    #[serde(default)]
    pub pipeline_subscription_params: SubscriptionParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsubscriptionRequest {
    pub namespace_id: String,
    pub pipeline_id: String,
    pub pipeline_subscription_id: String,
}

/// Register a subscription. A repeat of an existing key is a no-op success.
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    request_id: RequestId,
    body: Result<Json<SubscriptionRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let reject = |e: ApiError| e.with_request_id(request_id.as_str());

    let Json(request) = body.map_err(|e| reject(ApiError::bad_request(e.body_text())))?;
    let key = SubscriptionKey::parse(
        &request.namespace_id,
        &request.pipeline_id,
        &request.pipeline_subscription_id,
    )
    .map_err(|e| reject(e.into()))?;

    match state
        .extension
        .subscribe(key.clone(), request.pipeline_subscription_params)
        .await
    {
        Ok(()) => {
            info!(
                namespace_id = %key.namespace_id,
                pipeline_id = %key.pipeline_id,
                subscription_id = %key.subscription_id,
                "Subscription registered"
            );
            Ok(StatusCode::NO_CONTENT)
        }
        Err(Error::SubscriptionExists(_)) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(reject(e.into())),
    }
}

/// Drop a subscription. Unknown keys are not an error.
pub async fn unsubscribe(
    State(state): State<Arc<AppState>>,
    request_id: RequestId,
    body: Result<Json<UnsubscriptionRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let reject = |e: ApiError| e.with_request_id(request_id.as_str());

    let Json(request) = body.map_err(|e| reject(ApiError::bad_request(e.body_text())))?;
    let key = SubscriptionKey::parse(
        &request.namespace_id,
        &request.pipeline_id,
        &request.pipeline_subscription_id,
    )
    .map_err(|e| reject(e.into()))?;

    let removed = state.extension.unsubscribe(&key).await;
    info!(
        namespace_id = %key.namespace_id,
        pipeline_id = %key.pipeline_id,
        subscription_id = %key.subscription_id,
        removed,
        "Subscription removed"
    );

    Ok(StatusCode::CREATED)
}
