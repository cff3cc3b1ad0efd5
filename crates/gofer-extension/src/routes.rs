//! Route definitions for the lifecycle API.

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::{events, health, subscriptions, system};
use crate::middleware::{request_id, require_auth};
use crate::state::AppState;

/// Create the harness router. Everything except `/health` requires the bearer secret.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(authenticated_routes(state.clone()))
        .route("/health", get(health::health))
        .layer(middleware::from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn authenticated_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/info", get(system::info))
        .route("/debug", get(system::debug))
        .route(
            "/subscribe",
            post(subscriptions::subscribe).delete(subscriptions::unsubscribe),
        )
        .route("/shutdown", post(system::shutdown))
        .route("/external-event", post(events::external_event))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}
