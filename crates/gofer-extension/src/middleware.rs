//! HTTP middleware for the harness.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{HeaderValue, Request, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::convert::Infallible;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Identifier assigned to the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestId>()
            .cloned()
            .unwrap_or_else(|| RequestId(String::new())))
    }
}

/// Assign a request id, expose it to handlers and echo it on the response.
pub async fn request_id(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Compare two secrets in constant time.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        let _ = a.ct_eq(a);
        return false;
    }
    a.ct_eq(b).into()
}

/// Extract the credential from a bearer authorization value.
///
/// The scheme name is case-insensitive.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Require `Authorization: Bearer <shared_secret>`.
///
/// A missing header or wrong token is 401; a header that is not a bearer
/// credential at all is 400.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    request_id: RequestId,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(header) = request.headers().get(AUTHORIZATION) else {
        return ApiError::unauthorized("missing authorization header")
            .with_request_id(request_id.0)
            .into_response();
    };

    let Some(token) = header.to_str().ok().and_then(bearer_token) else {
        return ApiError::bad_request("malformed authorization header")
            .with_request_id(request_id.0)
            .into_response();
    };

    if !constant_time_eq(token, &state.config.shared_secret) {
        return ApiError::unauthorized("invalid credentials")
            .with_request_id(request_id.0)
            .into_response();
    }

    next.run(request).await
}
